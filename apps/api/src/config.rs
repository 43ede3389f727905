use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    pub vector_index_url: String,
    pub port: u16,
    pub rust_log: String,
    pub tuning: RetrievalTuning,
}

/// Tunable pipeline constants. The defaults are empirically chosen, not
/// invariants; each can be overridden per deployment via env vars.
#[derive(Debug, Clone)]
pub struct RetrievalTuning {
    /// Fragments requested per similarity search.
    pub top_k: usize,
    /// Fragments scoring below this normalized similarity are discarded.
    pub similarity_floor: f32,
    /// Excerpts shorter than this many characters trigger the full-document fallback.
    pub sufficiency_floor_chars: usize,
    /// Prefix cap on the full-document fallback context.
    pub full_context_cap_chars: usize,
    /// How many trailing messages the router consults.
    pub history_window: usize,
    /// Words per index fragment, non-overlapping.
    pub chunk_words: usize,
}

impl Default for RetrievalTuning {
    fn default() -> Self {
        Self {
            top_k: 5,
            similarity_floor: 0.8,
            sufficiency_floor_chars: 200,
            full_context_cap_chars: 3000,
            history_window: 5,
            chunk_words: 500,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = RetrievalTuning::default();
        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            vector_index_url: require_env("VECTOR_INDEX_URL")?,
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            tuning: RetrievalTuning {
                top_k: env_or("RETRIEVAL_TOP_K", defaults.top_k)?,
                similarity_floor: env_or("SIMILARITY_FLOOR", defaults.similarity_floor)?,
                sufficiency_floor_chars: env_or(
                    "SUFFICIENCY_FLOOR_CHARS",
                    defaults.sufficiency_floor_chars,
                )?,
                full_context_cap_chars: env_or(
                    "FULL_CONTEXT_CAP_CHARS",
                    defaults.full_context_cap_chars,
                )?,
                history_window: env_or("ROUTER_HISTORY_WINDOW", defaults.history_window)?,
                chunk_words: env_or("INDEX_CHUNK_WORDS", defaults.chunk_words)?,
            },
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid value for '{key}': {e}")),
        Err(_) => Ok(default),
    }
}
