//! Artifact/explanation separation.
//!
//! Content handlers are prompted to wrap their output in three fixed
//! literal markers. Separation is purely mechanical demarcation against
//! that contract; it never interprets prose. Handlers are not guaranteed
//! to honor the contract, so the fallback (whole output becomes the
//! artifact) is required behavior: a failed separation must never drop
//! content.

/// Start of the canonical document content.
pub const ARTIFACT_MARKER: &str = "===RESUME_CONTENT===";
/// Start of the human-readable improvement notes.
pub const EXPLANATION_MARKER: &str = "===IMPROVEMENTS===";
/// End of structured output.
pub const END_MARKER: &str = "===END===";

/// A handler's raw output split into its two streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeparatedOutput {
    pub artifact: String,
    pub explanation: String,
    /// False when the delimiter contract was violated and the fallback
    /// applied.
    pub separated: bool,
}

/// Splits raw handler output on the three-marker contract.
///
/// All three markers must appear in order; the artifact and explanation are
/// the exact byte ranges strictly between them (no trimming here, so the
/// round trip is byte-exact). Any missing or out-of-order marker falls back
/// to treating the entire output as the artifact.
pub fn separate(raw: &str) -> SeparatedOutput {
    match split_on_markers(raw) {
        Some((artifact, explanation)) => SeparatedOutput {
            artifact: artifact.to_string(),
            explanation: explanation.to_string(),
            separated: true,
        },
        None => SeparatedOutput {
            artifact: raw.to_string(),
            explanation: String::new(),
            separated: false,
        },
    }
}

/// Forward-only scan: each marker is searched for strictly after the
/// previous one, so out-of-order markers simply fail to be found.
fn split_on_markers(raw: &str) -> Option<(&str, &str)> {
    let artifact_start = raw.find(ARTIFACT_MARKER)? + ARTIFACT_MARKER.len();
    let explanation_rel = raw[artifact_start..].find(EXPLANATION_MARKER)?;
    let artifact_end = artifact_start + explanation_rel;

    let explanation_start = artifact_end + EXPLANATION_MARKER.len();
    let end_rel = raw[explanation_start..].find(END_MARKER)?;
    let explanation_end = explanation_start + end_rel;

    Some((
        &raw[artifact_start..artifact_end],
        &raw[explanation_start..explanation_end],
    ))
}
