//! Document format I/O at the crate edge.
//!
//! Everything here is mechanical: turning an uploaded file into plain text
//! and locating section boundaries in that text. The core pipeline only ever
//! sees the parsed `text` + `SectionSpan` list produced here.

use std::io::Write;
use std::path::Path;

use crate::errors::AppError;
use crate::models::document::SectionSpan;

/// Section headings recognized in resume text. A heading line detected here
/// becomes a canonical label of the document version.
const KNOWN_HEADERS: &[&str] = &[
    "SUMMARY",
    "OBJECTIVE",
    "PROFILE",
    "EXPERIENCE",
    "WORK EXPERIENCE",
    "EMPLOYMENT",
    "EDUCATION",
    "ACADEMIC BACKGROUND",
    "SKILLS",
    "TECHNICAL SKILLS",
    "COMPETENCIES",
    "PROJECTS",
    "PORTFOLIO",
    "CERTIFICATIONS",
    "CERTIFICATES",
    "AWARDS",
    "ACHIEVEMENTS",
    "HONORS",
];

/// Longest line still considered a potential heading.
const MAX_HEADER_LINE_CHARS: usize = 50;

/// An uploaded resume reduced to text plus detected structure.
#[derive(Debug, Clone)]
pub struct ParsedUpload {
    pub text: String,
    pub sections: Vec<SectionSpan>,
    pub file_name: String,
    pub word_count: usize,
}

/// Parses an uploaded file into `ParsedUpload`. PDF bytes go through
/// `pdf-extract` via a temp file; `.txt`/`.md` are read as UTF-8.
pub fn parse_upload(file_name: &str, data: &[u8]) -> Result<ParsedUpload, AppError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let text = match extension.as_str() {
        "pdf" => extract_pdf_text(data)?,
        "txt" | "md" => String::from_utf8_lossy(data).into_owned(),
        other => {
            return Err(AppError::Validation(format!(
                "Unsupported file type '.{other}'. Upload a .pdf, .txt, or .md resume."
            )))
        }
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::Validation(
            "The uploaded file contains no extractable text".to_string(),
        ));
    }

    let sections = detect_sections(&text);
    Ok(ParsedUpload {
        word_count: text.split_whitespace().count(),
        sections,
        text,
        file_name: file_name.to_string(),
    })
}

fn extract_pdf_text(data: &[u8]) -> Result<String, AppError> {
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create temp file: {e}")))?;
    tmp.write_all(data)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to buffer upload: {e}")))?;

    pdf_extract::extract_text(tmp.path())
        .map_err(|e| AppError::Validation(format!("Failed to extract text from PDF: {e}")))
}

/// Detects section spans in resume text.
///
/// A heading is a short line whose uppercased form contains one of the
/// known headers. Each span covers the body between its heading line and
/// the next heading (or end of text); the heading line itself is excluded
/// so splicing an enhanced body leaves headings untouched. Text before the
/// first heading (name, contact block) belongs to no section.
pub fn detect_sections(text: &str) -> Vec<SectionSpan> {
    let mut spans: Vec<SectionSpan> = Vec::new();
    let mut open: Option<(String, usize)> = None; // (label, body start)
    let mut offset = 0usize;

    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();

        let trimmed = line.trim();
        if is_section_header(trimmed) {
            if let Some((label, start)) = open.take() {
                spans.push(SectionSpan {
                    label,
                    start,
                    end: line_start,
                });
            }
            open = Some((canonical_label(trimmed), offset));
        }
    }

    if let Some((label, start)) = open {
        spans.push(SectionSpan {
            label,
            start,
            end: text.len(),
        });
    }

    spans
}

fn is_section_header(trimmed: &str) -> bool {
    if trimmed.is_empty()
        || trimmed.chars().count() >= MAX_HEADER_LINE_CHARS
        || trimmed.ends_with(['.', ',', ';'])
    {
        return false;
    }
    let upper = trimmed.to_uppercase();
    KNOWN_HEADERS.iter().any(|h| upper.contains(h))
}

fn canonical_label(heading_line: &str) -> String {
    heading_line.trim_end_matches(':').trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Jane Doe\njane@example.com\n\nSUMMARY\nSeasoned engineer.\n\nWork Experience:\nAcme Corp, Senior Engineer\nBuilt things.\n\nSKILLS\nRust, SQL\n";

    #[test]
    fn test_detect_sections_finds_labels_in_order() {
        let spans = detect_sections(SAMPLE);
        let labels: Vec<&str> = spans.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["SUMMARY", "WORK EXPERIENCE", "SKILLS"]);
    }

    #[test]
    fn test_span_bodies_exclude_heading_lines() {
        let spans = detect_sections(SAMPLE);
        let summary = &spans[0];
        assert_eq!(&SAMPLE[summary.start..summary.end], "Seasoned engineer.\n\n");

        let experience = &spans[1];
        let body = &SAMPLE[experience.start..experience.end];
        assert!(body.starts_with("Acme Corp"));
        assert!(!body.contains("Work Experience"));
    }

    #[test]
    fn test_last_section_extends_to_end_of_text() {
        let spans = detect_sections(SAMPLE);
        assert_eq!(spans.last().unwrap().end, SAMPLE.len());
    }

    #[test]
    fn test_preamble_belongs_to_no_section() {
        let spans = detect_sections(SAMPLE);
        assert!(spans[0].start > SAMPLE.find("SUMMARY").unwrap());
    }

    #[test]
    fn test_prose_line_mentioning_header_word_is_not_a_heading() {
        let text = "SUMMARY\nI have experience in distributed systems and SQL databases today.\n";
        let spans = detect_sections(text);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].label, "SUMMARY");
    }

    #[test]
    fn test_no_headings_yields_no_sections() {
        assert!(detect_sections("just a plain paragraph\nwith two lines").is_empty());
    }

    #[test]
    fn test_parse_upload_rejects_unknown_extension() {
        let result = parse_upload("resume.docx", b"irrelevant");
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_parse_upload_rejects_empty_text() {
        let result = parse_upload("resume.txt", b"   \n  ");
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_parse_upload_plain_text_counts_words() {
        let parsed = parse_upload("resume.txt", SAMPLE.as_bytes()).unwrap();
        assert_eq!(parsed.word_count, SAMPLE.split_whitespace().count());
        assert_eq!(parsed.sections.len(), 3);
    }
}
