// All LLM prompt constants for the Generation module.
// Each handler fills its own template; OUTPUT_CONTRACT is the shared
// delimiter contract the separator parses.

/// Output contract shared by every document-mutating handler. The separator
/// relies on these exact markers; see `separator.rs`.
pub const OUTPUT_CONTRACT: &str = "\
Respond in this EXACT format:
===RESUME_CONTENT===
[the complete updated content only, professional and ready to use, with no meta-commentary]
===IMPROVEMENTS===
[plain-language notes on what changed and why, or empty if nothing to explain]
===END===";

/// System prompt for company optimization.
pub const COMPANY_SYSTEM: &str =
    "You are an expert career consultant with deep knowledge of corporate \
    cultures across industries. You understand what specific companies value \
    in candidates and adapt resume content to resonate with a company's \
    culture while maintaining complete authenticity. Never invent facts that \
    are not present in the provided resume content.";

/// Company optimization prompt template.
/// Replace: {company}, {context}, {output_contract}
pub const COMPANY_PROMPT_TEMPLATE: &str = r#"Optimize the following resume content for {company}. Align wording, emphasis, and ordering with what {company} is known to value in candidates; keep every claim grounded in the original content.

Current resume content:
{context}

Rules:
- Preserve all factual claims exactly; rephrase and reprioritize only.
- Emphasize the experiences and skills most relevant to {company}.
- Keep the original section structure.

{output_contract}"#;

/// System prompt for job matching.
pub const JOB_MATCH_SYSTEM: &str =
    "You are an expert in resume-to-job matching and ATS optimization. You \
    analyze how well a resume matches a job description and rewrite the \
    resume to close the gap honestly. Never invent qualifications the \
    candidate does not have.";

/// Job matching prompt template.
/// Replace: {job_description}, {context}, {output_contract}
pub const JOB_MATCH_PROMPT_TEMPLATE: &str = r#"Match the following resume content to the job description below and optimize it for that role.

Job description:
{job_description}

Current resume content:
{context}

In the improvements notes, include a short match analysis: an overall match score (0-100), the strongest matched qualifications, and the notable gaps.

Rules:
- Incorporate the job description's key terms only where the resume already supports them.
- Preserve all factual claims exactly.
- Keep the original section structure.

{output_contract}"#;

/// System prompt for section enhancement.
pub const SECTION_SYSTEM: &str =
    "You are an award-winning resume writer who transforms resume sections \
    into compelling, quantified statements. You add strong action verbs and \
    measurable impact without inventing facts.";

/// Section enhancement prompt template.
/// Replace: {section_name}, {section_content}, {guidelines}, {output_contract}
pub const SECTION_PROMPT_TEMPLATE: &str = r#"Enhance the {section_name} section of a resume. Return ONLY the rewritten section body as the content; do not repeat the section heading and do not include other sections.

{guidelines}

Current {section_name} section:
{section_content}

{output_contract}"#;

/// System prompt for general queries. Conversational output, no markers.
pub const GENERAL_SYSTEM: &str =
    "You are an expert career advisor and resume consultant. You answer \
    questions about the user's resume, explain optimization concepts, and \
    give actionable career guidance. Be specific, reference actual resume \
    content when relevant, keep responses concise (2-4 short paragraphs), \
    and ask a clarifying question when you lack context. Do not make \
    assumptions about information that is not in the resume.";

/// General query prompt template.
/// Replace: {history}, {context}, {query}
pub const GENERAL_PROMPT_TEMPLATE: &str = r#"Recent conversation:
{history}

The user's current resume content:
{context}

User question: {query}"#;

/// Writing guidelines per section kind, matched loosely against the section
/// label. Fed into the section enhancement prompt.
pub fn section_guidelines(section_label: &str) -> &'static str {
    let upper = section_label.to_uppercase();
    if upper.contains("SUMMARY") || upper.contains("OBJECTIVE") || upper.contains("PROFILE") {
        "Guidelines:\n\
         - Start with strong action words\n\
         - Include 2-3 key strengths\n\
         - Quantify experience (years, achievements)\n\
         - Keep to 3-4 impactful sentences"
    } else if upper.contains("EXPERIENCE") || upper.contains("EMPLOYMENT") {
        "Guidelines:\n\
         - Use strong action verbs (Led, Developed, Managed)\n\
         - Quantify achievements with metrics (%, $, numbers)\n\
         - Focus on impact and results\n\
         - Include relevant keywords"
    } else if upper.contains("SKILL") || upper.contains("COMPETENC") {
        "Guidelines:\n\
         - Organize by category (Technical, Soft, Tools)\n\
         - Prioritize most relevant skills first\n\
         - Use industry-standard terminology\n\
         - Balance hard and soft skills"
    } else if upper.contains("EDUCATION") || upper.contains("ACADEMIC") {
        "Guidelines:\n\
         - Include degree, institution, graduation date\n\
         - Highlight relevant coursework\n\
         - Include honors, awards, and certifications"
    } else if upper.contains("PROJECT") || upper.contains("PORTFOLIO") {
        "Guidelines:\n\
         - Describe problem and solution\n\
         - Highlight technologies used\n\
         - Quantify impact or results\n\
         - Show leadership and collaboration"
    } else {
        "General guidelines: Use action verbs, quantify achievements, focus on impact."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guidelines_match_on_partial_labels() {
        assert!(section_guidelines("WORK EXPERIENCE").contains("action verbs"));
        assert!(section_guidelines("TECHNICAL SKILLS").contains("category"));
        assert!(section_guidelines("PROFESSIONAL SUMMARY").contains("strengths"));
    }

    #[test]
    fn test_unknown_label_gets_general_guidelines() {
        assert!(section_guidelines("VOLUNTEERING").starts_with("General guidelines"));
    }

    #[test]
    fn test_output_contract_names_all_three_markers() {
        assert!(OUTPUT_CONTRACT.contains(crate::separator::ARTIFACT_MARKER));
        assert!(OUTPUT_CONTRACT.contains(crate::separator::EXPLANATION_MARKER));
        assert!(OUTPUT_CONTRACT.contains(crate::separator::END_MARKER));
    }
}
