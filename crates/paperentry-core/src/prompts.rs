//! Prompt text sent to the capability.

use crate::PaperMetadata;

/// Literal the extraction prompt asks for when a paper cannot be read.
pub const UNREADABLE_SENTINEL: &str = "ERROR: Unable to read PDF content.";

/// Stable prefix used to detect [`UNREADABLE_SENTINEL`] in model output.
pub const UNREADABLE_MARKER: &str = "ERROR: Unable to read PDF content";

const ANALYSIS_PROMPT: &str = r#"
This PDF contains one or more research papers.
Your task is to identify each distinct research paper in the file.

Return a STRICT valid JSON array of objects.
Each object must contain:
- "index": The 1-based sequential number of the paper as it appears in the file.
- "title": The extracted title of the paper.

If there is only one paper, return an array with one object.

Example JSON Output:
[
  {"index": 1, "title": "Deep Learning for Image Recognition"},
  {"index": 2, "title": "A Survey of Natural Language Processing"}
]

Return ONLY raw JSON. Do not use Markdown formatting (no ```json blocks).
"#;

/// Prompt asking the capability to enumerate the papers in the document.
pub fn analysis_prompt() -> &'static str {
    ANALYSIS_PROMPT
}

/// Prompt asking the capability to render one paper as a `\paperentrynum` block.
pub fn extraction_prompt(metadata: &PaperMetadata) -> String {
    format!(
        r#"
You are an expert LaTeX formatter.

CONTEXT:
The attached file is a PDF that may contain multiple papers.
Locate the paper number {index} titled roughly "{title}".

Your task is to convert this SPECIFIC research paper text into the following exact LaTeX block structure using my custom macro:

\paperentrynum{{TITLE}}{{AUTHORS}}{{AFFILIATIONS}}{{ABSTRACT}}{{KEYWORDS}}

OUTPUT RULES (follow strictly):

1. Do NOT summarize. Use the text EXACTLY as provided.
2. Identify the paper's:
   - Title
   - Authors (comma-separated)
   - Affiliations (semicolon-separated, matching each author)
   - Abstract
   - Keywords
3. Put them inside:

\paperentrynum
  {{TITLE}}
  {{Author 1, Author 2, ...}}
  {{Affiliation 1; Affiliation 2; ...}}
  {{Full abstract text without modification}}
  {{Keywords separated by semicolons}}

4. Do NOT add extra text, comments, explanations, or formatting.
5. Use LaTeX-safe characters:
   - Replace “ ” with `` ''
   - Replace – with --
   - Escape & as \&
   - Escape % as \%
   - Escape $ as \$
6. Ensure no content spills outside the braces {{ }}.
7. Final output must ONLY contain the \paperentrynum block, nothing else.
8. If the specific paper is not found or unreadable, return ONLY: "{sentinel}"
"#,
        index = metadata.index,
        title = metadata.title,
        sentinel = UNREADABLE_SENTINEL,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_prompt_targets_paper() {
        let prompt = extraction_prompt(&PaperMetadata {
            index: 3,
            title: "Graph Kernels Revisited".into(),
        });
        assert!(prompt.contains("paper number 3 titled roughly \"Graph Kernels Revisited\""));
        assert!(prompt.contains(r"\paperentrynum{TITLE}{AUTHORS}{AFFILIATIONS}{ABSTRACT}{KEYWORDS}"));
        assert!(prompt.contains("Escape & as \\&"));
        assert!(prompt.contains(UNREADABLE_SENTINEL));
    }

    #[test]
    fn sentinel_starts_with_marker() {
        assert!(UNREADABLE_SENTINEL.starts_with(UNREADABLE_MARKER));
    }

    #[test]
    fn analysis_prompt_demands_raw_json() {
        assert!(analysis_prompt().contains("STRICT valid JSON array"));
        assert!(analysis_prompt().contains("\"index\""));
    }
}
