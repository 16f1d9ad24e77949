//! Cleanup of model output.

/// Trim `text` and remove a surrounding Markdown code fence, if any.
///
/// The opening fence line (with an optional language tag such as `json`
/// or `latex`) and a trailing closing fence are removed; text without a
/// leading fence is only trimmed.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(after_ticks) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let body = match after_ticks.find('\n') {
        Some(pos) => &after_ticks[pos + 1..],
        // Single-line fence: "```json [...]```"
        None => strip_language_tag(after_ticks),
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Language tags recognized after an opening fence on the same line.
const LANGUAGE_TAGS: &[&str] = &["json", "latex", "tex"];

fn strip_language_tag(text: &str) -> &str {
    for tag in LANGUAGE_TAGS {
        if let Some(rest) = text.strip_prefix(tag)
            && (rest.is_empty() || rest.starts_with(char::is_whitespace))
        {
            return rest.trim_start();
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_trimmed() {
        assert_eq!(strip_code_fence("  [1, 2]\n"), "[1, 2]");
    }

    #[test]
    fn json_fence_removed() {
        let text = "```json\n[{\"index\": 1, \"title\": \"A\"}]\n```";
        assert_eq!(strip_code_fence(text), "[{\"index\": 1, \"title\": \"A\"}]");
    }

    #[test]
    fn latex_fence_removed() {
        let text = "\n```latex\n\\paperentrynum{A}{B}{C}{D}{E}\n```\n";
        assert_eq!(strip_code_fence(text), "\\paperentrynum{A}{B}{C}{D}{E}");
    }

    #[test]
    fn bare_fence_removed() {
        assert_eq!(strip_code_fence("```\nhello\n```"), "hello");
    }

    #[test]
    fn unterminated_fence_keeps_body() {
        assert_eq!(strip_code_fence("```latex\n\\paperentrynum{A}"), "\\paperentrynum{A}");
    }

    #[test]
    fn single_line_fence() {
        assert_eq!(strip_code_fence("```json [] ```"), "[]");
    }

    #[test]
    fn single_line_fence_keeps_untagged_content() {
        assert_eq!(strip_code_fence("```Hello world```"), "Hello world");
        assert_eq!(strip_code_fence("```jsonish value```"), "jsonish value");
        assert_eq!(
            strip_code_fence("```latex \\paperentrynum{A}{B}{C}{D}{E}```"),
            "\\paperentrynum{A}{B}{C}{D}{E}"
        );
    }

    #[test]
    fn fence_only_yields_empty() {
        assert_eq!(strip_code_fence("```\n```"), "");
    }
}
