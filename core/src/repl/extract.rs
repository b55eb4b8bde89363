//! Pulls executable code out of free-form model output

use regex::Regex;
use std::sync::OnceLock;

/// Return the body of the first ```` ```repl ```` fenced block in `text`.
///
/// The tag must end at a word boundary, so ```` ```replay ```` is not a match.
/// The newline right after the tag is not part of the body. Only the first
/// block is used; an unterminated first block yields `None`.
pub fn extract_repl_code(text: &str) -> Option<&str> {
    static REPL_FENCE_RE: OnceLock<Regex> = OnceLock::new();
    let re = REPL_FENCE_RE.get_or_init(|| {
        Regex::new(r"(?s)```repl\b[ \t]*\r?\n?(.*?)```").expect("repl fence regex should compile")
    });

    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|body| body.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_body_without_tag_newline() {
        let text = "Let me check.\n```repl\nprint(context)\n```\nDone.";
        assert_eq!(extract_repl_code(text), Some("print(context)\n"));
    }

    #[test]
    fn test_no_fence_returns_none() {
        assert_eq!(extract_repl_code("The answer is 42."), None);
        assert_eq!(extract_repl_code("```python\nprint(1)\n```"), None);
    }

    #[test]
    fn test_tag_requires_word_boundary() {
        assert_eq!(extract_repl_code("```replay\nprint(1)\n```"), None);
        assert_eq!(extract_repl_code("```repl2\nx = 1\n```"), None);
    }

    #[test]
    fn test_first_block_wins() {
        let text = "```repl\nx = 1\n```\nthen\n```repl\nFINAL(x)\n```";
        assert_eq!(extract_repl_code(text), Some("x = 1\n"));
    }

    #[test]
    fn test_unterminated_block_returns_none() {
        assert_eq!(extract_repl_code("```repl\nprint('never closed')"), None);
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(extract_repl_code("```repl\n```"), Some(""));
    }

    #[test]
    fn test_multiline_body_is_preserved() {
        let text = "```repl\nfor i in range(3):\n    print(i)\n```";
        assert_eq!(
            extract_repl_code(text),
            Some("for i in range(3):\n    print(i)\n")
        );
    }
}
