//! Helpers shared by tools and the delegation loop

pub mod run;
pub mod workspace;

pub use run::{run_program, CommandOptions, CommandResult};
pub use workspace::resolve_in_workspace;

/// Cut `text` to at most `limit` characters, appending `notice` when cut
pub fn truncate_chars(text: &str, limit: usize, notice: &str) -> String {
    match text.char_indices().nth(limit) {
        None => text.to_string(),
        Some((byte_index, _)) => {
            let mut truncated = text[..byte_index].to_string();
            truncated.push_str(notice);
            truncated
        }
    }
}

/// Truncate long output with the standard notice
pub fn maybe_truncate(text: &str, limit: usize) -> String {
    truncate_chars(
        text,
        limit,
        &format!("\n<output truncated after {} characters>", limit),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_unchanged() {
        assert_eq!(maybe_truncate("hello", 10), "hello");
        assert_eq!(maybe_truncate("hello", 5), "hello");
    }

    #[test]
    fn test_truncates_on_char_boundary() {
        let text = "ééééé";
        assert_eq!(truncate_chars(text, 2, "…"), "éé…");
    }

    #[test]
    fn test_notice_names_the_limit() {
        let out = maybe_truncate(&"a".repeat(50), 10);
        assert!(out.starts_with(&"a".repeat(10)));
        assert!(out.ends_with("<output truncated after 10 characters>"));
    }
}
