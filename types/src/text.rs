//! Small pure text helpers for terminal rendering.

/// Truncate to at most `max` characters, ending in `...` when shortened.
///
/// Surrounding whitespace is trimmed first. Counts `char`s, not bytes.
#[must_use]
pub fn truncate_with_ellipsis(raw: &str, max: usize) -> String {
    let max = max.max(3);
    let trimmed = raw.trim();
    if trimmed.chars().count() <= max {
        return trimmed.to_string();
    }
    let head: String = trimmed.chars().take(max - 3).collect();
    format!("{head}...")
}

/// Leading characters of an id, enough to type back on the command line.
#[must_use]
pub fn short_id(id: &str, len: usize) -> &str {
    match id.char_indices().nth(len) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

#[cfg(test)]
mod tests {
    use super::{short_id, truncate_with_ellipsis};

    #[test]
    fn short_text_unchanged() {
        assert_eq!(truncate_with_ellipsis("hello", 10), "hello");
        assert_eq!(truncate_with_ellipsis("hello", 5), "hello");
    }

    #[test]
    fn long_text_gets_ellipsis() {
        assert_eq!(truncate_with_ellipsis("hello world", 8), "hello...");
    }

    #[test]
    fn minimum_width_is_three() {
        assert_eq!(truncate_with_ellipsis("hello", 1), "...");
    }

    #[test]
    fn short_id_respects_char_boundaries() {
        assert_eq!(short_id("abcdef", 4), "abcd");
        assert_eq!(short_id("ab", 4), "ab");
        assert_eq!(short_id("ééé", 2), "éé");
    }
}
