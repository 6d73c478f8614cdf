//! Shared utility functions for the adw crate.

/// Convert a title to a filename-safe slug, limited to `max_len` characters.
///
/// Punctuation is dropped rather than replaced, so "don't" becomes "dont";
/// runs of whitespace and hyphens collapse to a single hyphen.
pub fn slugify(title: &str, max_len: usize) -> String {
    let kept: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();
    let slug = kept
        .split(|c: char| c == '-' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.chars().count() > max_len {
        slug.chars()
            .take(max_len)
            .collect::<String>()
            .trim_end_matches('-')
            .to_string()
    } else {
        slug
    }
}

/// First `max` characters of `text`, for log previews.
pub fn preview(text: &str, max: usize) -> String {
    let mut out: String = text.chars().take(max).collect();
    if text.chars().count() > max {
        out.push_str("...");
    }
    out
}
