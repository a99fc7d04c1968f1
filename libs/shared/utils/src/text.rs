/// Trims free text, mapping blank input to `None`.
pub fn normalize_optional_text(input: Option<&str>) -> Option<String> {
    input
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Length in characters, not bytes.
pub fn char_len(input: &str) -> usize {
    input.chars().count()
}
