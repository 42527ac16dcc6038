//! Identifier case conversions.
//!
//! All conversions are ASCII-only and never fail. Escaping reserved words is left to the target
//! code writers.

/// `snake_case` to `SCREAMING_CASE`.
pub fn snake_to_screaming(src: &str) -> String {
    src.to_ascii_uppercase()
}

/// `SCREAMING_CASE` to `snake_case`.
pub fn screaming_to_snake(src: &str) -> String {
    src.to_ascii_lowercase()
}

/// `TitleCase` to `snake_case`.
///
/// Every upper case letter except a leading one starts a new word.
pub fn title_to_snake(src: &str) -> String {
    let mut result = String::with_capacity(src.len() + 4);
    for (index, c) in src.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if index > 0 {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

/// `snake_case` or `kebab-case` to `camelCase`.
pub fn snake_to_camel(src: &str) -> String {
    join_words(src, false)
}

/// `snake_case` or `kebab-case` to `TitleCase`.
pub fn snake_to_title(src: &str) -> String {
    join_words(src, true)
}

/// Drops the delimiters and upper-cases the first letter of each following word.
fn join_words(src: &str, capitalize_first: bool) -> String {
    let mut result = String::with_capacity(src.len());
    let mut capitalize = capitalize_first;
    for c in src.chars() {
        if c == '_' || c == '-' {
            capitalize = true;
        } else {
            result.push(if capitalize { c.to_ascii_uppercase() } else { c });
            capitalize = false;
        }
    }
    result
}
