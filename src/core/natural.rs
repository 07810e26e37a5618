//! Natural ordering for item numbers (`1, 2, 10, A1, A2`)

use std::cmp::Ordering;

/// One chunk of a natural sort key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum KeyPart {
    /// A run of ASCII digits, compared by value
    Number(u128),
    /// Any other run, compared case-insensitively
    Text(String),
}

/// Split a string into alternating text and number chunks
pub fn natural_key(text: &str) -> Vec<KeyPart> {
    let mut parts = Vec::new();
    let mut digits = String::new();
    let mut other = String::new();

    for ch in text.chars() {
        if ch.is_ascii_digit() {
            if !other.is_empty() {
                parts.push(KeyPart::Text(std::mem::take(&mut other).to_lowercase()));
            }
            digits.push(ch);
        } else {
            if !digits.is_empty() {
                parts.push(number_part(&std::mem::take(&mut digits)));
            }
            other.push(ch);
        }
    }
    if !digits.is_empty() {
        parts.push(number_part(&digits));
    }
    if !other.is_empty() {
        parts.push(KeyPart::Text(other.to_lowercase()));
    }
    parts
}

fn number_part(digits: &str) -> KeyPart {
    digits
        .parse::<u128>()
        .map(KeyPart::Number)
        .unwrap_or_else(|_| KeyPart::Text(digits.to_string()))
}

/// Compare two strings in natural order
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_key(a).cmp(&natural_key(b)).then_with(|| a.cmp(b))
}
