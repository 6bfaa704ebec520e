//! Helpers for working with lists of content parts.

use crate::types::Part;

/// Extracts the text content from every text part.
pub fn get_text_parts(parts: &[Part]) -> Vec<&str> {
    parts
        .iter()
        .filter_map(|part| match part {
            Part::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

/// Extracts the first data payload, if any part carries one.
pub fn get_data_part(parts: &[Part]) -> Option<&serde_json::Value> {
    parts.iter().find_map(|part| match part {
        Part::Data { data } => Some(data),
        _ => None,
    })
}
