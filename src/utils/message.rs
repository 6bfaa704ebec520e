//! Helpers for working with messages.

use crate::types::Message;

use super::parts::get_text_parts;

/// Extracts and joins all text content from a message's parts.
///
/// Returns an empty string when the message carries no text parts. Command
/// parsing joins by `"\n"` so multi-part commands read as one block.
pub fn message_text(message: &Message, delimiter: &str) -> String {
    get_text_parts(&message.parts).join(delimiter)
}
