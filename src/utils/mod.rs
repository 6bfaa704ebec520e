//! Helper functions for messages, parts, and artifacts.

pub mod artifact;
pub mod message;
pub mod parts;

pub use artifact::{decode_data_uri, encode_json_data_uri, new_data_artifact, new_json_uri_artifact};
pub use message::message_text;
pub use parts::get_text_parts;
