//! Client half — outbound JSON-RPC with discovery, caching, and retry.

pub mod a2a_client;
pub mod card_cache;
pub mod transport;

pub use a2a_client::A2aClient;
pub use card_cache::CardCache;
pub use transport::{ClientOptions, JsonRpcTransport};
