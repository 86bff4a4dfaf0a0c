pub mod http_client;

pub use http_client::{HttpPresenceClient, DEFAULT_PRESENCE_ENDPOINT};
