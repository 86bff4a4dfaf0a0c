// Ledger store implementations.
// - `json_store.rs` keeps everything in one JSON file.
// - `sqlite_store.rs` keeps guilds and user counters in SQLite tables.

pub mod json_store;
pub mod sqlite_store;

pub use json_store::JsonLedgerStore;
pub use sqlite_store::SqliteLedgerStore;
