// Discord layer - commands and event handlers.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "presence/mod.rs"]
pub mod presence;

// Re-export command types for convenience
pub use commands::moderation::{Data, Error};
