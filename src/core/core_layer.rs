// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "limits/mod.rs"]
pub mod limits;

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "presence/mod.rs"]
pub mod presence;
