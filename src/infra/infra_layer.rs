// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "limits/mod.rs"]
pub mod limits;

#[path = "presence/mod.rs"]
pub mod presence;
