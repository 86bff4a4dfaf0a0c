// Discord commands module.
// Each feature gets its own command file.

pub mod moderation;

pub mod limits;

// Bot presence management
pub mod presence;
