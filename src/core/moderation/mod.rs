// Core moderation module - parsing what moderators type into forms.

pub mod moderation_input;

pub use moderation_input::*;
