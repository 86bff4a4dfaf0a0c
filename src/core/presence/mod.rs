pub mod presence_service;

pub use presence_service::{
    PresenceChange, PresenceError, PresenceSource, PresenceStatus, PresenceTracker,
    TrackedIdentity,
};
