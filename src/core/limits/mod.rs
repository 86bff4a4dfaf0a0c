// Core limits module - daily moderation caps and the bypass code.

pub mod bypass_token;
pub mod limits_models;
pub mod limits_service;
pub mod limits_store;
pub mod reset_scheduler;

pub use limits_models::*;
pub use limits_service::LedgerService;
pub use limits_store::{LedgerError, LedgerStore};
pub use reset_scheduler::run_daily_reset;
