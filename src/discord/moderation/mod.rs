// Moderation actions and the `/direct` panel.
// - `actions.rs` resolves the target, asks the ledger and calls Discord.
// - `panel.rs` owns the buttons, modals and their component ids.

pub mod actions;
pub mod panel;
