pub mod notifier;

pub use notifier::run_presence_loop;
