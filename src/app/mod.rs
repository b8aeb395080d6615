mod context;
mod runtime;
mod scan;
mod types;


pub use context::{ScannerContext, ScannerContextBuilder};
pub use runtime::spawn_signal_handlers;
pub use types::{RunSummary, ShutdownReason};
