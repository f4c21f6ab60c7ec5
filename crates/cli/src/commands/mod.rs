//! Command handlers for the Grounded CLI.
//!
//! Each subcommand lives in its own module and exposes `execute(&config)`.

pub mod ask;
pub mod build;
pub mod files;
pub mod serve;
pub mod status;

pub use ask::AskCommand;
pub use build::BuildCommand;
pub use files::FilesCommand;
pub use serve::ServeCommand;
pub use status::StatusCommand;

use grounded_knowledge::{ProgressEvent, ProgressReporter};
use std::sync::Arc;

/// Progress reporter that prints each phase to stderr, leaving stdout for results.
pub(crate) fn stderr_progress(quiet: bool) -> ProgressReporter {
    if quiet {
        return ProgressReporter::noop();
    }
    ProgressReporter::new(Arc::new(|event: ProgressEvent| eprintln!("{}", event.format_simple())))
}
