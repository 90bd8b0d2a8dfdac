pub mod audio;
pub mod batch;
pub mod config;
pub mod error;
pub mod split;

pub use batch::{discover_files, print_summary, BatchOrchestrator, BatchResult, BatchStats, FileOutcome};
pub use config::Config;
pub use error::{Result, SplitError};
pub use split::{FileReport, FileSplitter};
