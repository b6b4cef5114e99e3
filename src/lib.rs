//! Declutter - deduplicate a folder and sort it into AI-suggested subfolders

pub mod archive;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod mover;
pub mod provider;
pub mod resolver;
pub mod session;

// Re-exports for easy access
pub use archive::{ArchiveOutcome, Archiver};
pub use classifier::{chat, classify};
pub use config::Config;
pub use error::{DeclutterError, ErrorKind, Result};
pub use model::{ChatTurn, ClassificationMap, DuplicateSet, FileRecord, Role};
pub use mover::{MoveOutcome, MoveReport};
pub use provider::{CompletionProvider, GeminiClient};
pub use resolver::DuplicateResolver;
pub use session::{OrganizeOptions, OrganizeReport, Session};

pub mod colors {
    use colored::Color;

    pub const SUCCESS: Color = Color::TrueColor { r: 77, g: 255, b: 157 };
    pub const HEADER: Color = Color::TrueColor { r: 157, g: 77, b: 255 };
    pub const PATH: Color = Color::TrueColor { r: 77, g: 195, b: 255 };
    pub const WARNING: Color = Color::TrueColor { r: 255, g: 217, b: 61 };
    pub const ERROR: Color = Color::TrueColor { r: 255, g: 107, b: 157 };
}

/// Current version of Declutter
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// File name of the duplicate backup written into the organized folder
pub const DEFAULT_ARCHIVE_NAME: &str = "duplicates_backup.zip";
