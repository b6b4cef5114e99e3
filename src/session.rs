use std::path::{Path, PathBuf};
use tracing::{info, warn};
use crate::archive::{ArchiveOutcome, Archiver};
use crate::classifier;
use crate::error::Result;
use crate::model::{ChatTurn, ClassificationMap, DuplicateSet, FileRecord};
use crate::mover::{self, MoveReport};
use crate::provider::CompletionProvider;
use crate::resolver::{self, DuplicateResolver};
use crate::DEFAULT_ARCHIVE_NAME;

/// The folder being organized and the conversation about it.
#[derive(Debug, Clone)]
pub struct Session {
    dir: PathBuf,
    records: Vec<FileRecord>,
    transcript: Vec<ChatTurn>,
}

#[derive(Debug, Clone)]
pub struct OrganizeOptions {
    /// Free-text instructions; the user's chat turns are used when unset.
    pub context: Option<String>,
    pub delete_duplicates: bool,
    /// Classify only. Nothing is archived or moved.
    pub dry_run: bool,
    pub archive_name: String,
    pub show_progress: bool,
}

impl Default for OrganizeOptions {
    fn default() -> Self {
        Self {
            context: None,
            delete_duplicates: true,
            dry_run: false,
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
            show_progress: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrganizeReport {
    pub duplicates: DuplicateSet,
    pub archive: Option<ArchiveOutcome>,
    pub classification: ClassificationMap,
    /// `None` for a dry run.
    pub moves: Option<MoveReport>,
}

impl OrganizeReport {
    pub fn is_complete(&self) -> bool {
        let archived = self.archive.as_ref().map_or(true, |a| a.delete_failures.is_empty());
        let moved = self.moves.as_ref().map_or(true, MoveReport::is_complete);
        archived && moved
    }
}

impl Session {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let records = resolver::list_records(&dir)?;
        info!(dir = %dir.display(), files = records.len(), "opened folder");
        Ok(Self {
            dir,
            records,
            transcript: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn transcript(&self) -> &[ChatTurn] {
        &self.transcript
    }

    /// Send one chat message. Blank messages and empty folders are ignored.
    ///
    /// The user's turn is kept even if the service fails, so it still
    /// counts as context for a later sort.
    pub fn send(&mut self, provider: &dyn CompletionProvider, message: &str) -> Result<Option<String>> {
        let message = message.trim();
        if message.is_empty() || self.records.is_empty() {
            return Ok(None);
        }

        let reply = classifier::chat(provider, &self.records, &self.transcript, message);
        self.transcript.push(ChatTurn::user(message));
        let reply = reply?;
        self.transcript.push(ChatTurn::assistant(reply.clone()));
        Ok(Some(reply))
    }

    pub fn context(&self) -> String {
        classifier::context_from_transcript(&self.transcript)
    }

    /// Deduplicate, archive, classify and move, in that order.
    pub fn organize(&mut self, provider: &dyn CompletionProvider, options: &OrganizeOptions) -> Result<OrganizeReport> {
        let duplicates = DuplicateResolver::new()
            .with_progress(options.show_progress)
            .resolve(&self.dir)?;

        let backups = Archiver::new(options.archive_name.clone()).with_progress(options.show_progress);
        let archive = if duplicates.has_duplicates() && !options.dry_run {
            Some(backups.archive(&duplicates.duplicates, &self.dir, options.delete_duplicates)?)
        } else {
            None
        };

        self.records = duplicates.keepers.iter()
            .filter(|path| path.is_file())
            .filter(|path| !is_backup(path, &backups, archive.as_ref()))
            .filter_map(|path| FileRecord::from_path(path))
            .collect();

        let mut report = OrganizeReport {
            duplicates,
            archive,
            classification: ClassificationMap::new(),
            moves: None,
        };

        if self.records.is_empty() {
            info!("nothing left to classify");
            if !options.dry_run {
                report.moves = Some(MoveReport::default());
            }
            return Ok(report);
        }

        let context = options.context.clone().unwrap_or_else(|| self.context());
        report.classification = classifier::classify(provider, &self.records, &context)?;

        if options.dry_run {
            return Ok(report);
        }

        report.moves = Some(mover::apply(&report.classification, &self.dir, options.show_progress)?);
        // Moves are done; a listing failure must not discard the report.
        if let Err(e) = self.refresh() {
            warn!(dir = %self.dir.display(), error = %e, "could not re-read folder after moving");
        }
        Ok(report)
    }

    /// Forget the conversation and the file snapshot.
    pub fn reset(&mut self) {
        self.records.clear();
        self.transcript.clear();
    }

    /// Re-read the folder listing.
    pub fn refresh(&mut self) -> Result<()> {
        self.records = resolver::list_records(&self.dir)?;
        Ok(())
    }
}

fn is_backup(path: &Path, archiver: &Archiver, archive: Option<&ArchiveOutcome>) -> bool {
    let by_name = path.file_name()
        .map_or(false, |name| archiver.is_backup_name(&name.to_string_lossy()));
    let this_run = archive.map_or(false, |a| a.archive_path == path);
    by_name || this_run
}
