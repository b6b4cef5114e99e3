use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};
use crate::error::{DeclutterError, Result};
use crate::DEFAULT_ARCHIVE_NAME;

/// Bundles duplicate files into a single zip inside the organized folder.
#[derive(Debug, Clone)]
pub struct Archiver {
    archive_name: String,
    show_progress: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOutcome {
    pub archive_path: PathBuf,
    /// Entry names, in archive order.
    pub entries: Vec<String>,
    pub deleted: Vec<PathBuf>,
    pub delete_failures: Vec<(PathBuf, String)>,
}

impl ArchiveOutcome {
    pub fn originals_removed(&self) -> bool {
        self.delete_failures.is_empty() && self.deleted.len() == self.entries.len()
    }
}

impl Default for Archiver {
    fn default() -> Self {
        Self {
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
            show_progress: false,
        }
    }
}

impl Archiver {
    pub fn new(archive_name: impl Into<String>) -> Self {
        Self {
            archive_name: archive_name.into(),
            ..Self::default()
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Write every duplicate into one deflated zip under `target_dir`.
    ///
    /// Originals are only removed once the whole archive has been written and
    /// synced, so a failed write never loses data. An existing backup is never
    /// overwritten; a numbered sibling is used instead.
    pub fn archive(&self, duplicates: &[PathBuf], target_dir: &Path, delete_after: bool) -> Result<ArchiveOutcome> {
        let entries = entry_names(duplicates, target_dir)?;
        let archive_path = self.next_free_path(target_dir);

        info!(archive = %archive_path.display(), files = duplicates.len(), "writing duplicate archive");

        if let Err(err) = self.write_archive(&archive_path, duplicates, &entries) {
            if archive_path.exists() {
                if let Err(cleanup) = fs::remove_file(&archive_path) {
                    warn!(archive = %archive_path.display(), error = %cleanup, "could not remove partial archive");
                }
            }
            return Err(err);
        }

        let mut outcome = ArchiveOutcome {
            archive_path,
            entries,
            deleted: Vec::new(),
            delete_failures: Vec::new(),
        };

        if delete_after {
            for dup in duplicates {
                match fs::remove_file(dup) {
                    Ok(()) => {
                        debug!(path = %dup.display(), "removed archived original");
                        outcome.deleted.push(dup.clone());
                    }
                    Err(e) => {
                        warn!(path = %dup.display(), error = %e, "could not remove archived original");
                        outcome.delete_failures.push((dup.clone(), e.to_string()));
                    }
                }
            }
        }

        Ok(outcome)
    }

    fn write_archive(&self, archive_path: &Path, duplicates: &[PathBuf], entries: &[String]) -> Result<()> {
        let file = fs::File::create(archive_path)
            .map_err(|e| DeclutterError::archive(archive_path, e))?;
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let pb = self.progress_bar(duplicates.len() as u64)?;
        for (source, name) in duplicates.iter().zip(entries) {
            pb.inc(1);
            let mut reader = fs::File::open(source).map_err(|e| DeclutterError::fs(source, e))?;
            zip.start_file(name.as_str(), options)
                .map_err(|e| DeclutterError::archive(archive_path, e))?;
            io::copy(&mut reader, &mut zip).map_err(|e| DeclutterError::archive(archive_path, e))?;
        }
        pb.finish_and_clear();

        let file = zip.finish().map_err(|e| DeclutterError::archive(archive_path, e))?;
        file.sync_all().map_err(|e| DeclutterError::archive(archive_path, e))?;
        Ok(())
    }

    /// True for the backup name itself and its numbered siblings (`<stem>_<N>.<ext>`).
    pub fn is_backup_name(&self, name: &str) -> bool {
        if name == self.archive_name {
            return true;
        }
        let (stem, ext) = self.name_parts();
        let without_ext = match &ext {
            Some(ext) => name.strip_suffix(ext.as_str()).and_then(|n| n.strip_suffix('.')),
            None => Some(name),
        };
        without_ext
            .and_then(|n| n.strip_prefix(stem.as_str()))
            .and_then(|n| n.strip_prefix('_'))
            .map_or(false, |n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
    }

    fn name_parts(&self) -> (String, Option<String>) {
        let name = Path::new(&self.archive_name);
        let stem = name.file_stem().unwrap_or_default().to_string_lossy().to_string();
        let ext = name.extension().map(|ext| ext.to_string_lossy().to_string());
        (stem, ext)
    }

    fn numbered_name(&self, counter: usize) -> String {
        match self.name_parts() {
            (stem, Some(ext)) => format!("{}_{}.{}", stem, counter, ext),
            (stem, None) => format!("{}_{}", stem, counter),
        }
    }

    fn next_free_path(&self, target_dir: &Path) -> PathBuf {
        let mut path = target_dir.join(&self.archive_name);
        let mut counter = 1;

        while path.exists() {
            path = target_dir.join(self.numbered_name(counter));
            counter += 1;
        }

        path
    }

    fn progress_bar(&self, len: u64) -> Result<ProgressBar> {
        if !self.show_progress {
            return Ok(ProgressBar::hidden());
        }
        let pb = ProgressBar::new(len);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} archived")
            .map_err(|e| DeclutterError::Config(e.to_string()))?
            .progress_chars("#>-");
        pb.set_style(style);
        Ok(pb)
    }
}

/// Base names for each duplicate; two inputs sharing a base name is an error.
fn entry_names(duplicates: &[PathBuf], target_dir: &Path) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut names = Vec::with_capacity(duplicates.len());

    for dup in duplicates {
        let name = dup.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| DeclutterError::archive(target_dir, format!("{} has no file name", dup.display())))?;
        if !seen.insert(name.clone()) {
            return Err(DeclutterError::archive(target_dir, format!("two duplicates share the name {name}")));
        }
        names.push(name);
    }

    Ok(names)
}
