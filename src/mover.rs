use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};
use crate::error::{DeclutterError, Result};
use crate::model::ClassificationMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved { file: String, destination: PathBuf },
    Failed { file: String, folder: String, reason: String },
}

impl MoveOutcome {
    pub fn file(&self) -> &str {
        match self {
            MoveOutcome::Moved { file, .. } | MoveOutcome::Failed { file, .. } => file,
        }
    }
}

/// Per-file results of applying a classification map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveReport {
    pub outcomes: Vec<MoveOutcome>,
}

impl MoveReport {
    pub fn moved(&self) -> impl Iterator<Item = &MoveOutcome> {
        self.outcomes.iter().filter(|o| matches!(o, MoveOutcome::Moved { .. }))
    }

    pub fn failed(&self) -> impl Iterator<Item = &MoveOutcome> {
        self.outcomes.iter().filter(|o| matches!(o, MoveOutcome::Failed { .. }))
    }

    pub fn is_complete(&self) -> bool {
        self.failed().next().is_none()
    }
}

/// Move each classified file into its folder under `source_dir`.
///
/// A failing entry is recorded and the remaining entries still run.
pub fn apply(map: &ClassificationMap, source_dir: &Path, show_progress: bool) -> Result<MoveReport> {
    let pb = progress_bar(map.len() as u64, show_progress)?;
    let mut report = MoveReport::default();

    for (file, folder) in map.iter() {
        pb.inc(1);
        let outcome = match move_one(source_dir, file, folder) {
            Ok(destination) => {
                debug!(file, destination = %destination.display(), "moved");
                MoveOutcome::Moved { file: file.to_string(), destination }
            }
            Err(e) => {
                warn!(file, folder, error = %e, "move failed");
                MoveOutcome::Failed {
                    file: file.to_string(),
                    folder: folder.to_string(),
                    reason: e.to_string(),
                }
            }
        };
        report.outcomes.push(outcome);
    }
    pb.finish_and_clear();

    info!(
        moved = report.moved().count(),
        failed = report.failed().count(),
        "applied classification"
    );
    Ok(report)
}

/// Names with `..`, a root or a prefix resolve outside the organized folder.
fn leaves_folder(name: &str) -> bool {
    Path::new(name)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
}

fn move_one(source_dir: &Path, file: &str, folder: &str) -> Result<PathBuf> {
    if leaves_folder(file) || leaves_folder(folder) {
        warn!(file, folder, dir = %source_dir.display(), "move reaches outside the organized folder");
    }

    let source = source_dir.join(file);
    if !source.is_file() {
        return Err(DeclutterError::fs(
            &source,
            io::Error::new(io::ErrorKind::NotFound, "file no longer exists"),
        ));
    }

    let dest_dir = source_dir.join(folder);
    fs::create_dir_all(&dest_dir).map_err(|e| DeclutterError::fs(&dest_dir, e))?;

    let file_name = source.file_name().unwrap_or_default();
    let destination = dest_dir.join(file_name);
    if destination.exists() {
        return Err(DeclutterError::fs(
            &destination,
            io::Error::new(io::ErrorKind::AlreadyExists, "destination already exists"),
        ));
    }

    if let Err(rename_err) = fs::rename(&source, &destination) {
        debug!(error = %rename_err, "rename failed, copying instead");
        let options = fs_extra::file::CopyOptions::new();
        fs_extra::file::move_file(&source, &destination, &options).map_err(|e| {
            DeclutterError::fs(&source, io::Error::new(io::ErrorKind::Other, e.to_string()))
        })?;
    }

    Ok(destination)
}

fn progress_bar(len: u64, show: bool) -> Result<ProgressBar> {
    if !show {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} moved")
            .map_err(|e| DeclutterError::Config(e.to_string()))?
            .progress_chars("#>-"),
    );
    Ok(pb)
}
