use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};
use walkdir::WalkDir;
use crate::error::{DeclutterError, Result};
use crate::model::{DuplicateSet, FileRecord};

const HASH_CHUNK_SIZE: usize = 8192;

/// Groups the direct children of a folder by content and picks one keeper per group.
#[derive(Debug, Clone, Default)]
pub struct DuplicateResolver {
    show_progress: bool,
}

impl DuplicateResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Partition the folder's files into keepers and duplicates.
    ///
    /// The keeper of a group is the most recently modified member; equal
    /// timestamps fall back to the lexicographically smallest path. Nothing
    /// on disk is touched. Any unreadable file aborts the whole call.
    pub fn resolve(&self, dir: &Path) -> Result<DuplicateSet> {
        let files = list_file_paths(dir)?;
        info!(dir = %dir.display(), files = files.len(), "resolving duplicates");

        let pb = self.progress_bar(files.len() as u64)?;
        let mut groups: HashMap<blake3::Hash, Vec<(PathBuf, SystemTime)>> = HashMap::new();

        for path in files {
            pb.inc(1);
            let modified = fs::metadata(&path)
                .and_then(|m| m.modified())
                .map_err(|e| DeclutterError::fs(&path, e))?;
            let hash = hash_file(&path)?;
            groups.entry(hash).or_default().push((path, modified));
        }
        pb.finish_and_clear();

        let mut set = DuplicateSet::default();
        for (hash, mut members) in groups {
            members.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            let mut members = members.into_iter().map(|(path, _)| path);
            if let Some(keeper) = members.next() {
                set.keepers.push(keeper);
            }
            for duplicate in members {
                debug!(%hash, path = %duplicate.display(), "duplicate");
                set.duplicates.push(duplicate);
            }
        }

        set.keepers.sort();
        set.duplicates.sort();
        info!(keepers = set.keepers.len(), duplicates = set.duplicates.len(), "resolved");
        Ok(set)
    }

    fn progress_bar(&self, len: u64) -> Result<ProgressBar> {
        if !self.show_progress {
            return Ok(ProgressBar::hidden());
        }
        let pb = ProgressBar::new(len);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} hashed ({eta})")
            .map_err(|e| DeclutterError::Config(e.to_string()))?
            .progress_chars("#>-");
        pb.set_style(style);
        Ok(pb)
    }
}

/// Regular files directly inside `dir`, sorted. Subdirectories and symlinks are skipped.
pub fn list_file_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(DeclutterError::fs(
            dir,
            io::Error::new(io::ErrorKind::NotFound, "not a directory"),
        ));
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(false) {
        let entry = entry.map_err(|e| DeclutterError::fs(dir, io::Error::from(e)))?;
        if entry.file_type().is_file() {
            paths.push(entry.into_path());
        }
    }
    paths.sort();
    Ok(paths)
}

/// The folder's files as records for the model, sorted by name.
pub fn list_records(dir: &Path) -> Result<Vec<FileRecord>> {
    Ok(list_file_paths(dir)?
        .iter()
        .filter_map(|path| FileRecord::from_path(path))
        .collect())
}

/// Hash a file using streaming (memory-safe)
pub fn hash_file(path: &Path) -> Result<blake3::Hash> {
    let mut hasher = blake3::Hasher::new();
    let mut file = fs::File::open(path).map_err(|e| DeclutterError::fs(path, e))?;

    let mut buffer = [0u8; HASH_CHUNK_SIZE];
    loop {
        let n = file.read(&mut buffer).map_err(|e| DeclutterError::fs(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_with_mtime(dir: &Path, name: &str, body: &[u8], secs_ago: u64) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        let file = fs::OpenOptions::new().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 - secs_ago)).unwrap();
        path
    }

    #[test]
    fn empty_directory_yields_empty_lists() {
        let tmp = TempDir::new().unwrap();
        let set = DuplicateResolver::new().resolve(tmp.path()).unwrap();
        assert_eq!(set, DuplicateSet::default());
    }

    #[test]
    fn newest_copy_is_kept() {
        let tmp = TempDir::new().unwrap();
        let old = write_with_mtime(tmp.path(), "old.txt", b"same", 3000);
        let newest = write_with_mtime(tmp.path(), "newest.txt", b"same", 10);
        let middle = write_with_mtime(tmp.path(), "middle.txt", b"same", 600);
        let other = write_with_mtime(tmp.path(), "other.txt", b"different", 5000);

        let set = DuplicateResolver::new().resolve(tmp.path()).unwrap();

        assert_eq!(set.keepers, vec![newest, other]);
        assert_eq!(set.duplicates, vec![middle, old]);
        assert_eq!(set.total_files(), 4);
    }

    #[test]
    fn equal_mtimes_keep_smallest_path() {
        let tmp = TempDir::new().unwrap();
        let b = write_with_mtime(tmp.path(), "b.bin", b"xyz", 100);
        let a = write_with_mtime(tmp.path(), "a.bin", b"xyz", 100);
        let c = write_with_mtime(tmp.path(), "c.bin", b"xyz", 100);

        let set = DuplicateResolver::new().resolve(tmp.path()).unwrap();
        assert_eq!(set.keepers, vec![a]);
        assert_eq!(set.duplicates, vec![b, c]);
    }

    #[test]
    fn subdirectories_are_ignored() {
        let tmp = TempDir::new().unwrap();
        write_with_mtime(tmp.path(), "top.txt", b"one", 10);
        fs::create_dir(tmp.path().join("nested")).unwrap();
        fs::write(tmp.path().join("nested").join("top.txt"), b"one").unwrap();

        let set = DuplicateResolver::new().resolve(tmp.path()).unwrap();
        assert_eq!(set.keepers.len(), 1);
        assert!(set.duplicates.is_empty());
    }

    #[test]
    fn missing_directory_is_filesystem_error() {
        let tmp = TempDir::new().unwrap();
        let err = DuplicateResolver::new()
            .resolve(&tmp.path().join("gone"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Filesystem);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_file_aborts_resolve() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        write_with_mtime(tmp.path(), "fine.txt", b"ok", 10);
        let locked = write_with_mtime(tmp.path(), "locked.txt", b"secret", 10);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Root reads regardless of mode bits.
        if fs::read(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
            return;
        }

        let err = DuplicateResolver::new().resolve(tmp.path()).unwrap_err();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

        assert_eq!(err.kind(), ErrorKind::Filesystem);
        match err {
            DeclutterError::Filesystem { path, .. } => assert_eq!(path, locked),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn records_carry_extension() {
        let tmp = TempDir::new().unwrap();
        write_with_mtime(tmp.path(), "b.png", b"png", 10);
        write_with_mtime(tmp.path(), "a.txt", b"txt", 10);

        let records = list_records(tmp.path()).unwrap();
        assert_eq!(records, vec![
            FileRecord { name: "a.txt".into(), file_type: ".txt".into() },
            FileRecord { name: "b.png".into(), file_type: ".png".into() },
        ]);
    }

    #[test]
    fn hash_is_content_based() {
        let tmp = TempDir::new().unwrap();
        let big: Vec<u8> = (0..HASH_CHUNK_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();
        let a = write_with_mtime(tmp.path(), "a", &big, 10);
        let b = write_with_mtime(tmp.path(), "b", &big, 20);
        assert_eq!(hash_file(&a).unwrap(), hash_file(&b).unwrap());
        assert_eq!(hash_file(&a).unwrap(), blake3::hash(&big));
    }
}
