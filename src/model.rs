use std::fmt;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

/// Snapshot of one file in the folder being organized, as sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub name: String,
    /// Extension including the leading dot, or empty.
    #[serde(rename = "type")]
    pub file_type: String,
}

impl FileRecord {
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_string();
        let file_type = path.extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        Some(Self { name, file_type })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "User"),
            Role::Assistant => write!(f, "AI"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, text: text.into() }
    }
}

/// Result of duplicate resolution. Every scanned file lands in exactly one list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateSet {
    pub duplicates: Vec<PathBuf>,
    pub keepers: Vec<PathBuf>,
}

impl DuplicateSet {
    pub fn has_duplicates(&self) -> bool {
        !self.duplicates.is_empty()
    }

    pub fn total_files(&self) -> usize {
        self.duplicates.len() + self.keepers.len()
    }
}

/// Filename to destination folder, in the order the service returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationMap {
    entries: Vec<(String, String)>,
}

impl ClassificationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the folder for `filename`, keeping its first position.
    pub fn insert(&mut self, filename: impl Into<String>, folder: impl Into<String>) {
        let filename = filename.into();
        let folder = folder.into();
        match self.entries.iter_mut().find(|(name, _)| *name == filename) {
            Some(entry) => entry.1 = folder,
            None => self.entries.push((filename, folder)),
        }
    }

    pub fn get(&self, filename: &str) -> Option<&str> {
        self.entries.iter()
            .find(|(name, _)| name == filename)
            .map(|(_, folder)| folder.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(name, folder)| (name.as_str(), folder.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct destination folders, first-seen order.
    pub fn folders(&self) -> Vec<&str> {
        let mut folders: Vec<&str> = Vec::new();
        for (_, folder) in self.iter() {
            if !folders.contains(&folder) {
                folders.push(folder);
            }
        }
        folders
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ClassificationMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ClassificationMap::new();
        for (name, folder) in iter {
            map.insert(name, folder);
        }
        map
    }
}
