use std::cell::RefCell;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::time::{Duration, SystemTime};
use declutter::{
    Archiver, CompletionProvider, DeclutterError, DuplicateResolver, ErrorKind, OrganizeOptions,
    Result, Session,
};
use tempfile::TempDir;
use zip::ZipArchive;

/// Answers every prompt with the same text and remembers what it was asked.
struct FixedReply {
    reply: String,
    prompts: RefCell<Vec<String>>,
}

impl FixedReply {
    fn new(reply: &str) -> Self {
        Self { reply: reply.to_string(), prompts: RefCell::new(Vec::new()) }
    }
}

impl CompletionProvider for FixedReply {
    fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.borrow_mut().push(prompt.to_string());
        Ok(self.reply.clone())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

struct Offline;

impl CompletionProvider for Offline {
    fn generate(&self, _prompt: &str) -> Result<String> {
        Err(DeclutterError::Service("connection refused".to_string()))
    }

    fn name(&self) -> &str {
        "offline"
    }
}

fn write_aged(dir: &Path, name: &str, body: &[u8], secs_ago: u64) {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    let file = fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 - secs_ago)).unwrap();
}

fn names_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir).unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn dedupes_archives_and_sorts_a_folder() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    write_aged(dir, "a.txt", b"meeting notes", 60);
    write_aged(dir, "a_copy.txt", b"meeting notes", 3600);
    write_aged(dir, "b.png", b"\x89PNG fake image", 60);

    let resolved = DuplicateResolver::new().resolve(dir).unwrap();
    assert_eq!(resolved.keepers, vec![dir.join("a.txt"), dir.join("b.png")]);
    assert_eq!(resolved.duplicates, vec![dir.join("a_copy.txt")]);

    let provider = FixedReply::new("```json\n{\"a.txt\": \"Documents\", \"b.png\": \"Images\"}\n```");
    let mut session = Session::open(dir).unwrap();
    let options = OrganizeOptions {
        context: Some("group images separately".to_string()),
        ..OrganizeOptions::default()
    };

    let report = session.organize(&provider, &options).unwrap();

    assert!(report.is_complete());
    assert_eq!(report.duplicates, resolved);
    let archive = report.archive.as_ref().unwrap();
    assert_eq!(archive.archive_path, dir.join("duplicates_backup.zip"));
    assert_eq!(archive.entries, vec!["a_copy.txt"]);
    assert_eq!(report.moves.as_ref().unwrap().moved().count(), 2);

    let prompt = &provider.prompts.borrow()[0];
    assert!(prompt.contains("group images separately"));
    assert!(!prompt.contains("a_copy.txt"));

    assert_eq!(names_in(dir), vec!["Documents", "Images", "duplicates_backup.zip"]);
    assert_eq!(fs::read(dir.join("Documents/a.txt")).unwrap(), b"meeting notes");
    assert!(dir.join("Images/b.png").exists());

    let mut zip = ZipArchive::new(fs::File::open(dir.join("duplicates_backup.zip")).unwrap()).unwrap();
    assert_eq!(zip.len(), 1);
    let mut restored = Vec::new();
    zip.by_name("a_copy.txt").unwrap().read_to_end(&mut restored).unwrap();
    assert_eq!(blake3::hash(&restored), blake3::hash(b"meeting notes"));
}

#[test]
fn groups_partition_every_file() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    for i in 0..4 {
        write_aged(dir, &format!("photo_{i}.jpg"), b"identical bytes", 100 + i * 10);
    }
    write_aged(dir, "unique_1.txt", b"one", 10);
    write_aged(dir, "unique_2.txt", b"two", 10);

    let set = DuplicateResolver::new().resolve(dir).unwrap();

    assert_eq!(set.total_files(), 6);
    assert_eq!(set.duplicates.len(), 3);
    assert_eq!(set.keepers.len(), 3);
    assert!(set.keepers.contains(&dir.join("photo_0.jpg")));
    assert!(set.duplicates.iter().all(|d| !set.keepers.contains(d)));
}

#[test]
fn archive_then_keep_leaves_originals() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    write_aged(dir, "x.txt", b"dup", 10);
    write_aged(dir, "y.txt", b"dup", 20);

    let set = DuplicateResolver::new().resolve(dir).unwrap();
    let outcome = Archiver::default().archive(&set.duplicates, dir, false).unwrap();

    assert_eq!(outcome.entries, vec!["y.txt"]);
    assert!(dir.join("x.txt").exists());
    assert!(dir.join("y.txt").exists());
}

#[test]
fn service_outage_keeps_folder_intact_after_archiving() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    write_aged(dir, "a.txt", b"same", 10);
    write_aged(dir, "b.txt", b"same", 500);

    let mut session = Session::open(dir).unwrap();
    let err = session.organize(&Offline, &OrganizeOptions::default()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Service);
    assert_eq!(names_in(dir), vec!["a.txt", "duplicates_backup.zip"]);
    assert_eq!(session.records().len(), 1);
}

#[test]
fn misnamed_entries_are_reported_not_fatal() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    write_aged(dir, "report.pdf", b"pdf", 10);
    write_aged(dir, "song.mp3", b"mp3", 10);

    let provider = FixedReply::new(r#"{"report-final.pdf": "Docs", "song.mp3": "Music"}"#);
    let mut session = Session::open(dir).unwrap();
    let report = session.organize(&provider, &OrganizeOptions::default()).unwrap();

    let moves = report.moves.unwrap();
    assert_eq!(moves.failed().count(), 1);
    assert_eq!(moves.moved().count(), 1);
    assert!(dir.join("Music/song.mp3").exists());
    assert!(dir.join("report.pdf").exists());
}
