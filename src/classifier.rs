//! Prompt building and reply parsing for the remote categorization service.

use std::sync::OnceLock;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};
use crate::error::{DeclutterError, Result};
use crate::model::{ChatTurn, ClassificationMap, FileRecord};
use crate::provider::CompletionProvider;

/// Ask the service which folder each file belongs in.
///
/// An empty file list short-circuits to an empty map without a remote call.
/// Any service or parse failure aborts the whole call; nothing is retried.
pub fn classify(
    provider: &dyn CompletionProvider,
    files: &[FileRecord],
    context: &str,
) -> Result<ClassificationMap> {
    if files.is_empty() {
        debug!("no files to classify");
        return Ok(ClassificationMap::new());
    }

    let prompt = classification_prompt(files, context)?;
    info!(files = files.len(), provider = provider.name(), "requesting classification");
    let reply = provider.generate(&prompt)?;
    let map = parse_classification(&reply)?;

    for (name, _) in map.iter() {
        if !files.iter().any(|f| f.name == name) {
            warn!(file = name, "service classified a file that was not in the request");
        }
    }
    for file in files {
        if map.get(&file.name).is_none() {
            warn!(file = %file.name, "service left a file unclassified");
        }
    }

    Ok(map)
}

/// Advisory conversation about the folder. Never touches the filesystem.
pub fn chat(
    provider: &dyn CompletionProvider,
    files: &[FileRecord],
    transcript: &[ChatTurn],
    message: &str,
) -> Result<String> {
    let prompt = chat_prompt(files, transcript, message)?;
    let reply = provider.generate(&prompt)?;
    Ok(reply.trim().to_string())
}

pub fn classification_prompt(files: &[FileRecord], context: &str) -> Result<String> {
    Ok(format!(
        "You are an expert assistant inside 'Declutter AI'. \
         Return a JSON mapping filenames to folder names only.\n\n\
         User context:\n{}\n\nFiles:\n{}",
        context,
        files_json(files)?,
    ))
}

pub fn chat_prompt(files: &[FileRecord], transcript: &[ChatTurn], message: &str) -> Result<String> {
    let mut prompt = format!(
        "You are a friendly AI assistant embedded in an app called 'Declutter AI'.\n\
         You help users decide how to group and organize files by name and type.\n\
         Here is the current list of files to be sorted:\n{}\n\n\
         Conversation so far:\n",
        files_json(files)?,
    );
    for turn in transcript {
        prompt.push_str(&format!("{}: {}\n", turn.role, turn.text));
    }
    prompt.push_str(&format!("User: {message}\nAI:"));
    Ok(prompt)
}

fn files_json(files: &[FileRecord]) -> Result<String> {
    serde_json::to_string_pretty(files).map_err(|e| DeclutterError::Parse(e.to_string()))
}

/// Remove markdown code fences the model tends to wrap JSON in.
pub fn strip_fences(reply: &str) -> String {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| {
        Regex::new(r"(?m)^```(?:json)?|```$").expect("fence pattern is valid")
    });
    fence.replace_all(reply.trim(), "").trim().to_string()
}

/// Parse a reply into a classification map, keeping reply order.
pub fn parse_classification(reply: &str) -> Result<ClassificationMap> {
    let cleaned = strip_fences(reply);
    let value: Value = serde_json::from_str(&cleaned)
        .map_err(|e| DeclutterError::Parse(format!("{e}; reply was: {}", preview(&cleaned))))?;

    let Value::Object(object) = value else {
        return Err(DeclutterError::Parse(format!("expected a JSON object, got: {}", preview(&cleaned))));
    };
    if object.is_empty() {
        return Err(DeclutterError::Parse("reply mapped no files".to_string()));
    }

    let mut map = ClassificationMap::new();
    for (name, folder) in object {
        match folder {
            Value::String(folder) if !folder.trim().is_empty() => map.insert(name, folder.trim()),
            other => {
                return Err(DeclutterError::Parse(format!(
                    "folder for {name} must be a non-empty string, got {other}"
                )));
            }
        }
    }
    Ok(map)
}

/// The user's side of a chat, as classification context.
pub fn context_from_transcript(transcript: &[ChatTurn]) -> String {
    transcript.iter()
        .filter(|turn| turn.role == crate::model::Role::User)
        .map(|turn| format!("{}: {}", turn.role, turn.text))
        .collect::<Vec<_>>()
        .join("\n")
}

fn preview(text: &str) -> String {
    const LIMIT: usize = 120;
    if text.chars().count() > LIMIT {
        format!("{}…", text.chars().take(LIMIT).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::cell::RefCell;

    struct Canned {
        reply: Result<String>,
        prompts: RefCell<Vec<String>>,
    }

    impl Canned {
        fn ok(reply: &str) -> Self {
            Self { reply: Ok(reply.to_string()), prompts: RefCell::new(Vec::new()) }
        }
    }

    impl CompletionProvider for Canned {
        fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.borrow_mut().push(prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(DeclutterError::Service(e.to_string())),
            }
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    fn records() -> Vec<FileRecord> {
        vec![
            FileRecord { name: "a.txt".into(), file_type: ".txt".into() },
            FileRecord { name: "b.png".into(), file_type: ".png".into() },
        ]
    }

    #[test]
    fn strips_json_fences() {
        let reply = "```json\n{\"a.txt\": \"Documents\"}\n```";
        assert_eq!(strip_fences(reply), "{\"a.txt\": \"Documents\"}");
        assert_eq!(strip_fences("  {\"x\": \"y\"}  "), "{\"x\": \"y\"}");
    }

    #[test]
    fn classify_parses_fenced_reply() {
        let provider = Canned::ok("```\n{\"a.txt\": \"Documents\", \"b.png\": \"Images\"}\n```");

        let map = classify(&provider, &records(), "group images separately").unwrap();

        assert_eq!(map.get("a.txt"), Some("Documents"));
        assert_eq!(map.get("b.png"), Some("Images"));
        let prompt = &provider.prompts.borrow()[0];
        assert!(prompt.contains("group images separately"));
        assert!(prompt.contains("\"name\": \"b.png\""));
        assert!(prompt.contains("\"type\": \".png\""));
    }

    #[test]
    fn empty_file_list_skips_the_service() {
        let provider = Canned::ok("not json");
        let map = classify(&provider, &[], "anything").unwrap();
        assert!(map.is_empty());
        assert!(provider.prompts.borrow().is_empty());
    }

    #[test]
    fn malformed_replies_are_parse_errors() {
        for reply in [
            "Sure! Put the text file in Documents.",
            "[\"Documents\", \"Images\"]",
            "{}",
            "{\"a.txt\": 3}",
            "{\"a.txt\": {\"folder\": \"Docs\"}}",
            "{\"a.txt\": \"  \"}",
        ] {
            let err = classify(&Canned::ok(reply), &records(), "").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Parse, "reply {reply:?}");
        }
    }

    #[test]
    fn service_failure_propagates() {
        let provider = Canned {
            reply: Err(DeclutterError::Service("quota exceeded".into())),
            prompts: RefCell::new(Vec::new()),
        };
        let err = classify(&provider, &records(), "").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Service);
    }

    #[test]
    fn reply_order_is_kept() {
        let map = parse_classification(r#"{"z.txt": "Z", "a.txt": "A", "m.txt": "M"}"#).unwrap();
        let names: Vec<_> = map.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["z.txt", "a.txt", "m.txt"]);
    }

    #[test]
    fn chat_prompt_includes_history() {
        let provider = Canned::ok("  Try grouping by type.\n");
        let transcript = vec![ChatTurn::user("hi"), ChatTurn::assistant("hello!")];

        let reply = chat(&provider, &records(), &transcript, "any ideas?").unwrap();

        assert_eq!(reply, "Try grouping by type.");
        let prompt = &provider.prompts.borrow()[0];
        assert!(prompt.contains("Conversation so far:\nUser: hi\nAI: hello!\n"));
        assert!(prompt.ends_with("User: any ideas?\nAI:"));
    }

    #[test]
    fn context_keeps_user_turns_only() {
        let transcript = vec![
            ChatTurn::user("keep photos apart"),
            ChatTurn::assistant("ok"),
            ChatTurn::user("and receipts too"),
        ];
        assert_eq!(
            context_from_transcript(&transcript),
            "User: keep photos apart\nUser: and receipts too",
        );
    }
}
