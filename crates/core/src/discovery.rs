// crates/core/src/discovery.rs
//! Conversation discovery under the projects root.
//!
//! Layout is `{root}/{project}/{conversation_id}.jsonl`, where `project` is
//! the encoded working directory of the assistant (`/Users/foo/app` is
//! stored as `-Users-foo-app`). Anything deeper or shallower is ignored.

use crate::error::DiscoveryError;
use crate::types::Conversation;
use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::debug;

/// Returns the default projects directory (`~/.claude/projects`).
pub fn claude_projects_dir() -> Result<PathBuf, DiscoveryError> {
    let home = dirs::home_dir().ok_or(DiscoveryError::HomeDirNotFound)?;
    Ok(home.join(".claude").join("projects"))
}

/// Decoded project location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    /// Encoded directory name as stored on disk.
    pub encoded: String,
    /// Best-guess filesystem path.
    pub path: String,
    /// Last component of `path`.
    pub display_name: String,
}

/// Candidate paths for an encoded project name, most separated first.
///
/// Hyphens are ambiguous: they stand for `/` but also occur inside real
/// directory names, most often in the final component.
pub fn path_candidates(encoded: &str) -> Vec<String> {
    let name = encoded.strip_prefix('-').unwrap_or(encoded);
    if name.is_empty() {
        return vec!["/".to_string()];
    }

    let parts: Vec<&str> = name.split('-').collect();
    let mut candidates: Vec<String> = Vec::new();
    for tail in 1..=parts.len().min(4) {
        let (head, last) = parts.split_at(parts.len() - tail);
        let mut segments: Vec<String> = head.iter().map(|s| s.to_string()).collect();
        segments.push(last.join("-"));
        let candidate = format!("/{}", segments.join("/"));
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates
}

/// Decode a project directory name into its working directory.
///
/// Percent-escapes are decoded first. Among the hyphen interpretations the
/// first one that exists on disk wins, otherwise the fully separated one.
pub fn extract_project_info(encoded: &str) -> ProjectInfo {
    let decoded = urlencoding::decode(encoded)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| encoded.to_string());

    let candidates = path_candidates(&decoded);
    let path = candidates
        .iter()
        .find(|c| Path::new(c.as_str()).exists())
        .or_else(|| candidates.first())
        .cloned()
        .unwrap_or_default();

    let display_name = Path::new(&path)
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| decoded.clone());

    ProjectInfo {
        encoded: encoded.to_string(),
        path,
        display_name,
    }
}

/// Conversation id of a log file: its file stem.
pub fn extract_conversation_id(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().to_string())
}

/// If `path` is a conversation file directly inside a project directory of
/// `root`, return `(project, conversation_id)`.
pub fn conversation_path_parts(root: &Path, path: &Path) -> Option<(String, String)> {
    if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
        return None;
    }
    let relative = path.strip_prefix(root).ok()?;
    let components: Vec<&str> = relative
        .components()
        .map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;

    match components.as_slice() {
        [project, _file] => Some((project.to_string(), extract_conversation_id(path)?)),
        _ => None,
    }
}

fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

/// List every conversation under `root`, newest first.
///
/// A missing root yields an empty list. `message_count` is left at zero
/// for the caller to fill from parsed content.
pub async fn list_conversations(root: &Path) -> Result<Vec<Conversation>, DiscoveryError> {
    let mut projects = match fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(root = %root.display(), "Projects directory does not exist");
            return Ok(vec![]);
        }
        Err(e) => return Err(DiscoveryError::io(root, e)),
    };

    let mut conversations = Vec::new();

    while let Some(entry) = projects
        .next_entry()
        .await
        .map_err(|e| DiscoveryError::io(root, e))?
    {
        let project_dir = entry.path();
        if !entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }

        let encoded = entry.file_name().to_string_lossy().to_string();
        let project = extract_project_info(&encoded);

        match list_project(&project_dir, &project).await {
            Ok(mut found) => conversations.append(&mut found),
            Err(e) => {
                debug!(path = %project_dir.display(), error = %e, "Skipping unreadable project");
            }
        }
    }

    conversations.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
    Ok(conversations)
}

async fn list_project(
    project_dir: &Path,
    project: &ProjectInfo,
) -> Result<Vec<Conversation>, std::io::Error> {
    let mut entries = fs::read_dir(project_dir).await?;
    let mut conversations = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
            continue;
        }
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let Some(id) = extract_conversation_id(&path) else {
            continue;
        };

        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let created = metadata.created().unwrap_or(modified);

        conversations.push(Conversation {
            id,
            file_path: path,
            project: project.encoded.clone(),
            project_display_name: project.display_name.clone(),
            project_path: project.path.clone(),
            created_at: to_utc(created),
            modified_at: to_utc(modified),
            size_bytes: metadata.len(),
            message_count: 0,
        });
    }

    Ok(conversations)
}
