//! Resource Manager (spec.md §4.F). Materializes large message windows as
//! NDJSON files and reclaims them after TTL.
//!
//! Grounded on two sources: `adapters/persistence/fs_repo.rs` (one file per
//! logical unit, append-only via `tokio::fs`, JSON-per-line) for the write
//! path, and ConaryLabs-Mira's `mira-chat/src/artifacts.rs` (`Uuid::new_v4`
//! naming, `sha2` content hashing, TTL-stamped metadata, `cleanup_expired`
//! sweep query) for lifecycle bookkeeping — adapted from SQL rows to plain
//! filesystem entries since this crate has no database, only transient
//! export files (spec.md §1 Non-goals).
//!
//! URI scheme: `artifact://<uuid>` (spec.md §9 Open Question 3, resolved in
//! DESIGN.md). Opaque, carries no filesystem path.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::core::cursor;
use crate::domain::{Artifact, CoreError, Message, MessageWindow};

const URI_SCHEME: &str = "artifact://";

/// Tracks artifacts written to `base_dir`, independent of the filesystem's
/// own directory listing, so `sweep` never touches a file mid-read (a
/// reader holds an `Arc` entry alive for its duration).
pub struct ResourceManager {
    base_dir: PathBuf,
    default_ttl: Duration,
    entries: RwLock<HashMap<String, Arc<Artifact>>>,
}

impl ResourceManager {
    pub fn new(base_dir: PathBuf, default_ttl: Duration) -> Self {
        Self {
            base_dir,
            default_ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.base_dir.join(format!("{id}.ndjson"))
    }

    fn uri_for(id: &str) -> String {
        format!("{URI_SCHEME}{id}")
    }

    fn id_from_uri(uri: &str) -> Result<&str, CoreError> {
        uri.strip_prefix(URI_SCHEME)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CoreError::Validation(format!("not an artifact URI: {uri}")))
    }

    /// Serialize `messages` as NDJSON and register the resulting Artifact.
    /// Writes the whole file before returning (a successful `create` implies
    /// a subsequent `read` observes the complete file — spec.md §9 Open
    /// Question 4, resolved in DESIGN.md as: block until fully written).
    pub async fn create(
        &self,
        messages: &[Message],
        window: &MessageWindow,
    ) -> Result<Artifact, CoreError> {
        fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| CoreError::Internal(format!("creating artifact directory: {e}")))?;

        let id = Uuid::new_v4().to_string();
        let path = self.path_for(&id);

        let mut file = fs::File::create(&path)
            .await
            .map_err(|e| CoreError::Internal(format!("creating artifact file: {e}")))?;

        let mut hasher = Sha256::new();
        for message in messages {
            let mut line = serde_json::to_string(message)
                .map_err(|e| CoreError::Internal(format!("serializing artifact line: {e}")))?;
            line.push('\n');
            hasher.update(line.as_bytes());
            file.write_all(line.as_bytes())
                .await
                .map_err(|e| CoreError::Internal(format!("writing artifact: {e}")))?;
        }
        file.flush()
            .await
            .map_err(|e| CoreError::Internal(format!("flushing artifact: {e}")))?;

        let size_bytes = file
            .metadata()
            .await
            .map(|m| m.len())
            .map_err(|e| CoreError::Internal(format!("stat-ing artifact: {e}")))?;

        let artifact = Artifact {
            uri: Self::uri_for(&id),
            created_at: Utc::now(),
            ttl: self.default_ttl,
            chat_canonical: window.chat.canonical_id,
            window_hash: cursor::window_hash(window),
            size_bytes,
            message_count: messages.len(),
        };

        self.entries
            .write()
            .await
            .insert(id, Arc::new(artifact.clone()));

        info!(
            uri = %artifact.uri,
            message_count = artifact.message_count,
            size_bytes = artifact.size_bytes,
            "materialized NDJSON artifact"
        );

        Ok(artifact)
    }

    /// Read the full byte contents of an artifact, if it exists and has not
    /// expired. `RESOURCE_EXPIRED` covers both "never existed" and "expired"
    /// — the caller never learns which (spec.md §3, invariant 8).
    pub async fn read(&self, uri: &str) -> Result<Vec<u8>, CoreError> {
        let id = Self::id_from_uri(uri)?;
        let artifact = {
            let entries = self.entries.read().await;
            entries.get(id).cloned()
        };

        let Some(artifact) = artifact else {
            return Err(CoreError::ResourceExpired);
        };
        if artifact.is_expired(Utc::now()) {
            return Err(CoreError::ResourceExpired);
        }

        fs::read(self.path_for(id))
            .await
            .map_err(|_| CoreError::ResourceExpired)
    }

    /// Stream an artifact's lines without loading the whole file, for
    /// callers that want to forward it incrementally.
    pub async fn read_lines(&self, uri: &str) -> Result<Vec<String>, CoreError> {
        let id = Self::id_from_uri(uri)?;
        let artifact = {
            let entries = self.entries.read().await;
            entries.get(id).cloned()
        };
        let Some(artifact) = artifact else {
            return Err(CoreError::ResourceExpired);
        };
        if artifact.is_expired(Utc::now()) {
            return Err(CoreError::ResourceExpired);
        }

        let file = fs::File::open(self.path_for(id))
            .await
            .map_err(|_| CoreError::ResourceExpired)?;
        let mut reader = BufReader::new(file).lines();
        let mut out = Vec::new();
        while let Some(line) = reader
            .next_line()
            .await
            .map_err(|e| CoreError::Internal(format!("reading artifact: {e}")))?
        {
            out.push(line);
        }
        Ok(out)
    }

    /// Remove every artifact whose TTL has elapsed, both from the registry
    /// and from disk. Safe to run concurrently with `create`/`read`: a
    /// reader that already cloned an `Artifact` from the registry keeps
    /// reading the file even if `sweep` deletes the registry entry under it
    /// moments later, since the file itself is only removed here, after the
    /// entry is dropped from the map.
    pub async fn sweep(&self) -> usize {
        let now = Utc::now();
        let expired_ids: Vec<String> = {
            let entries = self.entries.read().await;
            entries
                .iter()
                .filter(|(_, artifact)| artifact.is_expired(now))
                .map(|(id, _)| id.clone())
                .collect()
        };

        if expired_ids.is_empty() {
            return 0;
        }

        let mut entries = self.entries.write().await;
        for id in &expired_ids {
            entries.remove(id);
            let _ = fs::remove_file(self.path_for(id)).await;
        }
        info!(count = expired_ids.len(), "swept expired artifacts");
        expired_ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatKind, ChatRef, Direction, MediaKind, Sender};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn sample_window() -> MessageWindow {
        MessageWindow {
            chat: ChatRef {
                canonical_id: 42,
                kind: ChatKind::Channel,
                username: Some("example".into()),
                title: "Example".into(),
                description: None,
                member_count: None,
                verified: None,
            },
            from_utc: None,
            to_utc: None,
            direction: Direction::Desc,
            page_size: 100,
            search: None,
            filter: None,
        }
    }

    fn sample_message(id: i32) -> Message {
        Message {
            id,
            date: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            text: "hello".into(),
            sender: Sender {
                id: 1,
                username: None,
                display: None,
                is_bot: None,
                verified: None,
            },
            views: None,
            forwards: None,
            replies: None,
            reactions: None,
            pinned: false,
            silent: false,
            post: false,
            noforwards: false,
            media_type: MediaKind::Text,
            has_media: false,
            reply_to_id: None,
            topic_id: None,
            edit_date: None,
        }
    }

    #[tokio::test]
    async fn create_then_read_round_trips() {
        let dir = TempDir::new().unwrap();
        let manager = ResourceManager::new(dir.path().to_path_buf(), Duration::from_secs(3600));
        let messages = vec![sample_message(1), sample_message(2)];

        let artifact = manager.create(&messages, &sample_window()).await.unwrap();
        assert!(artifact.uri.starts_with("artifact://"));
        assert_eq!(artifact.message_count, 2);

        let lines = manager.read_lines(&artifact.uri).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"id\":1"));
    }

    #[tokio::test]
    async fn expired_artifact_reads_as_resource_expired() {
        let dir = TempDir::new().unwrap();
        let manager = ResourceManager::new(dir.path().to_path_buf(), Duration::from_secs(0));
        let artifact = manager.create(&[sample_message(1)], &sample_window()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        let result = manager.read(&artifact.uri).await;
        assert!(matches!(result, Err(CoreError::ResourceExpired)));
    }

    #[tokio::test]
    async fn unknown_uri_is_resource_expired() {
        let dir = TempDir::new().unwrap();
        let manager = ResourceManager::new(dir.path().to_path_buf(), Duration::from_secs(3600));
        let result = manager.read("artifact://does-not-exist").await;
        assert!(matches!(result, Err(CoreError::ResourceExpired)));
    }

    #[tokio::test]
    async fn malformed_uri_is_validation_error() {
        let dir = TempDir::new().unwrap();
        let manager = ResourceManager::new(dir.path().to_path_buf(), Duration::from_secs(3600));
        let result = manager.read("not-a-uri").await;
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn sweep_removes_expired_entries_and_files() {
        let dir = TempDir::new().unwrap();
        let manager = ResourceManager::new(dir.path().to_path_buf(), Duration::from_secs(0));
        let artifact = manager.create(&[sample_message(1)], &sample_window()).await.unwrap();
        let id = artifact.uri.strip_prefix("artifact://").unwrap();
        let path = dir.path().join(format!("{id}.ndjson"));
        assert!(path.exists());

        tokio::time::sleep(Duration::from_millis(10)).await;
        let swept = manager.sweep().await;
        assert_eq!(swept, 1);
        assert!(!path.exists());
    }
}
