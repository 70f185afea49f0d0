//! libSQL storage layer (local file).
//!
//! The [`Storage`] struct wraps a libSQL database holding a string key-value
//! store and the persisted topic enrichment cache.
//!
//! **Access rules:**
//! - `generate`, `expand` and `chat` write via [`Storage::open`]
//! - `show` and `resources` read via [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use chrono::Utc;
use libsql::{Connection, Database, params};
use serde::Serialize;
use serde::de::DeserializeOwned;

use roadmapper_shared::{
    Conversation, ResourceEntry, Result, RoadmapError, RoadmapNode, TopicEnrichment, UserProfile,
};

/// Well-known keys in `kv_store`.
pub mod keys {
    pub const ROADMAP: &str = "roadmap";
    pub const USER_PROFILE: &str = "user_profile";
    pub const CHAT_CONVERSATIONS: &str = "chat_conversations";
    pub const CURRENT_TOPIC: &str = "current_topic";
    pub const RESOURCES: &str = "resources";
}

/// File name of the database inside the data directory.
pub const DATABASE_FILE: &str = "roadmapper.db";

fn storage_err(e: libsql::Error) -> RoadmapError {
    RoadmapError::Storage(e.to_string())
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RoadmapError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path`; every write is rejected.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RoadmapError::Storage(format!(
                "no database at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Open `roadmapper.db` inside `data_dir`.
    pub async fn open_in(data_dir: &Path, readonly: bool) -> Result<Self> {
        let path = data_dir.join(DATABASE_FILE);
        if readonly {
            Self::open_readonly(&path).await
        } else {
            Self::open(&path).await
        }
    }

    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        RoadmapError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 before the first migration.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            Err(_) => 0,
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(RoadmapError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    // -----------------------------------------------------------------------
    // Key-value store
    // -----------------------------------------------------------------------

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM kv_store WHERE key = ?1", params![key])
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => Ok(Some(row.get::<String>(0).map_err(storage_err)?)),
            None => Ok(None),
        }
    }

    /// Write `value` under `key`, replacing any previous value.
    pub async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, now.as_str()],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Remove `key`. Returns `false` if it was not present.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        self.check_writable()?;
        let affected = self
            .conn
            .execute("DELETE FROM kv_store WHERE key = ?1", params![key])
            .await
            .map_err(storage_err)?;
        Ok(affected > 0)
    }

    /// All keys, sorted.
    pub async fn keys(&self) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query("SELECT key FROM kv_store ORDER BY key", params![])
            .await
            .map_err(storage_err)?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            out.push(row.get::<String>(0).map_err(storage_err)?);
        }
        Ok(out)
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn put_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.put(key, &raw).await
    }

    // -----------------------------------------------------------------------
    // Typed helpers
    // -----------------------------------------------------------------------

    pub async fn load_roadmap(&self) -> Result<Option<RoadmapNode>> {
        self.get_json(keys::ROADMAP).await
    }

    pub async fn save_roadmap(&self, root: &RoadmapNode) -> Result<()> {
        self.put_json(keys::ROADMAP, root).await
    }

    pub async fn load_user_profile(&self) -> Result<Option<UserProfile>> {
        self.get_json(keys::USER_PROFILE).await
    }

    pub async fn save_user_profile(&self, profile: &UserProfile) -> Result<()> {
        self.put_json(keys::USER_PROFILE, profile).await
    }

    /// Stored conversations, or an empty list.
    pub async fn load_conversations(&self) -> Result<Vec<Conversation>> {
        Ok(self
            .get_json(keys::CHAT_CONVERSATIONS)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_conversations(&self, conversations: &[Conversation]) -> Result<()> {
        self.put_json(keys::CHAT_CONVERSATIONS, conversations).await
    }

    pub async fn current_topic(&self) -> Result<Option<String>> {
        self.get(keys::CURRENT_TOPIC).await
    }

    pub async fn set_current_topic(&self, topic: &str) -> Result<()> {
        self.put(keys::CURRENT_TOPIC, topic).await
    }

    pub async fn load_resources(&self) -> Result<Vec<ResourceEntry>> {
        Ok(self.get_json(keys::RESOURCES).await?.unwrap_or_default())
    }

    pub async fn save_resources(&self, resources: &[ResourceEntry]) -> Result<()> {
        self.put_json(keys::RESOURCES, resources).await
    }

    // -----------------------------------------------------------------------
    // Enrichment cache
    // -----------------------------------------------------------------------

    /// Every cached topic enrichment, sorted by key.
    pub async fn load_enrichment_cache(&self) -> Result<Vec<(String, TopicEnrichment)>> {
        let mut rows = self
            .conn
            .query(
                "SELECT topic_key, description, reference_link FROM enrichment_cache
                 ORDER BY topic_key",
                params![],
            )
            .await
            .map_err(storage_err)?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            out.push((
                row.get::<String>(0).map_err(storage_err)?,
                TopicEnrichment {
                    description: row.get::<String>(1).map_err(storage_err)?,
                    reference_link: row.get::<String>(2).map_err(storage_err)?,
                },
            ));
        }
        Ok(out)
    }

    /// Upsert cache entries in one transaction. Returns how many rows were
    /// written; on error nothing is written.
    pub async fn save_enrichment_cache(&self, entries: &[(String, TopicEnrichment)]) -> Result<usize> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction().await.map_err(storage_err)?;
        let written = async {
            for (key, enrichment) in entries {
                tx.execute(
                    "INSERT INTO enrichment_cache (topic_key, description, reference_link, updated_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(topic_key) DO UPDATE SET
                        description = excluded.description,
                        reference_link = excluded.reference_link,
                        updated_at = excluded.updated_at",
                    params![
                        key.as_str(),
                        enrichment.description.as_str(),
                        enrichment.reference_link.as_str(),
                        now.as_str()
                    ],
                )
                .await?;
            }
            Ok::<_, libsql::Error>(())
        }
        .await;

        if let Err(e) = written {
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!(error = %rollback, "enrichment cache rollback failed");
            }
            return Err(storage_err(e));
        }
        tx.commit().await.map_err(storage_err)?;
        tracing::debug!(entries = entries.len(), "enrichment cache saved");
        Ok(entries.len())
    }

    pub async fn clear_enrichment_cache(&self) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute("DELETE FROM enrichment_cache", params![])
            .await
            .map_err(storage_err)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use roadmapper_shared::{ChatMessage, ResourceKind};
    use std::path::PathBuf;
    use uuid::Uuid;

    fn temp_db() -> PathBuf {
        std::env::temp_dir().join(format!("rm_test_{}.db", Uuid::now_v7()))
    }

    async fn test_storage() -> Storage {
        Storage::open(&temp_db()).await.expect("open test db")
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        assert_eq!(storage.get_schema_version().await, 2);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = temp_db();
        let s1 = Storage::open(&tmp).await.expect("first open");
        s1.put("k", "v").await.unwrap();
        drop(s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 2);
        assert_eq!(s2.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn put_is_last_write_wins() {
        let storage = test_storage().await;
        storage.put(keys::CURRENT_TOPIC, "Rust").await.unwrap();
        storage.put(keys::CURRENT_TOPIC, "Go").await.unwrap();

        assert_eq!(storage.current_topic().await.unwrap().as_deref(), Some("Go"));
        assert_eq!(storage.keys().await.unwrap(), ["current_topic"]);
    }

    #[tokio::test]
    async fn missing_key_and_delete() {
        let storage = test_storage().await;
        assert!(storage.get("nope").await.unwrap().is_none());

        storage.put("a", "1").await.unwrap();
        assert!(storage.delete("a").await.unwrap());
        assert!(!storage.delete("a").await.unwrap());
        assert!(storage.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = temp_db();
        {
            let rw = Storage::open(&tmp).await.unwrap();
            rw.put("a", "1").await.unwrap();
        }

        let ro = Storage::open_readonly(&tmp).await.unwrap();
        assert!(ro.is_readonly());
        assert_eq!(ro.get("a").await.unwrap().as_deref(), Some("1"));

        let err = ro.put("a", "2").await.unwrap_err();
        assert!(matches!(err, RoadmapError::Storage(_)));
        assert!(ro.delete("a").await.is_err());
        assert!(ro.save_enrichment_cache(&[]).await.is_err());
    }

    #[tokio::test]
    async fn readonly_requires_existing_file() {
        assert!(Storage::open_readonly(&temp_db()).await.is_err());
    }

    #[tokio::test]
    async fn roadmap_roundtrip_keeps_ids() {
        let storage = test_storage().await;
        let mut root = RoadmapNode::new("Rust");
        let mut basics = RoadmapNode::new("Basics");
        basics.description = Some("Start here".into());
        root.children.push(basics);

        storage.save_roadmap(&root).await.unwrap();
        let loaded = storage.load_roadmap().await.unwrap().unwrap();
        assert_eq!(loaded, root);
    }

    #[tokio::test]
    async fn corrupt_value_is_serialization_error() {
        let storage = test_storage().await;
        storage.put(keys::ROADMAP, "{not json").await.unwrap();
        let err = storage.load_roadmap().await.unwrap_err();
        assert!(matches!(err, RoadmapError::Serialization(_)));
    }

    #[tokio::test]
    async fn conversations_default_to_empty() {
        let storage = test_storage().await;
        assert!(storage.load_conversations().await.unwrap().is_empty());

        let conversation = Conversation {
            id: Uuid::now_v7().to_string(),
            title: "Traits".into(),
            messages: vec![ChatMessage::user("What is a trait?")],
            last_updated: Utc::now(),
            topic: None,
        };
        storage.save_conversations(&[conversation.clone()]).await.unwrap();
        assert_eq!(storage.load_conversations().await.unwrap(), [conversation]);
    }

    #[tokio::test]
    async fn resources_roundtrip() {
        let storage = test_storage().await;
        let entry = ResourceEntry {
            kind: ResourceKind::Document,
            title: "Book".into(),
            summary: "The book".into(),
            url: "https://doc.rust-lang.org/book/".into(),
        };
        storage.save_resources(&[entry.clone()]).await.unwrap();
        assert_eq!(storage.load_resources().await.unwrap(), [entry]);
    }

    #[tokio::test]
    async fn enrichment_cache_upserts() {
        let storage = test_storage().await;
        let first = TopicEnrichment {
            description: "old".into(),
            reference_link: "https://videos.test/a".into(),
        };
        let second = TopicEnrichment {
            description: "new".into(),
            ..first.clone()
        };

        storage
            .save_enrichment_cache(&[("Loops".into(), first), ("Traits".into(), second.clone())])
            .await
            .unwrap();
        storage
            .save_enrichment_cache(&[("Loops".into(), second.clone())])
            .await
            .unwrap();

        let cached = storage.load_enrichment_cache().await.unwrap();
        assert_eq!(cached.len(), 2);
        assert_eq!(cached[0], ("Loops".to_string(), second));

        storage.clear_enrichment_cache().await.unwrap();
        assert!(storage.load_enrichment_cache().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn enrichment_cache_save_is_all_or_nothing() {
        let storage = test_storage().await;
        storage
            .conn
            .execute(
                "CREATE TRIGGER reject_bad BEFORE INSERT ON enrichment_cache
                 WHEN NEW.topic_key = 'Bad'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END",
                params![],
            )
            .await
            .unwrap();

        let entry = TopicEnrichment {
            description: "Repeat work".into(),
            reference_link: "https://www.youtube.com/watch?v=abcdef123".into(),
        };
        let result = storage
            .save_enrichment_cache(&[("Good".into(), entry.clone()), ("Bad".into(), entry)])
            .await;

        assert!(result.is_err());
        assert!(storage.load_enrichment_cache().await.unwrap().is_empty());
    }
}
