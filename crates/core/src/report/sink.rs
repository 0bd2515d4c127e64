//! # Artifact Sinks
//!
//! Durable storage for synthesized reports. The orchestration core only ever
//! calls [`ArtifactSink::store`]; listing is for callers browsing history.

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::fs;

/// Write collaborator for final artifacts
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Persist `content` under `identifier`, replacing any previous content
    async fn store(&self, identifier: &str, content: &str) -> Result<()>;

    /// Stored identifiers, newest first
    async fn history(&self) -> Result<Vec<String>>;
}

fn check_identifier(identifier: &str) -> Result<()> {
    if identifier.is_empty() || identifier.contains(['/', '\\']) || identifier.starts_with('.') {
        anyhow::bail!("Invalid artifact identifier: {:?}", identifier);
    }
    Ok(())
}

/// Stores each artifact as `<dir>/<identifier>.md`
#[derive(Debug, Clone)]
pub struct FileArtifactSink {
    dir: PathBuf,
}

impl FileArtifactSink {
    const EXTENSION: &'static str = "md";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path an identifier is stored at
    pub fn path_for(&self, identifier: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", identifier, Self::EXTENSION))
    }

    /// Read a stored artifact back
    pub async fn load(&self, identifier: &str) -> Result<String> {
        check_identifier(identifier)?;
        let path = self.path_for(identifier);
        fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read artifact: {:?}", path))
    }
}

#[async_trait]
impl ArtifactSink for FileArtifactSink {
    async fn store(&self, identifier: &str, content: &str) -> Result<()> {
        check_identifier(identifier)?;
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create artifact directory: {:?}", self.dir))?;

        let path = self.path_for(identifier);
        fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write artifact: {:?}", path))?;
        tracing::info!(path = %path.display(), "artifact stored");
        Ok(())
    }

    async fn history(&self) -> Result<Vec<String>> {
        if fs::metadata(&self.dir).await.is_err() {
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("Failed to read directory: {:?}", self.dir))?;

        let mut identifiers = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(Self::EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                identifiers.push(stem.to_string());
            }
        }

        identifiers.sort_unstable_by(|a, b| b.cmp(a));
        Ok(identifiers)
    }
}

/// Stores artifacts in a SQLite table
pub struct SqliteArtifactSink {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteArtifactSink {
    /// Open or create the database at `path`
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path.as_ref()).context("Failed to open artifact database")?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS artifacts (
                identifier TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                stored_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
            [],
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))
    }

    pub fn load(&self, identifier: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let content = conn
            .query_row(
                "SELECT content FROM artifacts WHERE identifier = ?1",
                params![identifier],
                |row| row.get(0),
            )
            .optional()?;
        Ok(content)
    }
}

#[async_trait]
impl ArtifactSink for SqliteArtifactSink {
    async fn store(&self, identifier: &str, content: &str) -> Result<()> {
        check_identifier(identifier)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO artifacts (identifier, content, stored_at) VALUES (?1, ?2, ?3)",
            params![identifier, content, chrono::Utc::now().to_rfc3339()],
        )
        .context("Failed to store artifact")?;
        Ok(())
    }

    async fn history(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT identifier FROM artifacts ORDER BY identifier DESC")?;
        let identifiers = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(identifiers)
    }
}

/// Keeps artifacts in memory; handy for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryArtifactSink {
    artifacts: Mutex<BTreeMap<String, String>>,
}

impl MemoryArtifactSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identifier: &str) -> Option<String> {
        self.artifacts
            .lock()
            .ok()
            .and_then(|a| a.get(identifier).cloned())
    }
}

#[async_trait]
impl ArtifactSink for MemoryArtifactSink {
    async fn store(&self, identifier: &str, content: &str) -> Result<()> {
        check_identifier(identifier)?;
        self.artifacts
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?
            .insert(identifier.to_string(), content.to_string());
        Ok(())
    }

    async fn history(&self) -> Result<Vec<String>> {
        let artifacts = self
            .artifacts
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        Ok(artifacts.keys().rev().cloned().collect())
    }
}
