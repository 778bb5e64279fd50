use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::error::PersistenceError;

/// Append-only, line-per-message chat log on disk.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line, creating the log if needed. The line and its newline
    /// go out in a single write.
    pub async fn append(&self, line: &str) -> Result<(), PersistenceError> {
        let append_err = |source| PersistenceError::Append {
            path: self.path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(append_err)?;

        let mut record = String::with_capacity(line.len() + 1);
        record.push_str(line);
        record.push('\n');
        file.write_all(record.as_bytes()).await.map_err(append_err)?;
        file.flush().await.map_err(append_err)
    }

    /// Every stored line in append order. A log that was never created reads
    /// as empty.
    pub async fn read_all(&self) -> Result<Vec<String>, PersistenceError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        Ok(String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> HistoryStore {
        HistoryStore::new(dir.path().join("chat_history.txt"))
    }

    #[tokio::test]
    async fn test_missing_log_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.read_all().await.unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_append_creates_log() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.append("Alice: hello").await.unwrap();
        assert_eq!(
            std::fs::read_to_string(store.path()).unwrap(),
            "Alice: hello\n"
        );
    }

    #[tokio::test]
    async fn test_read_all_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let lines = ["Alice: one", "Bob: two", "", "Alice: three"];
        for line in lines {
            store.append(line).await.unwrap();
        }
        assert_eq!(store.read_all().await.unwrap(), lines);
    }

    #[tokio::test]
    async fn test_appends_to_existing_log() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "old line\n").unwrap();
        store.append("new line").await.unwrap();
        assert_eq!(
            store.read_all().await.unwrap(),
            vec!["old line".to_string(), "new line".to_string()]
        );
    }

    #[tokio::test]
    async fn test_append_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("nope").join("log.txt"));
        let err = store.append("lost").await.unwrap_err();
        assert!(matches!(err, PersistenceError::Append { .. }));
    }

    #[tokio::test]
    async fn test_read_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path());
        let err = store.read_all().await.unwrap_err();
        assert!(matches!(err, PersistenceError::Read { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_appends_keep_whole_lines() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let mut tasks = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.append(&format!("user{i}: message {i}")).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let mut lines = store.read_all().await.unwrap();
        lines.sort();
        let mut expected: Vec<String> = (0..20).map(|i| format!("user{i}: message {i}")).collect();
        expected.sort();
        assert_eq!(lines, expected);
    }
}
