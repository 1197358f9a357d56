//! Append-only log of upload events.
//!
//! One plain-text line per successful cache-miss flow, meant for grepping,
//! never read back by this process. No rotation, no size bound.

use chrono::{SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use tokio::{
    fs::{self, OpenOptions},
    io::AsyncWriteExt,
};

#[derive(Clone, Debug)]
pub struct UploadLog {
    path: PathBuf,
}

impl UploadLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one `<timestamp> | <typeLabel> | ID: <id> | <status>` line.
    ///
    /// Best-effort: a write failure is logged as a warning and swallowed so
    /// the response path never stalls on log I/O.
    pub async fn record(&self, id: &str, type_label: &str, status: &str) {
        if let Err(err) = self.append(id, type_label, status).await {
            tracing::warn!(id, type_label, error = %err, "failed to append upload log entry");
        }
    }

    async fn append(&self, id: &str, type_label: &str, status: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let entry = format!(
            "{} | {} | ID: {} | {}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            type_label,
            id,
            status
        );
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(entry.as_bytes()).await?;
        // tokio::fs::File buffers writes in a background task; flush waits
        // for the bytes to actually reach the file before `record` returns.
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn record_appends_one_parseable_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let log = UploadLog::new(dir.path().join("logs/uploads.log"));

        log.record("550", "movie", "uploaded").await;
        log.record("1396", "episode 5-14", "uploaded").await;

        let contents = fs::read_to_string(log.path()).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let fields: Vec<&str> = lines[0].split(" | ").collect();
        assert_eq!(fields.len(), 4);
        assert!(DateTime::parse_from_rfc3339(fields[0]).is_ok());
        assert_eq!(fields[1], "movie");
        assert_eq!(fields[2], "ID: 550");
        assert_eq!(fields[3], "uploaded");

        assert!(lines[1].contains(" | episode 5-14 | ID: 1396 | uploaded"));
    }

    #[tokio::test]
    async fn write_failure_is_swallowed() {
        // Path whose parent is an existing file, so the append must fail.
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").await.unwrap();

        let log = UploadLog::new(blocker.join("uploads.log"));
        // Must return without panicking or erroring.
        log.record("1", "movie", "uploaded").await;
    }
}
