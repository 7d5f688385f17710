//! JSON-lines mirror of console output.
//!
//! Every console entry is appended to a file as one JSON object per line,
//! for tooling that tails the console from outside the process:
//!
//! ```text
//! {"time":"2026-01-01T12:00:00Z","message":"Command returned '5'","level":"Info"}
//! ```

use std::io;
use std::path::PathBuf;

use conch_core::LogEntry;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::output::next_entry;

/// Appends entries to `path` until `stop` is cancelled or the channel closes.
/// Resolves to the number of entries written.
pub fn spawn_mirror(
    path: PathBuf,
    mut receiver: broadcast::Receiver<LogEntry>,
    stop: CancellationToken,
) -> JoinHandle<io::Result<u64>> {
    tokio::spawn(async move {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        info!(path = %path.display(), "mirroring console output");

        let mut writer = BufWriter::new(file);
        let mut written = 0_u64;
        while let Some(entry) = next_entry(&mut receiver, &stop).await {
            let mut line = serde_json::to_vec(&entry).map_err(io::Error::other)?;
            line.push(b'\n');
            writer.write_all(&line).await?;
            writer.flush().await?;
            written += 1;
        }

        debug!(path = %path.display(), written, "console mirror closed");
        Ok(written)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use conch_core::LogLevel;

    #[tokio::test]
    async fn test_mirror_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("console.jsonl");
        std::fs::write(&path, "").unwrap();

        let (sender, receiver) = broadcast::channel(8);
        let stop = CancellationToken::new();
        let mirror = spawn_mirror(path.clone(), receiver, stop.clone());

        sender.send(LogEntry::info("hello").with_color_tag("green")).unwrap();
        sender.send(LogEntry::error("oops")).unwrap();
        stop.cancel();
        assert_eq!(mirror.await.unwrap().unwrap(), 2);

        let contents = std::fs::read_to_string(&path).unwrap();
        let entries: Vec<LogEntry> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].color_tag.as_deref(), Some("green"));
        assert_eq!(entries[1].level, LogLevel::Error);
    }
}
