//! Console output printing.
//!
//! The session logs into a [`BroadcastSink`](conch_core::BroadcastSink); the
//! printer task subscribes to it and writes each entry as one line. Entries
//! produced by commands that complete in the background are printed the
//! same way.

use std::io;

use conch_core::{LogEntry, LogLevel};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// ANSI "erase display, cursor home".
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Waits for the next entry.
///
/// Buffered entries are always drained before `stop` is observed, so nothing
/// logged before the stop request is lost.
pub(crate) async fn next_entry(
    receiver: &mut broadcast::Receiver<LogEntry>,
    stop: &CancellationToken,
) -> Option<LogEntry> {
    loop {
        tokio::select! {
            biased;
            received = receiver.recv() => match received {
                Ok(entry) => return Some(entry),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "console output lagged, entries dropped");
                }
                Err(RecvError::Closed) => return None,
            },
            _ = stop.cancelled() => return None,
        }
    }
}

/// Renders an entry as printed on the terminal.
pub fn render_entry(entry: &LogEntry) -> String {
    match entry.level {
        LogLevel::Clear => CLEAR_SCREEN.to_string(),
        _ => format!("{entry}\n"),
    }
}

/// Prints entries to `writer` until `stop` is cancelled or the channel
/// closes, then hands the writer back.
pub fn spawn_printer<W>(
    mut receiver: broadcast::Receiver<LogEntry>,
    mut writer: W,
    stop: CancellationToken,
) -> JoinHandle<io::Result<W>>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(entry) = next_entry(&mut receiver, &stop).await {
            writer.write_all(render_entry(&entry).as_bytes()).await?;
            writer.flush().await?;
        }
        Ok(writer)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_entry() {
        let entry = LogEntry::warning("careful");
        let line = render_entry(&entry);
        assert!(line.ends_with("[Warning] careful\n"));
        assert_eq!(render_entry(&LogEntry::clear()), CLEAR_SCREEN);
    }

    #[tokio::test]
    async fn test_printer_drains_before_stopping() {
        let (sender, receiver) = broadcast::channel(16);
        let stop = CancellationToken::new();
        let printer = spawn_printer(receiver, Vec::new(), stop.clone());

        sender.send(LogEntry::info("one")).unwrap();
        sender.send(LogEntry::error("two")).unwrap();
        stop.cancel();

        let written = String::from_utf8(printer.await.unwrap().unwrap()).unwrap();
        let lines: Vec<_> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[Info] one"));
        assert!(lines[1].ends_with("[Error] two"));
    }
}
