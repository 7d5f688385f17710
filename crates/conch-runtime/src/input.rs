//! Input sources for the interactive loop.

use std::collections::VecDeque;
use std::io;

use async_trait::async_trait;
use conch_core::InputMode;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

/// Supplies raw input lines to the runtime.
///
/// `mode` is the read mode of the pending prompt: key prompts expect a single
/// key or key name rather than a full command line.
#[async_trait]
pub trait InputSource: Send {
    /// Next line without its terminator, or `None` at end of input.
    async fn next_line(&mut self, mode: InputMode) -> io::Result<Option<String>>;
}

/// Reads lines from standard input, printing a prompt symbol first.
pub struct StdinSource {
    lines: Lines<BufReader<Stdin>>,
    prompt_symbol: String,
}

impl StdinSource {
    pub fn new(prompt_symbol: impl Into<String>) -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            prompt_symbol: prompt_symbol.into(),
        }
    }
}

#[async_trait]
impl InputSource for StdinSource {
    async fn next_line(&mut self, mode: InputMode) -> io::Result<Option<String>> {
        let symbol = match mode {
            InputMode::Line => self.prompt_symbol.as_str(),
            InputMode::Key => "[key] ",
        };
        if !symbol.is_empty() {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(symbol.as_bytes()).await?;
            stdout.flush().await?;
        }

        let line = self.lines.next_line().await?;
        Ok(line.map(|l| match mode {
            InputMode::Line => l,
            InputMode::Key => l.trim().to_string(),
        }))
    }
}

/// A fixed list of lines, for scripts and tests.
#[derive(Debug, Clone, Default)]
pub struct ScriptSource {
    lines: VecDeque<String>,
}

impl ScriptSource {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// One line per line of `text`; blank lines and `#` comments are skipped.
    pub fn from_script(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#')),
        )
    }

    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

#[async_trait]
impl InputSource for ScriptSource {
    async fn next_line(&mut self, _mode: InputMode) -> io::Result<Option<String>> {
        Ok(self.lines.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_source() {
        let mut source = ScriptSource::from_script("# setup\nadd 1 2\n\n  echo hi  \n");
        assert_eq!(source.remaining(), 2);
        assert_eq!(
            source.next_line(InputMode::Line).await.unwrap().as_deref(),
            Some("add 1 2")
        );
        assert_eq!(
            source.next_line(InputMode::Key).await.unwrap().as_deref(),
            Some("echo hi")
        );
        assert!(source.next_line(InputMode::Line).await.unwrap().is_none());
    }
}
