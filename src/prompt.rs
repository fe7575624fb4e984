//! User prompting seam.
//!
//! Prompting belongs to the embedding host; the pipeline only ever asks two
//! questions through the [`Prompter`] trait. The default implementation
//! talks to the terminal and answers conservatively when stdin is not one.

use anyhow::{bail, Context, Result};
use std::io::{BufRead, Write};

pub trait Prompter: Send {
    /// Yes/no confirmation. Must not default to yes.
    fn confirm(&mut self, question: &str) -> Result<bool>;

    /// Read a non-empty search pattern, re-prompting until one is given.
    /// An empty reply falls back to `default` when there is one.
    fn read_pattern(&mut self, default: Option<&str>) -> Result<String>;
}

pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        if !atty::is(atty::Stream::Stdin) {
            // Non-interactive runs never build implicitly; use --yes.
            return Ok(false);
        }
        print!("{} [y/N] ", question);
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read reply")?;
        let reply = line.trim().to_ascii_lowercase();
        Ok(reply == "y" || reply == "yes")
    }

    fn read_pattern(&mut self, default: Option<&str>) -> Result<String> {
        if !atty::is(atty::Stream::Stdin) {
            bail!("No pattern given and stdin is not a terminal");
        }
        loop {
            match default {
                Some(previous) => print!("Search pattern [{}]: ", previous),
                None => print!("Search pattern: "),
            }
            std::io::stdout().flush().context("Failed to flush stdout")?;

            let mut line = String::new();
            let read = std::io::stdin()
                .lock()
                .read_line(&mut line)
                .context("Failed to read pattern")?;
            if read == 0 {
                bail!("stdin closed while waiting for a pattern");
            }

            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Ok(trimmed.to_string());
            }
            if let Some(previous) = default {
                return Ok(previous.to_string());
            }
            // Empty patterns never reach the pipeline; ask again.
        }
    }
}
