//! Append-only journal of composite keys acknowledged by the consumer.

use std::{
    fs::File,
    io::{Read, Seek, SeekFrom, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use mentionwatch_github::CompositeKey;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AckJournal {
    path: PathBuf,
}

impl AckJournal {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Appends one key per line and syncs it to disk before returning.
    ///
    /// A torn last line (no trailing newline) is terminated first so the new
    /// key always lands on its own line.
    pub fn append(&self, key: &CompositeKey) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        let mut line = String::new();
        if ends_without_newline(&mut file)
            .with_context(|| format!("failed to inspect {}", self.path.display()))?
        {
            line.push('\n');
        }
        line.push_str(key.as_str());
        line.push('\n');
        file.write_all(line.as_bytes())
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        file.flush()
            .with_context(|| format!("failed to flush {}", self.path.display()))?;
        file.sync_all()
            .with_context(|| format!("failed to sync {}", self.path.display()))?;
        Ok(())
    }

    /// Reads every acknowledged key; an absent journal is empty.
    ///
    /// Blank lines, lines that are not valid UTF-8, and lines that do not
    /// parse as a key are skipped with a warning.
    pub fn read_keys(&self) -> Result<Vec<CompositeKey>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read(&self.path)
            .with_context(|| format!("failed to read ack journal {}", self.path.display()))?;
        let mut keys = Vec::new();
        for (index, bytes) in raw.split(|byte| *byte == b'\n').enumerate() {
            let line = match std::str::from_utf8(bytes) {
                Ok(line) => line.trim(),
                Err(error) => {
                    warn!(
                        path = %self.path.display(),
                        line = index + 1,
                        %error,
                        "skipping non-utf8 ack journal line"
                    );
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }
            match CompositeKey::parse(line) {
                Ok(key) => keys.push(key),
                Err(error) => warn!(
                    path = %self.path.display(),
                    line = index + 1,
                    %error,
                    "skipping malformed ack journal line"
                ),
            }
        }
        Ok(keys)
    }
}

fn ends_without_newline(file: &mut File) -> std::io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    let mut last = [0_u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}
