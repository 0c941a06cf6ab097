use std::{
    io::Write,
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Context, Result};
use mentionwatch_github::MentionEvent;

#[derive(Clone)]
/// Newline-delimited JSON output stream, flushed after every event.
pub struct JsonlEventSink {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl JsonlEventSink {
    pub fn stdout() -> Self {
        Self::from_writer(std::io::stdout())
    }

    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn emit(&self, event: &MentionEvent) -> Result<()> {
        let line = serde_json::to_string(event).context("failed to encode mention event")?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow!("event sink mutex is poisoned"))?;
        writeln!(writer, "{line}").context("failed to write mention event")?;
        writer.flush().context("failed to flush mention event")?;
        Ok(())
    }
}
