pub mod command;
pub mod system;

pub use command::CommandClipboard;
pub use system::{ArboardClipboard, SystemClipboard};

use crate::error::{Error, Result};

/// Read and write access to a clipboard.
pub trait ClipboardPort {
    /// Current clipboard text. Empty or whitespace-only contents count as
    /// unavailable.
    fn read(&mut self) -> Result<String>;

    fn write(&mut self, text: &str) -> Result<()>;
}

pub(crate) fn require_text(text: String) -> Result<String> {
    if text.trim().is_empty() {
        return Err(Error::ClipboardUnavailable(
            "clipboard is empty or whitespace".to_string(),
        ));
    }
    Ok(text)
}

/// Process-local clipboard. Keeps call counts so callers can check whether
/// it was touched.
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    contents: Option<String>,
    pub reads: usize,
    pub writes: usize,
    fail_writes: bool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            contents: Some(text.into()),
            ..Self::default()
        }
    }

    /// Make every `write` fail, as a locked or missing display would.
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }
}

impl ClipboardPort for MemoryClipboard {
    fn read(&mut self) -> Result<String> {
        self.reads += 1;
        require_text(self.contents.clone().unwrap_or_default())
    }

    fn write(&mut self, text: &str) -> Result<()> {
        self.writes += 1;
        if self.fail_writes {
            return Err(Error::ClipboardUnavailable(
                "clipboard rejected write".to_string(),
            ));
        }
        self.contents = Some(text.to_string());
        Ok(())
    }
}
