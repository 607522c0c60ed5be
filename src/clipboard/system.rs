use arboard::Clipboard;
use tracing::debug;

use super::{ClipboardPort, CommandClipboard, require_text};
use crate::error::{Error, Result};
use crate::utils::env::Environment;

/// In-process clipboard via `arboard`.
///
/// On X11/Wayland the selection is owned by this process, so text written
/// here only outlives the process when a clipboard manager picks it up.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArboardClipboard;

impl ClipboardPort for ArboardClipboard {
    fn read(&mut self) -> Result<String> {
        let mut clipboard = open_clipboard()?;
        let text = clipboard
            .get_text()
            .map_err(|e| Error::ClipboardUnavailable(format!("failed to read clipboard: {e}")))?;
        require_text(text)
    }

    fn write(&mut self, text: &str) -> Result<()> {
        let mut clipboard = open_clipboard()?;
        clipboard.set_text(text).map_err(|e| {
            Error::ClipboardUnavailable(format!("failed to copy text to clipboard: {e}"))
        })
    }
}

fn open_clipboard() -> Result<Clipboard> {
    Clipboard::new()
        .map_err(|e| Error::ClipboardUnavailable(format!("failed to access system clipboard: {e}")))
}

/// The clipboard for the host platform.
#[derive(Debug, Clone, Copy)]
pub enum SystemClipboard {
    Command(CommandClipboard),
    Arboard(ArboardClipboard),
}

impl SystemClipboard {
    /// Prefer the platform's clipboard utilities, falling back to arboard
    /// when none are installed.
    pub fn detect(env: &Environment) -> Self {
        let macos = cfg!(target_os = "macos");
        let wayland = env.get_non_empty("WAYLAND_DISPLAY").is_some();

        if cfg!(unix) {
            for candidate in CommandClipboard::candidates(macos, wayland) {
                if candidate.is_installed() {
                    debug!(backend = candidate.name, "using clipboard utility");
                    return SystemClipboard::Command(candidate);
                }
            }
        }

        debug!("no clipboard utility found, using arboard");
        SystemClipboard::Arboard(ArboardClipboard)
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            SystemClipboard::Command(c) => c.name,
            SystemClipboard::Arboard(_) => "arboard",
        }
    }
}

impl ClipboardPort for SystemClipboard {
    fn read(&mut self) -> Result<String> {
        match self {
            SystemClipboard::Command(c) => c.read(),
            SystemClipboard::Arboard(c) => c.read(),
        }
    }

    fn write(&mut self, text: &str) -> Result<()> {
        match self {
            SystemClipboard::Command(c) => c.write(text),
            SystemClipboard::Arboard(c) => c.write(text),
        }
    }
}
