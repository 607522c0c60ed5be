use std::io::Write;
use std::process::{Command, Stdio};

use tracing::debug;

use super::{ClipboardPort, require_text};
use crate::error::{Error, Result};

/// Check whether `command` is on PATH.
pub fn command_exists(command: &str) -> bool {
    let check = if cfg!(windows) {
        Command::new("where").arg(command).output()
    } else {
        Command::new("which").arg(command).output()
    };

    matches!(check, Ok(output) if output.status.success())
}

/// Run `command` and capture stdout as UTF-8.
pub fn run_command(command: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(command)
        .args(args)
        .output()
        .map_err(|e| Error::ClipboardUnavailable(format!("failed to execute '{command}': {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::ClipboardUnavailable(format!(
            "'{}' failed with exit code {:?}: {}",
            command,
            output.status.code(),
            stderr.trim()
        )));
    }

    String::from_utf8(output.stdout)
        .map_err(|_| Error::ClipboardUnavailable(format!("invalid UTF-8 output from '{command}'")))
}

/// Feed `input` to `command` on stdin.
///
/// stdout/stderr are discarded: xclip and wl-copy fork a child that keeps
/// serving the selection, and it would hold captured pipes open forever.
pub fn pipe_to_command(command: &str, args: &[&str], input: &str) -> Result<()> {
    let mut child = Command::new(command)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| Error::ClipboardUnavailable(format!("failed to execute '{command}': {e}")))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input.as_bytes()).map_err(|e| {
            Error::ClipboardUnavailable(format!("failed to write to '{command}': {e}"))
        })?;
    }

    let status = child
        .wait()
        .map_err(|e| Error::ClipboardUnavailable(format!("'{command}' did not finish: {e}")))?;

    if !status.success() {
        return Err(Error::ClipboardUnavailable(format!(
            "'{}' failed with exit code {:?}",
            command,
            status.code()
        )));
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation {
    pub program: &'static str,
    pub args: &'static [&'static str],
}

/// Clipboard backed by a pair of platform utilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandClipboard {
    pub name: &'static str,
    pub paste: Invocation,
    pub copy: Invocation,
}

impl CommandClipboard {
    pub const WAYLAND: Self = Self {
        name: "wayland",
        paste: Invocation {
            program: "wl-paste",
            args: &["--no-newline"],
        },
        copy: Invocation {
            program: "wl-copy",
            args: &[],
        },
    };

    pub const XCLIP: Self = Self {
        name: "xclip",
        paste: Invocation {
            program: "xclip",
            args: &["-selection", "clipboard", "-o"],
        },
        copy: Invocation {
            program: "xclip",
            args: &["-selection", "clipboard"],
        },
    };

    pub const XSEL: Self = Self {
        name: "xsel",
        paste: Invocation {
            program: "xsel",
            args: &["--clipboard", "--output"],
        },
        copy: Invocation {
            program: "xsel",
            args: &["--clipboard", "--input"],
        },
    };

    pub const PASTEBOARD: Self = Self {
        name: "pasteboard",
        paste: Invocation {
            program: "pbpaste",
            args: &[],
        },
        copy: Invocation {
            program: "pbcopy",
            args: &[],
        },
    };

    /// Candidates for the host platform, most preferred first.
    pub fn candidates(macos: bool, wayland: bool) -> Vec<Self> {
        if macos {
            return vec![Self::PASTEBOARD];
        }

        let mut candidates = Vec::new();
        if wayland {
            candidates.push(Self::WAYLAND);
        }
        candidates.push(Self::XCLIP);
        candidates.push(Self::XSEL);
        candidates
    }

    pub fn is_installed(&self) -> bool {
        command_exists(self.paste.program) && command_exists(self.copy.program)
    }
}

impl ClipboardPort for CommandClipboard {
    fn read(&mut self) -> Result<String> {
        debug!(backend = self.name, "reading clipboard");
        require_text(run_command(self.paste.program, self.paste.args)?)
    }

    fn write(&mut self, text: &str) -> Result<()> {
        debug!(backend = self.name, bytes = text.len(), "writing clipboard");
        pipe_to_command(self.copy.program, self.copy.args, text)
    }
}
