//! Desktop side effects: open urls and files with the system handler, set the clipboard.

use std::path::Path;
use std::process::Command;

use paperless_search::prelude::*;
use tracing::debug;

/// Runs the platform's "open" command and copies with `arboard`.
#[derive(Debug, Default)]
pub struct SystemDesktop;

#[cfg(target_os = "macos")]
fn open_command(target: &std::ffi::OsStr) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(target);
    cmd
}

#[cfg(target_os = "windows")]
fn open_command(target: &std::ffi::OsStr) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", "start", ""]).arg(target);
    cmd
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn open_command(target: &std::ffi::OsStr) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(target);
    cmd
}

fn open(target: &std::ffi::OsStr) -> Result<(), PaperlessError> {
    debug!(target = %target.to_string_lossy(), "open");
    let status = open_command(target)
        .status()
        .map_err(|e| PaperlessError::Other {
            message: format!("failed to launch opener for {}: {e}", target.to_string_lossy()),
        })?;
    if !status.success() {
        return Err(PaperlessError::Other {
            message: format!(
                "opener for {} exited with {:?}",
                target.to_string_lossy(),
                status.code()
            ),
        });
    }
    Ok(())
}

impl Desktop for SystemDesktop {
    fn open_url(&self, url: &str) -> Result<(), PaperlessError> {
        open(url.as_ref())
    }

    fn open_path(&self, path: &Path) -> Result<(), PaperlessError> {
        open(path.as_os_str())
    }

    fn set_clipboard_text(&self, text: &str) -> Result<(), PaperlessError> {
        let mut clipboard = arboard::Clipboard::new().map_err(|e| PaperlessError::Other {
            message: format!("failed to access clipboard: {e}"),
        })?;
        clipboard
            .set_text(text)
            .map_err(|e| PaperlessError::Other {
                message: format!("failed to set clipboard: {e}"),
            })
    }
}

/// Prints what would be done instead of doing it. Used with `--dry-run`.
#[derive(Debug, Default)]
pub struct PrintDesktop;

impl Desktop for PrintDesktop {
    fn open_url(&self, url: &str) -> Result<(), PaperlessError> {
        eprintln!("open {url}");
        Ok(())
    }

    fn open_path(&self, path: &Path) -> Result<(), PaperlessError> {
        eprintln!("open {}", path.display());
        Ok(())
    }

    fn set_clipboard_text(&self, text: &str) -> Result<(), PaperlessError> {
        eprintln!("copy {text}");
        Ok(())
    }
}
