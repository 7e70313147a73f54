//! Application and URL launching
//!
//! Launches are fire-and-forget: the process is spawned and reaped on a short-lived
//! thread, so a mistyped app name only shows up as a warning from the OS opener (if at all).

use std::collections::BTreeMap;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

use crate::error::AutomationError;

pub trait Launcher {
    /// Launch an application by spoken token (resolved through the alias table)
    fn launch(&mut self, token: &str) -> Result<(), AutomationError>;
    /// Open a URL with the default handler
    fn open_url(&mut self, url: &str) -> Result<(), AutomationError>;
}

/// Spawns the platform opener
pub struct DesktopLauncher {
    aliases: BTreeMap<String, String>,
}

impl DesktopLauncher {
    pub fn new(aliases: BTreeMap<String, String>) -> Self {
        Self { aliases }
    }

    fn resolve<'a>(&'a self, token: &'a str) -> &'a str {
        self.aliases.get(token).map(String::as_str).unwrap_or(token)
    }
}

/// Command that starts an application target on this platform
fn app_command(target: &str) -> Command {
    #[cfg(target_os = "macos")]
    {
        let mut cmd = Command::new("open");
        cmd.arg("-a").arg(target);
        cmd
    }
    #[cfg(target_os = "windows")]
    {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]).arg(target);
        cmd
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        let mut parts = target.split_whitespace();
        let mut cmd = Command::new(parts.next().unwrap_or(target));
        cmd.args(parts);
        cmd
    }
}

/// Command that opens a URL in the default browser
fn url_command(url: &str) -> Command {
    #[cfg(target_os = "macos")]
    {
        let mut cmd = Command::new("open");
        cmd.arg(url);
        cmd
    }
    #[cfg(target_os = "windows")]
    {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]).arg(url);
        cmd
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(url);
        cmd
    }
}

fn spawn_detached(
    mut cmd: Command,
    target: &str,
) -> Result<JoinHandle<Option<ExitStatus>>, AutomationError> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| AutomationError::Launch {
            target: target.to_string(),
            source,
        })?;

    let target = target.to_string();
    Ok(thread::spawn(move || match child.wait() {
        Ok(status) => {
            if !status.success() {
                tracing::warn!(%target, %status, "launcher exited with failure");
            }
            Some(status)
        }
        Err(e) => {
            tracing::warn!(%target, error = %e, "failed to reap launched process");
            None
        }
    }))
}

impl Launcher for DesktopLauncher {
    fn launch(&mut self, token: &str) -> Result<(), AutomationError> {
        let target = self.resolve(token).to_string();
        tracing::info!(token, %target, "launching application");
        spawn_detached(app_command(&target), &target).map(|_| ())
    }

    fn open_url(&mut self, url: &str) -> Result<(), AutomationError> {
        tracing::info!(url, "opening url");
        spawn_detached(url_command(url), url).map(|_| ())
    }
}

/// Logs launches instead of spawning anything
#[derive(Debug, Default)]
pub struct DryRunLauncher;

impl Launcher for DryRunLauncher {
    fn launch(&mut self, token: &str) -> Result<(), AutomationError> {
        tracing::info!(token, "dry-run: launch");
        Ok(())
    }

    fn open_url(&mut self, url: &str) -> Result<(), AutomationError> {
        tracing::info!(url, "dry-run: open url");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_resolution() {
        let mut aliases = BTreeMap::new();
        aliases.insert("calculator".to_string(), "gnome-calculator".to_string());
        let launcher = DesktopLauncher::new(aliases);
        assert_eq!(launcher.resolve("calculator"), "gnome-calculator");
        assert_eq!(launcher.resolve("gimp"), "gimp");
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    #[test]
    fn test_linux_app_command_splits_arguments() {
        let cmd = app_command("code --new-window");
        assert_eq!(cmd.get_program(), "code");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, vec!["--new-window"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_launched_process_is_reaped() {
        let reaper = spawn_detached(Command::new("true"), "true").unwrap();
        let status = reaper.join().unwrap();
        assert!(status.is_some_and(|s| s.success()));
    }

    #[test]
    fn test_missing_binary_is_a_launch_error() {
        let err = spawn_detached(
            Command::new("nanba-definitely-not-a-real-binary"),
            "nanba-definitely-not-a-real-binary",
        )
        .unwrap_err();
        assert!(matches!(err, AutomationError::Launch { .. }));
    }
}
