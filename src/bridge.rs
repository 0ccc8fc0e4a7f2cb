//! Privileged command transport.
//!
//! Every device mutation goes through an external bridge (by default
//! `adb shell su -c`). The bridge is line-oriented and reports success or
//! failure only; no structured return value is assumed.

use async_trait::async_trait;
use tokio::process::Command;

/// A single privileged command invocation. Each call is independently
/// failable; callers decide what a failure means.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, cmd: &str) -> bool;
}

/// Runs commands by appending them as one argument to a configured bridge
/// command line, e.g. `adb shell su -c "<cmd>"`.
pub struct ShellBridge {
    program: String,
    args: Vec<String>,
}

impl ShellBridge {
    pub fn from_cmdline(cmdline: &str) -> Self {
        let mut parts = cmdline.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_else(|| "adb".into());
        Self {
            program,
            args: parts.collect(),
        }
    }

    /// Run a command and capture its stdout. `None` on spawn failure or
    /// non-zero exit.
    pub async fn output(&self, cmd: &str) -> Option<String> {
        let out = Command::new(&self.program)
            .args(&self.args)
            .arg(cmd)
            .output()
            .await
            .ok()?;
        if !out.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

#[async_trait]
impl CommandRunner for ShellBridge {
    async fn run(&self, cmd: &str) -> bool {
        match Command::new(&self.program)
            .args(&self.args)
            .arg(cmd)
            .status()
            .await
        {
            Ok(status) => status.success(),
            Err(e) => {
                tracing::warn!("bridge spawn failed for `{cmd}`: {e}");
                false
            }
        }
    }
}

/// Ask the device for its SDK level through the bridge. Unparseable or
/// missing output maps to 0, which the resolver treats as unknown.
pub async fn detect_sdk(bridge: &ShellBridge) -> u32 {
    parse_sdk(bridge.output("getprop ro.build.version.sdk").await)
}

fn parse_sdk(raw: Option<String>) -> u32 {
    raw.and_then(|s| s.trim().parse().ok()).unwrap_or(0)
}
