use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, trace, warn};

use crate::config::Config;
use crate::ipmi::BmcTarget;

const BMC_PROCESS_PATTERN: &str = "ravellobmc.py";
const SECRET_FLAGS: [&str; 2] = ["--api-password=", "--ipmi-password"];

/// Error from a command that could not be executed.
#[derive(Debug, thiserror::Error)]
#[error("command failed: {command}\n{detail}")]
pub struct CommandError {
    pub command: String,
    pub detail: String,
}

/// Side effects on the local machine.
pub trait Host {
    /// Kill every BMC emulator left over from a previous run.
    async fn kill_existing_bmcs(&mut self) -> Result<(), CommandError>;

    /// Add the IPMI address to the local interface.
    async fn add_address(&mut self, address: &str, interface: &str) -> Result<(), CommandError>;

    /// Start a detached BMC emulator for `target`.
    async fn spawn_bmc(&mut self, target: &BmcTarget, token: &str) -> Result<(), CommandError>;
}

/// Runs the real system binaries.
pub struct SystemHost {
    pkill_path: OsString,
    ip_path: OsString,
    bmc_path: OsString,
    bmc_debug: bool,
}

impl SystemHost {
    pub fn new(config: &Config) -> Self {
        SystemHost {
            pkill_path: config.pkill_path.clone().into_os_string(),
            ip_path: config.ip_path.clone().into_os_string(),
            bmc_path: config.bmc_path.clone().into_os_string(),
            bmc_debug: config.bmc_debug,
        }
    }

    /// Run a command to completion; a non-zero exit is returned as stderr, not as an error.
    async fn status(program: &OsString, args: &[String]) -> Result<Option<String>, CommandError> {
        let cmd_display = format_command_display(program, args);
        trace!(command = %cmd_display, "exec");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| CommandError {
                command: cmd_display,
                detail: e.to_string(),
            })?;

        if output.status.success() {
            Ok(None)
        } else {
            Ok(Some(String::from_utf8_lossy(&output.stderr).trim().to_string()))
        }
    }
}

impl Host for SystemHost {
    async fn kill_existing_bmcs(&mut self) -> Result<(), CommandError> {
        let args = ["-f", "-9", BMC_PROCESS_PATTERN].map(String::from);
        if let Some(stderr) = Self::status(&self.pkill_path, &args).await? {
            // pkill exits 1 when nothing matched
            debug!(stderr = %stderr, "no BMC emulator killed");
        }
        Ok(())
    }

    async fn add_address(&mut self, address: &str, interface: &str) -> Result<(), CommandError> {
        let args = ["address", "add", address, "dev", interface].map(String::from);
        if let Some(stderr) = Self::status(&self.ip_path, &args).await? {
            warn!(address, interface, stderr = %stderr, "failed to add IPMI address");
        }
        Ok(())
    }

    async fn spawn_bmc(&mut self, target: &BmcTarget, token: &str) -> Result<(), CommandError> {
        let args = bmc_args(target, token, self.bmc_debug);
        let cmd_display = format_command_display(&self.bmc_path, &args);
        debug!(command = %cmd_display, "spawning BMC emulator");

        // the child is dropped without waiting; it outlives this process
        let child = Command::new(&self.bmc_path)
            .args(&args)
            .stdin(Stdio::null())
            .process_group(0)
            .spawn()
            .map_err(|e| CommandError {
                command: cmd_display,
                detail: e.to_string(),
            })?;

        info!(vm = %target.vm_name, pid = ?child.id(), "BMC emulator started");
        Ok(())
    }
}

/// Arguments for one `ravellobmc.py` invocation.
pub fn bmc_args(target: &BmcTarget, token: &str, debug: bool) -> Vec<String> {
    let mut args = Vec::with_capacity(9);
    if debug {
        args.push("--debug".to_string());
    }
    args.extend([
        format!("--app-name={}", target.app_name),
        format!("--vm-name={}", target.vm_name),
        "--aspect=deployment".to_string(),
        format!("--address={}", target.address),
        "--ipmi-password".to_string(),
        target.password.clone(),
        "--api-username=token".to_string(),
        format!("--api-password={token}"),
    ]);
    args
}

/// Human-readable command line with secrets masked.
fn format_command_display(program: impl AsRef<Path>, args: &[String]) -> String {
    let mut parts = Vec::with_capacity(args.len() + 1);
    parts.push(program.as_ref().display().to_string());

    let mut mask_next = false;
    for arg in args {
        if mask_next {
            parts.push("***".to_string());
            mask_next = false;
            continue;
        }
        match SECRET_FLAGS.iter().find(|flag| arg.starts_with(*flag)) {
            Some(flag) if flag.ends_with('=') => parts.push(format!("{flag}***")),
            Some(_) => {
                parts.push(arg.clone());
                mask_next = true;
            }
            None => parts.push(arg.clone()),
        }
    }
    parts.join(" ")
}
