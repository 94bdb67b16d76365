// Individual optimization steps and the OS calls behind them
pub mod cache;
pub mod network;
pub mod power;
pub mod processes;
pub mod safety;
pub mod startup;

pub use cache::Browser;

#[cfg(windows)]
use crate::error::SessionError;

/// Run a console tool and return its trimmed stdout. A non-zero exit status
/// becomes `OperationFailed` carrying the tool's own message.
#[cfg(windows)]
pub(crate) fn run_command(program: &str, args: &[&str]) -> Result<String, SessionError> {
    let output = std::process::Command::new(program)
        .args(args)
        .output()
        .map_err(|e| SessionError::OperationFailed(format!("Failed to run {}: {}", program, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let message = if stderr.is_empty() { stdout } else { stderr };
        let lowered = message.to_lowercase();
        if lowered.contains("access is denied") || lowered.contains("requires elevation") {
            return Err(SessionError::PermissionDenied(format!("{}: {}", program, message)));
        }
        return Err(SessionError::OperationFailed(format!(
            "{} exited with {}: {}",
            program, output.status, message
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
