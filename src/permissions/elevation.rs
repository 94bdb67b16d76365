use std::io::{self, BufRead, IsTerminal, Write};

use log::info;

use crate::error::SessionError;

pub trait ElevationGate {
    fn is_elevated(&self) -> bool;
    /// Whether a person can answer a prompt
    fn is_interactive(&self) -> bool;
    fn confirm(&mut self, reason: &str) -> bool;
    /// Run an elevated copy of this program to completion and return its
    /// exit code. The caller is expected to exit with it.
    fn relaunch(&mut self) -> Result<i32, SessionError>;
}

pub struct ConsoleElevation {
    args: Vec<String>,
}

impl ConsoleElevation {
    pub fn new(args: Vec<String>) -> Self {
        Self { args }
    }
}

impl ElevationGate for ConsoleElevation {
    fn is_elevated(&self) -> bool {
        is_elevated()
    }

    fn is_interactive(&self) -> bool {
        io::stdin().is_terminal()
    }

    fn confirm(&mut self, reason: &str) -> bool {
        println!("{}", reason);
        print!("Restart as administrator? (y/n): ");
        let _ = io::stdout().flush();

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }

    #[cfg(windows)]
    fn relaunch(&mut self) -> Result<i32, SessionError> {
        info!("Requesting administrator privileges...");
        let exe = std::env::current_exe()?;
        let script = relaunch_script(&exe.to_string_lossy(), &self.args);

        let output = std::process::Command::new("powershell")
            .args(["-NoProfile", "-Command", &script])
            .output()
            .map_err(|e| SessionError::OperationFailed(format!("Failed to start powershell: {}", e)))?;

        let code = elevated_exit_code(output.status.code())?;
        info!("Elevated GPTboost finished with exit code {}", code);
        Ok(code)
    }

    #[cfg(not(windows))]
    fn relaunch(&mut self) -> Result<i32, SessionError> {
        info!("Requesting administrator privileges...");
        Err(SessionError::PermissionDenied(format!(
            "self-elevation is only supported on Windows (arguments: {})",
            command_line(&self.args)
        )))
    }
}

#[cfg(windows)]
pub fn is_elevated() -> bool {
    use windows_sys::Win32::Foundation::{CloseHandle, HANDLE};
    use windows_sys::Win32::Security::{GetTokenInformation, TokenElevation, TOKEN_ELEVATION, TOKEN_QUERY};
    use windows_sys::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

    unsafe {
        let mut token: HANDLE = 0;
        if OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token) == 0 {
            return false;
        }

        let mut elevation = TOKEN_ELEVATION { TokenIsElevated: 0 };
        let mut returned = 0u32;
        let ok = GetTokenInformation(
            token,
            TokenElevation,
            &mut elevation as *mut TOKEN_ELEVATION as *mut core::ffi::c_void,
            std::mem::size_of::<TOKEN_ELEVATION>() as u32,
            &mut returned,
        );
        CloseHandle(token);

        ok != 0 && elevation.TokenIsElevated != 0
    }
}

#[cfg(not(windows))]
pub fn is_elevated() -> bool {
    false
}

/// Join arguments the way the Windows CRT splits them back apart.
pub fn command_line(args: &[String]) -> String {
    args.iter()
        .map(|a| {
            if a.is_empty() || a.contains(' ') || a.contains('\t') {
                format!("\"{}\"", a.replace('"', "\\\""))
            } else {
                a.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Single-quoted PowerShell string literal.
fn ps_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// `ERROR_CANCELLED`; the script exits with it when `Start-Process` fails,
/// which is what a dismissed UAC prompt looks like.
pub const ELEVATION_REFUSED: i32 = 1223;

/// PowerShell that starts the elevated copy, waits for it and exits with its
/// exit code.
#[cfg_attr(not(windows), allow(dead_code))]
pub fn relaunch_script(exe: &str, args: &[String]) -> String {
    let mut start = format!("Start-Process -FilePath {} -Verb RunAs -Wait -PassThru", ps_literal(exe));
    if !args.is_empty() {
        start.push_str(" -ArgumentList ");
        start.push_str(&ps_literal(&command_line(args)));
    }
    format!(
        "try {{ $p = {} -ErrorAction Stop }} catch {{ exit {} }}; exit $p.ExitCode",
        start, ELEVATION_REFUSED
    )
}

/// Map the status of the relaunch script to the elevated copy's exit code.
#[cfg_attr(not(windows), allow(dead_code))]
pub fn elevated_exit_code(status: Option<i32>) -> Result<i32, SessionError> {
    match status {
        Some(ELEVATION_REFUSED) => Err(SessionError::PermissionDenied(
            "elevation was refused at the UAC prompt".into(),
        )),
        Some(code) => Ok(code),
        None => Err(SessionError::OperationFailed(
            "elevated GPTboost ended without an exit code".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_quotes_spaces() {
        let args = vec![
            "--browser=edge".to_string(),
            "--backup-file=C:\\Users\\Jo Doe\\b.json".to_string(),
        ];
        assert_eq!(
            command_line(&args),
            "--browser=edge \"--backup-file=C:\\Users\\Jo Doe\\b.json\""
        );
    }

    #[test]
    fn test_relaunch_script_escapes_single_quotes() {
        let script = relaunch_script("C:\\Tools\\O'Brien\\gptboost.exe", &["--undo".to_string()]);
        assert_eq!(
            script,
            "try { $p = Start-Process -FilePath 'C:\\Tools\\O''Brien\\gptboost.exe' -Verb RunAs -Wait -PassThru \
             -ArgumentList '--undo' -ErrorAction Stop } catch { exit 1223 }; exit $p.ExitCode"
        );
    }

    #[test]
    fn test_relaunch_script_without_args() {
        assert_eq!(
            relaunch_script("gptboost.exe", &[]),
            "try { $p = Start-Process -FilePath 'gptboost.exe' -Verb RunAs -Wait -PassThru -ErrorAction Stop } \
             catch { exit 1223 }; exit $p.ExitCode"
        );
    }

    #[test]
    fn test_elevated_exit_code_is_passed_through() {
        assert_eq!(elevated_exit_code(Some(0)).unwrap(), 0);
        assert_eq!(elevated_exit_code(Some(3)).unwrap(), 3);
        assert!(elevated_exit_code(Some(ELEVATION_REFUSED)).unwrap_err().is_permission_denied());
        assert!(elevated_exit_code(None).is_err());
    }
}
