use crate::error::SessionError;

#[cfg(target_os = "windows")]
pub fn flush_dns() -> Result<(), SessionError> {
    super::run_command("ipconfig", &["/flushdns"]).map(|_| ())
}

#[cfg(not(target_os = "windows"))]
pub fn flush_dns() -> Result<(), SessionError> {
    Err(SessionError::OperationFailed(
        "DNS cache flushing is only supported on Windows".into(),
    ))
}
