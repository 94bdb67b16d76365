use log::{info, warn};

use crate::platform::SystemControl;

/// Background agents that compete with the browser for CPU and memory.
pub const PROCESS_TARGETS: &[&str] = &[
    "OneDrive.exe",
    "SearchApp.exe",
    "Cortana.exe",
    "Teams.exe",
    "SkypeApp.exe",
    "YourPhone.exe",
    "GameBarPresenceWriter.exe",
    "Xbox.exe",
];

pub const PROTECTED_PROCESSES: &[&str] = &[
    "csrss.exe",
    "wininit.exe",
    "lsass.exe",
    "services.exe",
    "smss.exe",
    "winlogon.exe",
];

pub fn is_protected(name: &str) -> bool {
    PROTECTED_PROCESSES
        .iter()
        .any(|p| p.eq_ignore_ascii_case(name))
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CloseSummary {
    pub closed: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// Terminate every running process whose name is in `targets`. Targets that
/// are not running are skipped silently.
pub fn close_background_processes(system: &mut dyn SystemControl, targets: &[&str]) -> CloseSummary {
    info!("Closing non-essential background processes...");
    let mut summary = CloseSummary::default();

    for process in system.running_processes() {
        if !targets.iter().any(|t| t.eq_ignore_ascii_case(&process.name)) {
            continue;
        }
        if is_protected(&process.name) {
            warn!("Refusing to close protected system process {}", process.name);
            continue;
        }

        match system.terminate(process.pid) {
            Ok(()) => {
                info!("Closed process: {} (pid {})", process.name, process.pid);
                summary.closed.push(process.name);
            }
            Err(e) => {
                warn!("Could not close {} (pid {}): {}", process.name, process.pid, e);
                summary.failed.push((process.name, e.to_string()));
            }
        }
    }

    if summary.closed.is_empty() && summary.failed.is_empty() {
        info!("No target processes found running");
    } else {
        info!("Successfully closed {} processes", summary.closed.len());
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::testing::FakeSystem;

    #[test]
    fn test_closes_matching_processes_case_insensitively() {
        let mut system = FakeSystem::new()
            .with_process(10, "onedrive.exe")
            .with_process(11, "Teams.exe")
            .with_process(12, "explorer.exe");

        let summary = close_background_processes(&mut system, PROCESS_TARGETS);

        assert_eq!(summary.closed, vec!["onedrive.exe", "Teams.exe"]);
        assert!(summary.failed.is_empty());
        assert_eq!(system.process_names(), vec!["explorer.exe"]);
    }

    #[test]
    fn test_absent_targets_are_not_errors() {
        let mut system = FakeSystem::new().with_process(1, "explorer.exe");
        let summary = close_background_processes(&mut system, &["NoSuchAgent.exe"]);
        assert_eq!(summary, CloseSummary::default());
    }

    #[test]
    fn test_protected_processes_survive_even_if_targeted() {
        let mut system = FakeSystem::new().with_process(600, "lsass.exe");
        let summary = close_background_processes(&mut system, &["LSASS.EXE"]);
        assert!(summary.closed.is_empty());
        assert_eq!(system.process_names(), vec!["lsass.exe"]);
    }

    #[test]
    fn test_termination_failure_is_recorded_and_loop_continues() {
        let mut system = FakeSystem::new()
            .with_process(20, "Xbox.exe")
            .with_process(21, "YourPhone.exe")
            .with_unkillable(20);

        let summary = close_background_processes(&mut system, PROCESS_TARGETS);

        assert_eq!(summary.closed, vec!["YourPhone.exe"]);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "Xbox.exe");
    }
}
