//! The OS facilities a session reads and mutates, behind one trait so the
//! session logic runs unchanged against the live machine or an in-memory
//! stand-in.

use std::collections::BTreeMap;

use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::actions::network;
use crate::error::SessionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningProcess {
    pub pid: u32,
    pub name: String,
}

pub trait SystemControl {
    /// GUID of the active power scheme
    fn active_power_plan(&mut self) -> Result<String, SessionError>;
    fn set_active_power_plan(&mut self, guid: &str) -> Result<(), SessionError>;

    /// Every registered startup item with its enablement
    fn startup_items(&mut self) -> Result<BTreeMap<String, bool>, SessionError>;
    fn set_startup_enabled(&mut self, item: &str, enabled: bool) -> Result<(), SessionError>;

    fn running_processes(&mut self) -> Vec<RunningProcess>;
    fn terminate(&mut self, pid: u32) -> Result<(), SessionError>;

    fn flush_dns(&mut self) -> Result<(), SessionError>;
}

pub struct HostSystem {
    system: System,
}

impl HostSystem {
    pub fn new() -> Self {
        Self { system: System::new() }
    }
}

impl SystemControl for HostSystem {
    #[cfg(windows)]
    fn active_power_plan(&mut self) -> Result<String, SessionError> {
        crate::actions::power::query_active()
    }

    #[cfg(not(windows))]
    fn active_power_plan(&mut self) -> Result<String, SessionError> {
        Err(unsupported("Power plans"))
    }

    #[cfg(windows)]
    fn set_active_power_plan(&mut self, guid: &str) -> Result<(), SessionError> {
        crate::actions::power::set_active(guid)
    }

    #[cfg(not(windows))]
    fn set_active_power_plan(&mut self, _guid: &str) -> Result<(), SessionError> {
        Err(unsupported("Power plans"))
    }

    #[cfg(windows)]
    fn startup_items(&mut self) -> Result<BTreeMap<String, bool>, SessionError> {
        crate::actions::startup::read_items()
    }

    #[cfg(not(windows))]
    fn startup_items(&mut self) -> Result<BTreeMap<String, bool>, SessionError> {
        Err(unsupported("Startup items"))
    }

    #[cfg(windows)]
    fn set_startup_enabled(&mut self, item: &str, enabled: bool) -> Result<(), SessionError> {
        crate::actions::startup::set_enabled(item, enabled)
    }

    #[cfg(not(windows))]
    fn set_startup_enabled(&mut self, _item: &str, _enabled: bool) -> Result<(), SessionError> {
        Err(unsupported("Startup items"))
    }

    fn running_processes(&mut self) -> Vec<RunningProcess> {
        self.system.refresh_processes(ProcessesToUpdate::All, true);
        self.system
            .processes()
            .iter()
            .map(|(pid, p)| RunningProcess {
                pid: pid.as_u32(),
                name: p.name().to_string_lossy().into_owned(),
            })
            .collect()
    }

    fn terminate(&mut self, pid: u32) -> Result<(), SessionError> {
        let target = Pid::from_u32(pid);
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[target]), true);

        // Exited between enumeration and now
        let Some(process) = self.system.process(target) else {
            return Ok(());
        };

        if process.kill() {
            Ok(())
        } else {
            Err(SessionError::OperationFailed(format!(
                "the OS refused to terminate pid {}",
                pid
            )))
        }
    }

    fn flush_dns(&mut self) -> Result<(), SessionError> {
        network::flush_dns()
    }
}

#[cfg(not(windows))]
fn unsupported(what: &str) -> SessionError {
    SessionError::OperationFailed(format!("{} are only supported on Windows", what))
}
