//! Startup items registered under the `Run` keys.
//!
//! Items are addressed as `"<value name> (HKCU)"` or `"<value name> (HKLM)"`.
//! Whether an item launches is controlled by Explorer's `StartupApproved`
//! key, not by the `Run` entry itself, so toggling never deletes the
//! registration and can always be undone.

use std::collections::BTreeMap;

pub const RUN_KEY: &str = "Software\\Microsoft\\Windows\\CurrentVersion\\Run";
pub const APPROVED_KEY: &str =
    "Software\\Microsoft\\Windows\\CurrentVersion\\Explorer\\StartupApproved\\Run";

/// Items whose name contains one of these are disabled during optimization.
pub const STARTUP_TARGETS: &[&str] = &[
    "onedrive",
    "teams",
    "skype",
    "yourphone",
    "cortana",
    "xbox",
    "gamebar",
];

// StartupApproved flag bytes: 0x02 enabled, 0x03 disabled, rest is a timestamp
const ENABLED_FLAG: u8 = 0x02;
const DISABLED_FLAG: u8 = 0x03;
const APPROVED_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hive {
    CurrentUser,
    LocalMachine,
}

impl Hive {
    pub const ALL: [Hive; 2] = [Hive::CurrentUser, Hive::LocalMachine];

    pub fn suffix(self) -> &'static str {
        match self {
            Hive::CurrentUser => "HKCU",
            Hive::LocalMachine => "HKLM",
        }
    }
}

pub fn item_name(value_name: &str, hive: Hive) -> String {
    format!("{} ({})", value_name, hive.suffix())
}

pub fn split_item_name(item: &str) -> Option<(&str, Hive)> {
    Hive::ALL.into_iter().find_map(|hive| {
        item.strip_suffix(&format!(" ({})", hive.suffix()))
            .map(|value_name| (value_name, hive))
    })
}

pub fn approved_bytes(enabled: bool) -> Vec<u8> {
    let mut bytes = vec![0u8; APPROVED_LEN];
    bytes[0] = if enabled { ENABLED_FLAG } else { DISABLED_FLAG };
    bytes
}

/// Odd first byte means disabled; a missing value means enabled.
pub fn is_enabled_flag(bytes: &[u8]) -> bool {
    bytes.first().map_or(true, |b| b % 2 == 0)
}

pub fn is_startup_target(item: &str) -> bool {
    let lowered = item.to_lowercase();
    STARTUP_TARGETS.iter().any(|t| lowered.contains(t))
}

/// Enabled items from `items` that the optimizer switches off.
pub fn select_items_to_disable(items: &BTreeMap<String, bool>) -> Vec<String> {
    items
        .iter()
        .filter(|(name, enabled)| **enabled && is_startup_target(name))
        .map(|(name, _)| name.clone())
        .collect()
}

#[cfg(windows)]
mod registry {
    use std::collections::BTreeMap;

    use winreg::enums::*;
    use winreg::{RegKey, RegValue};

    use super::*;
    use crate::error::SessionError;

    fn root(hive: Hive) -> RegKey {
        match hive {
            Hive::CurrentUser => RegKey::predef(HKEY_CURRENT_USER),
            Hive::LocalMachine => RegKey::predef(HKEY_LOCAL_MACHINE),
        }
    }

    pub fn read_items() -> Result<BTreeMap<String, bool>, SessionError> {
        let mut items = BTreeMap::new();

        for hive in Hive::ALL {
            let run = match root(hive).open_subkey_with_flags(RUN_KEY, KEY_READ) {
                Ok(key) => key,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            let approved = root(hive).open_subkey_with_flags(APPROVED_KEY, KEY_READ).ok();

            for value in run.enum_values() {
                let (value_name, _) = value?;
                let enabled = approved
                    .as_ref()
                    .and_then(|key| key.get_raw_value(&value_name).ok())
                    .map_or(true, |raw| is_enabled_flag(&raw.bytes));
                items.insert(item_name(&value_name, hive), enabled);
            }
        }

        Ok(items)
    }

    pub fn set_enabled(item: &str, enabled: bool) -> Result<(), SessionError> {
        let (value_name, hive) = split_item_name(item).ok_or_else(|| {
            SessionError::NotFound(format!("'{}' is not a registry startup item", item))
        })?;

        let run = root(hive).open_subkey_with_flags(RUN_KEY, KEY_READ)?;
        if run.get_raw_value(value_name).is_err() {
            return Err(SessionError::NotFound(format!(
                "startup item '{}' is no longer registered",
                item
            )));
        }

        let (approved, _) = root(hive).create_subkey(APPROVED_KEY)?;
        approved.set_raw_value(
            value_name,
            &RegValue {
                bytes: approved_bytes(enabled),
                vtype: REG_BINARY,
            },
        )?;
        Ok(())
    }
}

#[cfg(windows)]
pub use registry::{read_items, set_enabled};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_names_round_trip_through_split() {
        let name = item_name("OneDrive", Hive::CurrentUser);
        assert_eq!(name, "OneDrive (HKCU)");
        assert_eq!(split_item_name(&name), Some(("OneDrive", Hive::CurrentUser)));
        assert_eq!(
            split_item_name("SecurityHealth (HKLM)"),
            Some(("SecurityHealth", Hive::LocalMachine))
        );
        assert_eq!(split_item_name("launcher.bat (Folder)"), None);
    }

    #[test]
    fn test_approved_flag_encoding() {
        assert!(is_enabled_flag(&approved_bytes(true)));
        assert!(!is_enabled_flag(&approved_bytes(false)));
        assert_eq!(approved_bytes(false).len(), 12);
        assert!(is_enabled_flag(&[]));
        assert!(is_enabled_flag(&[0x06, 0x00]));
        assert!(!is_enabled_flag(&[0x01]));
    }

    #[test]
    fn test_selects_only_enabled_targets() {
        let mut items = BTreeMap::new();
        items.insert("OneDrive (HKCU)".to_string(), true);
        items.insert("com.squirrel.Teams.Teams (HKCU)".to_string(), true);
        items.insert("Skype for Desktop (HKCU)".to_string(), false);
        items.insert("SecurityHealth (HKLM)".to_string(), true);
        items.insert("RtkAudUService (HKLM)".to_string(), true);

        assert_eq!(
            select_items_to_disable(&items),
            vec!["OneDrive (HKCU)", "com.squirrel.Teams.Teams (HKCU)"]
        );
    }
}
