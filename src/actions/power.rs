//! Power plan identifiers and the `powercfg` calls that read and switch them.

pub const HIGH_PERFORMANCE: &str = "8c5e7fda-e8bf-4a96-9a85-a6e23a8c635c";
pub const BALANCED: &str = "381b4222-f694-41f0-9685-ff5bb260df2e";
pub const POWER_SAVER: &str = "a1841308-3541-4fab-bc81-f71556f20b4a";

/// Human name for the built-in schemes.
pub fn plan_label(guid: &str) -> &'static str {
    match guid.to_ascii_lowercase().as_str() {
        HIGH_PERFORMANCE => "High Performance",
        BALANCED => "Balanced",
        POWER_SAVER => "Power saver",
        _ => "custom plan",
    }
}

/// `8-4-4-4-12` hex groups.
pub fn is_guid(token: &str) -> bool {
    let groups: Vec<&str> = token.split('-').collect();
    let lengths = [8, 4, 4, 4, 12];
    groups.len() == lengths.len()
        && groups
            .iter()
            .zip(lengths)
            .all(|(g, len)| g.len() == len && g.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Extract the scheme GUID from `powercfg /getactivescheme`. The label text
/// around it is localized, so only the GUID token is relied upon.
pub fn parse_active_scheme(output: &str) -> Option<String> {
    output
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| c == '(' || c == ')' || c == ':' || c == ','))
        .find(|t| is_guid(t))
        .map(|t| t.to_ascii_lowercase())
}

#[cfg(windows)]
pub fn query_active() -> Result<String, crate::error::SessionError> {
    let output = super::run_command("powercfg", &["/getactivescheme"])?;
    parse_active_scheme(&output).ok_or_else(|| {
        crate::error::SessionError::OperationFailed(format!(
            "Unrecognised powercfg output: {}",
            output
        ))
    })
}

#[cfg(windows)]
pub fn set_active(guid: &str) -> Result<(), crate::error::SessionError> {
    if !is_guid(guid) {
        return Err(crate::error::SessionError::OperationFailed(format!(
            "'{}' is not a power scheme GUID",
            guid
        )));
    }
    super::run_command("powercfg", &["/setactive", guid]).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_english_output() {
        let out = "Power Scheme GUID: 381b4222-f694-41f0-9685-ff5bb260df2e  (Balanced)";
        assert_eq!(parse_active_scheme(out).as_deref(), Some(BALANCED));
    }

    #[test]
    fn test_parse_localized_output() {
        let out = "GUID du mode de gestion de l'alimentation : 8C5E7FDA-E8BF-4A96-9A85-A6E23A8C635C  (Performances élevées)";
        assert_eq!(parse_active_scheme(out).as_deref(), Some(HIGH_PERFORMANCE));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_active_scheme("Access is denied."), None);
        assert_eq!(parse_active_scheme(""), None);
    }

    #[test]
    fn test_guid_shape() {
        assert!(is_guid(HIGH_PERFORMANCE));
        assert!(!is_guid("8c5e7fda-e8bf-4a96-9a85"));
        assert!(!is_guid("zzzzzzzz-e8bf-4a96-9a85-a6e23a8c635c"));
    }

    #[test]
    fn test_labels() {
        assert_eq!(plan_label(HIGH_PERFORMANCE), "High Performance");
        assert_eq!(plan_label("381B4222-F694-41F0-9685-FF5BB260DF2E"), "Balanced");
        assert_eq!(plan_label("00000000-0000-0000-0000-000000000000"), "custom plan");
    }
}
