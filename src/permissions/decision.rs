#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionDecision {
    /// Already elevated
    Allow,
    /// Restart elevated without asking
    Relaunch,
    RequireConfirmation { reason: String },
    Deny { reason: String },
}
