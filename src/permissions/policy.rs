use crate::permissions::decision::PermissionDecision;

#[derive(Debug, Clone, Copy)]
pub struct ElevationContext {
    pub elevated: bool,
    pub force_admin: bool,
    pub assume_yes: bool,
    pub interactive: bool,
}

pub fn evaluate(ctx: &ElevationContext) -> PermissionDecision {
    if ctx.elevated {
        return PermissionDecision::Allow;
    }

    // Explicit consent on the command line
    if ctx.force_admin || ctx.assume_yes {
        return PermissionDecision::Relaunch;
    }

    if ctx.interactive {
        PermissionDecision::RequireConfirmation {
            reason: "GPTboost requires administrator privileges to change the power plan and startup items."
                .into(),
        }
    } else {
        PermissionDecision::Deny {
            reason: "administrator privileges are required and there is no console to confirm \
                     elevation; rerun with --admin"
                .into(),
        }
    }
}
