pub mod decision;
pub mod elevation;
pub mod policy;

pub use decision::PermissionDecision;
pub use elevation::{ConsoleElevation, ElevationGate};
