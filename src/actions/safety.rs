use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyLevel {
    Safe,    // Inside the allowed root
    Blocked, // Never deleted
}

/// Guards recursive deletions: only paths below the allowed root (the user's
/// local application data) may be removed, and never a protected OS path.
pub struct SafetyValidator {
    allowed_root: PathBuf,
    protected_paths: Vec<PathBuf>,
}

impl SafetyValidator {
    pub fn new(allowed_root: &Path) -> Self {
        Self {
            allowed_root: normalize(allowed_root),
            protected_paths: Self::get_protected_paths()
                .iter()
                .map(|p| normalize(p))
                .collect(),
        }
    }

    /// Get protected paths based on OS
    fn get_protected_paths() -> Vec<PathBuf> {
        if cfg!(windows) {
            vec![
                PathBuf::from("C:\\Windows"),
                PathBuf::from("C:\\Program Files"),
                PathBuf::from("C:\\Program Files (x86)"),
                PathBuf::from("C:\\ProgramData"),
            ]
        } else {
            vec![
                PathBuf::from("/bin"),
                PathBuf::from("/sbin"),
                PathBuf::from("/usr"),
                PathBuf::from("/etc"),
                PathBuf::from("/boot"),
                PathBuf::from("/sys"),
                PathBuf::from("/proc"),
                PathBuf::from("/lib"),
                PathBuf::from("/lib64"),
            ]
        }
    }

    pub fn check_path(&self, path: &Path) -> SafetyLevel {
        let canonical = match path.canonicalize() {
            Ok(p) => p,
            Err(_) => return SafetyLevel::Blocked,
        };

        if self.protected_paths.iter().any(|p| canonical.starts_with(p)) {
            return SafetyLevel::Blocked;
        }

        // The root itself is never a cache directory
        if canonical == self.allowed_root || !canonical.starts_with(&self.allowed_root) {
            return SafetyLevel::Blocked;
        }

        SafetyLevel::Safe
    }
}

// canonicalize() yields verbatim `\\?\` paths on Windows; both sides of a
// starts_with comparison must go through it
fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
