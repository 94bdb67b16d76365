//! Runtime options resolved from the command line, environment and
//! well-known directories.

use std::path::PathBuf;
use std::time::Duration;

use crate::actions::Browser;
use crate::cli::Args;

const APP_DIR: &str = "GPTboost";
const BACKUP_FILE_NAME: &str = "backup.json";
const FALLBACK_BACKUP_FILE: &str = "gptboost_backup.json";
const LOG_FILE_NAME: &str = "gptboost.log";

pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserSelection {
    /// Read the default browser from the registry
    Detect,
    Skip,
    Only(Browser),
}

#[derive(Debug, Clone)]
pub struct Options {
    pub browser: BrowserSelection,
    pub monitor_duration: Duration,
    pub sample_interval: Duration,
    pub undo: bool,
    pub force_admin: bool,
    pub assume_yes: bool,
    pub backup_file: PathBuf,
    pub log_file: PathBuf,
    /// Local application data dir; browser caches live below it
    pub cache_root: Option<PathBuf>,
}

impl Options {
    pub fn from_args(args: &Args) -> Self {
        let browser = match args.browser {
            None => BrowserSelection::Detect,
            Some(arg) => match arg.browser() {
                Some(browser) => BrowserSelection::Only(browser),
                None => BrowserSelection::Skip,
            },
        };

        Self {
            browser,
            monitor_duration: Duration::from_secs(args.monitor_duration),
            sample_interval: SAMPLE_INTERVAL,
            undo: args.undo,
            force_admin: args.admin,
            assume_yes: args.yes,
            backup_file: args.backup_file.clone().unwrap_or_else(default_backup_file),
            log_file: args.log_file.clone().unwrap_or_else(default_log_file),
            cache_root: dirs::data_local_dir(),
        }
    }
}

pub fn app_data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join(APP_DIR))
}

pub fn default_backup_file() -> PathBuf {
    app_data_dir()
        .map(|dir| dir.join(BACKUP_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(FALLBACK_BACKUP_FILE))
}

pub fn default_log_file() -> PathBuf {
    app_data_dir()
        .map(|dir| dir.join(LOG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(LOG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_browser_selection() {
        let detect = Options::from_args(&Args::try_parse_from(["gptboost"]).unwrap());
        assert_eq!(detect.browser, BrowserSelection::Detect);

        let skip = Options::from_args(&Args::try_parse_from(["gptboost", "--browser=none"]).unwrap());
        assert_eq!(skip.browser, BrowserSelection::Skip);

        let edge = Options::from_args(&Args::try_parse_from(["gptboost", "--browser=edge"]).unwrap());
        assert_eq!(edge.browser, BrowserSelection::Only(Browser::Edge));
    }

    #[test]
    fn test_explicit_paths_win() {
        let args = Args::try_parse_from([
            "gptboost",
            "--backup-file=/tmp/b.json",
            "--log-file=/tmp/b.log",
            "--monitor-duration=7",
        ])
        .unwrap();
        let options = Options::from_args(&args);
        assert_eq!(options.backup_file, PathBuf::from("/tmp/b.json"));
        assert_eq!(options.log_file, PathBuf::from("/tmp/b.log"));
        assert_eq!(options.monitor_duration, Duration::from_secs(7));
    }

    #[test]
    fn test_default_backup_file_name() {
        let path = default_backup_file();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name == BACKUP_FILE_NAME || name == FALLBACK_BACKUP_FILE);
    }
}
