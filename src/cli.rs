use std::env;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};

use crate::actions::Browser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "gptboost",
    version,
    about = "Free up a Windows machine for a smoother ChatGPT session",
    long_about = "Closes non-essential background processes, clears the browser cache, \
                  switches to the High Performance power plan, flushes the DNS cache and \
                  disables chatty startup items. Prior state is saved so --undo can restore it."
)]
pub struct Args {
    /// Browser whose cache is cleared (detected from the registry when omitted)
    #[arg(long, value_enum)]
    pub browser: Option<BrowserArg>,

    /// Resource monitoring duration in seconds
    #[arg(long, default_value_t = 30)]
    pub monitor_duration: u64,

    /// Revert the previous optimization
    #[arg(long)]
    pub undo: bool,

    /// Relaunch as administrator without asking
    #[arg(long)]
    pub admin: bool,

    /// Answer yes to the elevation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Where the pre-optimization snapshot is stored
    #[arg(long, env = "GPTBOOST_BACKUP_FILE")]
    pub backup_file: Option<PathBuf>,

    /// Append log output to this file
    #[arg(long, env = "GPTBOOST_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Wait for Enter before exiting; set on the elevated copy, whose
    /// console closes with it
    #[arg(long, hide = true)]
    pub pause_on_exit: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserArg {
    Edge,
    Chrome,
    Firefox,
    Librewolf,
    None,
}

impl BrowserArg {
    pub fn browser(self) -> Option<Browser> {
        match self {
            BrowserArg::Edge => Some(Browser::Edge),
            BrowserArg::Chrome => Some(Browser::Chrome),
            BrowserArg::Firefox => Some(Browser::Firefox),
            BrowserArg::Librewolf => Some(Browser::LibreWolf),
            BrowserArg::None => None,
        }
    }
}

/// The elevated copy starts in the system directory, so relative paths are
/// resolved against ours before they are handed over.
fn forwarded_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    env::current_dir()
        .map(|dir| dir.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Arguments forwarded to the elevated copy of the process. `--admin` is
/// dropped so the child never loops on elevation.
pub fn relaunch_args(args: &Args) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(browser) = args.browser {
        if let Some(value) = browser.to_possible_value() {
            out.push(format!("--browser={}", value.get_name()));
        }
    }
    out.push(format!("--monitor-duration={}", args.monitor_duration));
    if args.undo {
        out.push("--undo".to_string());
    }
    if let Some(path) = &args.backup_file {
        out.push(format!("--backup-file={}", forwarded_path(path).display()));
    }
    if let Some(path) = &args.log_file {
        out.push(format!("--log-file={}", forwarded_path(path).display()));
    }
    out.push("--pause-on-exit".to_string());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["gptboost"]).unwrap();
        assert_eq!(args.browser, None);
        assert_eq!(args.monitor_duration, 30);
        assert!(!args.undo);
        assert!(!args.admin);
    }

    #[test]
    fn test_full_flag_set() {
        let args = Args::try_parse_from([
            "gptboost",
            "--browser=firefox",
            "--monitor-duration=0",
            "--undo",
            "--admin",
        ])
        .unwrap();
        assert_eq!(args.browser, Some(BrowserArg::Firefox));
        assert_eq!(args.browser.unwrap().browser(), Some(Browser::Firefox));
        assert_eq!(args.monitor_duration, 0);
        assert!(args.undo);
        assert!(args.admin);
    }

    #[test]
    fn test_browser_none_skips_cache() {
        let args = Args::try_parse_from(["gptboost", "--browser", "none"]).unwrap();
        assert_eq!(args.browser.unwrap().browser(), None);
    }

    #[test]
    fn test_unknown_browser_rejected() {
        assert!(Args::try_parse_from(["gptboost", "--browser=safari"]).is_err());
    }

    #[test]
    fn test_relaunch_args_drop_admin() {
        let args = Args::try_parse_from([
            "gptboost",
            "--browser=chrome",
            "--monitor-duration=5",
            "--admin",
            "--undo",
        ])
        .unwrap();
        let forwarded = relaunch_args(&args);
        assert_eq!(
            forwarded,
            vec!["--browser=chrome", "--monitor-duration=5", "--undo", "--pause-on-exit"]
        );
    }

    #[test]
    fn test_relaunch_args_make_paths_absolute() {
        let args = Args::try_parse_from([
            "gptboost",
            "--backup-file=mybackup.json",
            "--log-file=logs/run.log",
        ])
        .unwrap();
        let cwd = env::current_dir().unwrap();
        let forwarded = relaunch_args(&args);

        let backup = format!("--backup-file={}", cwd.join("mybackup.json").display());
        let log = format!("--log-file={}", cwd.join("logs/run.log").display());
        assert!(forwarded.contains(&backup), "{:?}", forwarded);
        assert!(forwarded.contains(&log), "{:?}", forwarded);
        assert!(forwarded.iter().all(|a| !a.ends_with("=mybackup.json")));
    }

    #[test]
    fn test_relaunch_args_keep_absolute_paths() {
        let absolute = env::temp_dir().join("gptboost-backup.json");
        let args = Args::try_parse_from([
            "gptboost".to_string(),
            format!("--backup-file={}", absolute.display()),
        ])
        .unwrap();
        assert!(relaunch_args(&args).contains(&format!("--backup-file={}", absolute.display())));
    }
}
