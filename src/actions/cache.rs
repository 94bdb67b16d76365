use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use super::safety::{SafetyLevel, SafetyValidator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Browser {
    Edge,
    Chrome,
    Firefox,
    LibreWolf,
}

impl Browser {
    pub fn name(self) -> &'static str {
        match self {
            Browser::Edge => "edge",
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
            Browser::LibreWolf => "librewolf",
        }
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLayout {
    /// The path itself is the cache directory
    Direct,
    /// The path holds one directory per profile, each with a `cache2` inside
    Profiles,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheTarget {
    pub path: PathBuf,
    pub layout: CacheLayout,
}

impl CacheTarget {
    fn direct(path: PathBuf) -> Self {
        Self { path, layout: CacheLayout::Direct }
    }

    fn profiles(path: PathBuf) -> Self {
        Self { path, layout: CacheLayout::Profiles }
    }
}

/// Cache locations for `browser` below the local application data dir.
pub fn cache_targets(browser: Browser, local_data: &Path) -> Vec<CacheTarget> {
    match browser {
        Browser::Chrome => {
            let profile = local_data.join("Google").join("Chrome").join("User Data").join("Default");
            vec![
                CacheTarget::direct(profile.join("Cache")),
                CacheTarget::direct(profile.join("Code Cache")),
            ]
        }
        Browser::Edge => {
            let profile = local_data.join("Microsoft").join("Edge").join("User Data").join("Default");
            vec![
                CacheTarget::direct(profile.join("Cache")),
                CacheTarget::direct(profile.join("Code Cache")),
            ]
        }
        Browser::Firefox => vec![CacheTarget::profiles(
            local_data.join("Mozilla").join("Firefox").join("Profiles"),
        )],
        Browser::LibreWolf => vec![CacheTarget::profiles(local_data.join("LibreWolf").join("Profiles"))],
    }
}

/// Map the `ProgId` of the http URL association to a browser. Unknown
/// handlers fall back to Edge, which ships with every install. Matching is
/// case-sensitive on the vendor names Windows writes (`ChromeHTML`,
/// `FirefoxURL-...`, `LibreWolfHTM`, `MSEdgeHTM`).
pub fn browser_from_prog_id(prog_id: &str) -> Browser {
    if prog_id.contains("Chrome") {
        Browser::Chrome
    } else if prog_id.contains("LibreWolf") {
        Browser::LibreWolf
    } else if prog_id.contains("Firefox") {
        Browser::Firefox
    } else {
        Browser::Edge
    }
}

#[cfg(windows)]
pub fn detect_default_browser() -> Browser {
    use winreg::enums::HKEY_CURRENT_USER;
    use winreg::RegKey;

    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let prog_id = hkcu
        .open_subkey(
            "Software\\Microsoft\\Windows\\Shell\\Associations\\UrlAssociations\\http\\UserChoice",
        )
        .and_then(|key| key.get_value::<String, _>("ProgId"));

    match prog_id {
        Ok(prog_id) => browser_from_prog_id(&prog_id),
        Err(e) => {
            warn!("Could not read default browser ({}); assuming edge", e);
            Browser::Edge
        }
    }
}

#[cfg(not(windows))]
pub fn detect_default_browser() -> Browser {
    Browser::Edge
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheSummary {
    pub cleared: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl CacheSummary {
    fn remove(&mut self, dir: &Path, validator: &SafetyValidator) {
        if matches!(validator.check_path(dir), SafetyLevel::Blocked) {
            warn!("Skipping {}: outside the browser data directory", dir.display());
            self.failed.push((dir.to_path_buf(), "blocked by path guard".to_string()));
            return;
        }

        match fs::remove_dir_all(dir) {
            Ok(()) => self.cleared.push(dir.to_path_buf()),
            Err(e) => {
                warn!("Could not clear {}: {}", dir.display(), e);
                self.failed.push((dir.to_path_buf(), e.to_string()));
            }
        }
    }
}

/// Delete the cache directories of `browser`. Paths that do not exist are
/// skipped; nothing outside `local_data` is ever touched.
pub fn clear_browser_cache(browser: Browser, local_data: &Path) -> CacheSummary {
    info!("Clearing {} cache...", browser);
    let validator = SafetyValidator::new(local_data);
    let mut summary = CacheSummary::default();

    for target in cache_targets(browser, local_data) {
        if !target.path.is_dir() {
            continue;
        }

        match target.layout {
            CacheLayout::Direct => summary.remove(&target.path, &validator),
            CacheLayout::Profiles => {
                let profiles = match fs::read_dir(&target.path) {
                    Ok(entries) => entries,
                    Err(e) => {
                        warn!("Could not list {}: {}", target.path.display(), e);
                        summary.failed.push((target.path.clone(), e.to_string()));
                        continue;
                    }
                };
                for profile in profiles.filter_map(Result::ok) {
                    let cache = profile.path().join("cache2");
                    if cache.is_dir() {
                        summary.remove(&cache, &validator);
                    }
                }
            }
        }
    }

    info!("Cleared {} cache directories for {}", summary.cleared.len(), browser);
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, file: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(file), b"cached").unwrap();
    }

    #[test]
    fn test_chromium_caches_are_removed() {
        let local = tempfile::tempdir().unwrap();
        let profile = local.path().join("Microsoft/Edge/User Data/Default");
        touch(&profile.join("Cache"), "data_0");
        touch(&profile.join("Code Cache"), "js");
        touch(&profile, "Bookmarks");

        let summary = clear_browser_cache(Browser::Edge, local.path());

        assert_eq!(summary.cleared.len(), 2);
        assert!(summary.failed.is_empty());
        assert!(!profile.join("Cache").exists());
        assert!(!profile.join("Code Cache").exists());
        assert!(profile.join("Bookmarks").exists());
    }

    #[test]
    fn test_firefox_only_cache2_is_removed() {
        let local = tempfile::tempdir().unwrap();
        let profiles = local.path().join("Mozilla/Firefox/Profiles");
        touch(&profiles.join("abc.default-release/cache2"), "entries");
        touch(&profiles.join("abc.default-release"), "places.sqlite");
        fs::create_dir_all(profiles.join("xyz.empty")).unwrap();

        let summary = clear_browser_cache(Browser::Firefox, local.path());

        assert_eq!(summary.cleared, vec![profiles.join("abc.default-release/cache2")]);
        assert!(profiles.join("abc.default-release/places.sqlite").exists());
        assert!(profiles.join("xyz.empty").exists());
    }

    #[test]
    fn test_other_browser_caches_are_left_alone() {
        let local = tempfile::tempdir().unwrap();
        let edge_cache = local.path().join("Microsoft/Edge/User Data/Default/Cache");
        touch(&edge_cache, "data_0");

        let summary = clear_browser_cache(Browser::Firefox, local.path());

        assert_eq!(summary, CacheSummary::default());
        assert!(edge_cache.join("data_0").exists());
    }

    #[test]
    fn test_missing_everything_is_not_an_error() {
        let local = tempfile::tempdir().unwrap();
        for browser in [Browser::Edge, Browser::Chrome, Browser::Firefox, Browser::LibreWolf] {
            assert_eq!(clear_browser_cache(browser, local.path()), CacheSummary::default());
        }
    }

    #[test]
    fn test_prog_id_mapping() {
        assert_eq!(browser_from_prog_id("ChromeHTML"), Browser::Chrome);
        assert_eq!(browser_from_prog_id("FirefoxURL-308046B0AF4A39CB"), Browser::Firefox);
        assert_eq!(browser_from_prog_id("LibreWolfHTM"), Browser::LibreWolf);
        assert_eq!(browser_from_prog_id("MSEdgeHTM"), Browser::Edge);
        assert_eq!(browser_from_prog_id("OperaStable"), Browser::Edge);
    }

    #[test]
    fn test_prog_id_match_is_case_sensitive() {
        assert_eq!(browser_from_prog_id("chromehtml"), Browser::Edge);
        assert_eq!(browser_from_prog_id("firefoxurl"), Browser::Edge);
    }
}
