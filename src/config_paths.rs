//! Where saved layouts and logs live
//!
//! `layouts/` holds one `<name>.yaml` (or `.json`) layout state per saved
//! layout, `logs/` the daily rolling `flexing.log`.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

const APP_DIR: &str = "flexing";

/// `$XDG_CONFIG_HOME/flexing`, else `~/.config/flexing`; `%APPDATA%\flexing` on Windows
pub fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        env::var_os("APPDATA")
            .map(PathBuf::from)
            .or_else(dirs::config_dir)
            .map(|dir| dir.join(APP_DIR))
    }

    #[cfg(not(target_os = "windows"))]
    {
        env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .map(|config| config.join(APP_DIR))
    }
}

/// Saved layout states
pub fn layouts_dir() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("layouts"))
}

/// Default file for a layout saved under `name`
pub fn layout_file(name: &str) -> Option<PathBuf> {
    layouts_dir().map(|dir| dir.join(format!("{}.yaml", name)))
}

pub fn logs_dir() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("logs"))
}

fn ensure_dir(path: &Path) -> Result<(), String> {
    fs::create_dir_all(path)
        .map_err(|e| format!("Failed to create directory {}: {}", path.display(), e))
}

/// Ensure the base config dir exists, returning it
pub fn ensure_config_dir() -> Result<PathBuf, String> {
    let dir = config_dir().ok_or_else(|| "No config directory available".to_string())?;
    ensure_dir(&dir)?;
    Ok(dir)
}

/// Ensure layouts dir exists, returning it
pub fn ensure_layouts_dir() -> Result<PathBuf, String> {
    let layouts = ensure_config_dir()?.join("layouts");
    ensure_dir(&layouts)?;
    Ok(layouts)
}

/// Ensure logs dir exists, returning it
pub fn ensure_logs_dir() -> Result<PathBuf, String> {
    let logs = ensure_config_dir()?.join("logs");
    ensure_dir(&logs)?;
    Ok(logs)
}

/// Names of the saved layouts (file stems of `*.yaml` / `*.json`), sorted
pub fn saved_layouts() -> Vec<String> {
    layouts_dir()
        .map(|dir| layout_names_in(&dir))
        .unwrap_or_default()
}

fn layout_names_in(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| matches!(ext, "yaml" | "yml" | "json"))
        })
        .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
        .collect();
    names.sort();
    names.dedup();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout_names_skip_other_files() {
        let dir = TempDir::new().unwrap();
        for file in ["trading.yaml", "trading.json", "alpha.yml", "notes.txt", "flexing.log"] {
            fs::write(dir.path().join(file), "").unwrap();
        }
        fs::create_dir(dir.path().join("archive")).unwrap();

        assert_eq!(layout_names_in(dir.path()), vec!["alpha", "trading"]);
    }

    #[test]
    fn test_missing_layouts_dir_lists_nothing() {
        let dir = TempDir::new().unwrap();
        assert!(layout_names_in(&dir.path().join("layouts")).is_empty());
    }

    #[test]
    fn test_layout_file_is_yaml_under_layouts_dir() {
        if let (Some(file), Some(dir)) = (layout_file("main"), layouts_dir()) {
            assert_eq!(file, dir.join("main.yaml"));
        }
    }
}
