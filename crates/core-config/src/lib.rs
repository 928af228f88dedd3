//! Configuration loading.
//!
//! The config file is flat `key=value` lines with `#` comments and blank
//! lines ignored. Unknown keys are skipped silently so older binaries can
//! read newer files. Out-of-range values clamp (with a log line) rather
//! than fail; a missing or unreadable file yields the defaults.

use std::path::PathBuf;
use std::{env, fs};

use core_text::Result;
use tracing::info;

/// Allowed `tab_width` range.
pub const TAB_WIDTH_MIN: usize = 1;
pub const TAB_WIDTH_MAX: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub theme: String,
    pub fuzzy_max_depth: usize,
    pub fuzzy_max_files: usize,
    pub fuzzy_case_sensitive: bool,
    pub show_file_icons: bool,
    pub show_hidden_files: bool,
    pub tab_width: usize,
    pub bar_at_top: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            theme: "default".to_string(),
            fuzzy_max_depth: 8,
            fuzzy_max_files: 10_000,
            fuzzy_case_sensitive: false,
            show_file_icons: true,
            show_hidden_files: false,
            tab_width: 8,
            bar_at_top: false,
        }
    }
}

/// Config path under `$HOME` (falling back to the platform config dir).
pub fn discover() -> PathBuf {
    if let Ok(home) = env::var("HOME") {
        return PathBuf::from(home).join(".config").join("sable").join("config.ini");
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sable")
        .join("config.ini")
}

/// Load from `path` (or the discovered location); missing file means
/// defaults.
pub fn load(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    Ok(parse(&content))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse config text; bad values keep their defaults.
pub fn parse(content: &str) -> Config {
    let mut config = Config::default();
    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        match key {
            "theme" => config.theme = value.to_string(),
            "fuzzy_max_depth" => {
                if let Ok(v) = value.parse() {
                    config.fuzzy_max_depth = v;
                }
            }
            "fuzzy_max_files" => {
                if let Ok(v) = value.parse() {
                    config.fuzzy_max_files = v;
                }
            }
            "fuzzy_case_sensitive" => {
                if let Some(v) = parse_bool(value) {
                    config.fuzzy_case_sensitive = v;
                }
            }
            "show_file_icons" => {
                if let Some(v) = parse_bool(value) {
                    config.show_file_icons = v;
                }
            }
            "show_hidden_files" => {
                if let Some(v) = parse_bool(value) {
                    config.show_hidden_files = v;
                }
            }
            "tab_width" => {
                if let Ok(v) = value.parse::<usize>() {
                    let clamped = v.clamp(TAB_WIDTH_MIN, TAB_WIDTH_MAX);
                    if clamped != v {
                        info!(target: "config", raw = v, clamped, "tab_width clamped");
                    }
                    config.tab_width = clamped;
                }
            }
            "bar_at_top" => {
                if let Some(v) = parse_bool(value) {
                    config.bar_at_top = v;
                }
            }
            // Unknown keys are ignored for forward compatibility.
            _ => {}
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_missing() {
        let cfg = load(Some(PathBuf::from("/nonexistent/sable.ini"))).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn parses_known_keys() {
        let cfg = parse(
            "# a comment\n\ntheme = gruvbox\ntab_width=4\nbar_at_top = true\nshow_hidden_files=yes\nfuzzy_max_depth=3\n",
        );
        assert_eq!(cfg.theme, "gruvbox");
        assert_eq!(cfg.tab_width, 4);
        assert!(cfg.bar_at_top);
        assert!(cfg.show_hidden_files);
        assert_eq!(cfg.fuzzy_max_depth, 3);
    }

    #[test]
    fn tab_width_clamps_to_range() {
        assert_eq!(parse("tab_width=0").tab_width, 1);
        assert_eq!(parse("tab_width=99").tab_width, 16);
    }

    #[test]
    fn unknown_keys_and_garbage_are_ignored() {
        let cfg = parse("nonsense=1\nnot a pair\ntab_width=borked\n");
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn loads_from_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "theme=light\ntab_width=2\n").unwrap();
        let cfg = load(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.theme, "light");
        assert_eq!(cfg.tab_width, 2);
    }
}
