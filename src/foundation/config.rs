use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{color::ColorMode, foundation::error::MediaResult};

pub const DEFAULT_SAMPLE_RATE: u32 = 22_050;
pub const DEFAULT_FONT_PATH: &str = "/usr/share/fonts/truetype/freefont/FreeMono.ttf";

pub const ENV_COLOR_WRAP_AROUND: &str = "MEDIACOMP_COLOR_WRAP_AROUND";
pub const ENV_FONT: &str = "MEDIACOMP_FONT";

/// Settings shared by every picture and sound operation in a session.
///
/// Color writes read their normalization mode from here, so toggling
/// wrap-around affects every write made afterwards and none made before.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub color_wrap_around: bool,
    pub font_path: PathBuf,
    pub default_sample_rate: u32,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            color_wrap_around: false,
            font_path: PathBuf::from(DEFAULT_FONT_PATH),
            default_sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl MediaConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(raw) = lookup(ENV_COLOR_WRAP_AROUND) {
            match parse_flag(&raw) {
                Some(flag) => cfg.color_wrap_around = flag,
                None => tracing::warn!(
                    value = %raw,
                    "{ENV_COLOR_WRAP_AROUND} must be either 1 (true) or 0 (false); keeping {}",
                    cfg.color_wrap_around
                ),
            }
        }
        if let Some(font) = lookup(ENV_FONT).filter(|s| !s.trim().is_empty()) {
            cfg.font_path = PathBuf::from(font);
        }
        cfg
    }

    pub fn from_json_path(path: &Path) -> MediaResult<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse config JSON '{}'", path.display()))?;
        Ok(cfg)
    }

    pub fn color_mode(&self) -> ColorMode {
        if self.color_wrap_around {
            ColorMode::WrapAround
        } else {
            ColorMode::Clamp
        }
    }

    pub fn color_wrap_around(&self) -> bool {
        self.color_wrap_around
    }

    pub fn set_color_wrap_around(&mut self, flag: bool) {
        self.color_wrap_around = flag;
    }

    /// Integer form of the wrap-around toggle. Only 0 and 1 are accepted;
    /// anything else is reported and leaves the current mode in place.
    pub fn set_color_wrap_around_value(&mut self, flag: i64) {
        match flag {
            0 => self.color_wrap_around = false,
            1 => self.color_wrap_around = true,
            other => tracing::warn!(
                flag = other,
                "set_color_wrap_around: input flag must be either 1 (true) or 0 (false)"
            ),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_clamp_and_textbook_rate() {
        let cfg = MediaConfig::default();
        assert_eq!(cfg.color_mode(), ColorMode::Clamp);
        assert_eq!(cfg.default_sample_rate, 22_050);
    }

    #[test]
    fn integer_toggle_rejects_non_boolean_values() {
        let mut cfg = MediaConfig::default();
        cfg.set_color_wrap_around_value(1);
        assert!(cfg.color_wrap_around());

        cfg.set_color_wrap_around_value(7);
        assert!(cfg.color_wrap_around());

        cfg.set_color_wrap_around_value(0);
        assert_eq!(cfg.color_mode(), ColorMode::Clamp);

        cfg.set_color_wrap_around_value(-1);
        assert_eq!(cfg.color_mode(), ColorMode::Clamp);
    }

    #[test]
    fn env_overlay_accepts_flags_and_font() {
        let cfg = MediaConfig::from_lookup(lookup_from(&[
            (ENV_COLOR_WRAP_AROUND, "true"),
            (ENV_FONT, "/tmp/mono.ttf"),
        ]));
        assert!(cfg.color_wrap_around);
        assert_eq!(cfg.font_path, PathBuf::from("/tmp/mono.ttf"));
    }

    #[test]
    fn env_overlay_ignores_invalid_flag() {
        let cfg = MediaConfig::from_lookup(lookup_from(&[(ENV_COLOR_WRAP_AROUND, "maybe")]));
        assert!(!cfg.color_wrap_around);
    }

    #[test]
    fn json_config_fills_missing_fields_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(&path, br#"{ "color_wrap_around": true }"#).unwrap();

        let cfg = MediaConfig::from_json_path(&path).unwrap();
        assert!(cfg.color_wrap_around);
        assert_eq!(cfg.default_sample_rate, DEFAULT_SAMPLE_RATE);
        assert_eq!(cfg.font_path, PathBuf::from(DEFAULT_FONT_PATH));
    }

    #[test]
    fn json_config_reports_missing_file() {
        let err = MediaConfig::from_json_path(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("read config"));
    }
}
