//! Configuration record — spec §6's CONFIG table as a typed, serde
//! struct with every documented default, loadable from a TOML file and
//! overridable by `OCR_*` environment variables (teacher-style plain
//! struct, no builder macro).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub overlap_correction: bool,
    pub overlap_padding: i32,

    pub max_char_height: i32,
    pub max_char_width: i32,
    pub max_char_area: i32,

    pub min_contour_area: i32,
    pub min_contour_height: i32,
    pub min_contour_width: i32,

    pub max_space_between_chars_of_word: i32,
    pub max_space_between_words: i32,

    pub max_translator_choices: i32,
    pub log_level: String,

    pub slow_request_ms: u64,
    pub hung_request_ms: u64,
    pub slow_or_hung_request_log_level: String,

    /// Early-exit anchor match score (0-100), default 90 per spec §4.4.
    pub anchor_stop_score: f64,

    /// Default bottom-band crop fraction kept by the preprocessor, spec §4.1.
    pub default_crop_begin_height: f64,
    pub default_crop_end_height: f64,

    /// Max delta (degrees) gating curve-following continuation, spec §4.6.1.
    pub curve_max_delta: f64,
    /// Good-enough degreeDelta accepted immediately while crossing, spec §4.6.2.
    pub curve_good_small_delta: f64,
    /// Steps walked backward while searching for a crossing seed, spec §4.6.2.
    pub curve_max_steps_back: i32,
    /// Extra forward steps taken before perpendicular probing starts, spec §4.6.2.
    pub curve_probe_start_steps: i32,
    /// Forward probes attempted while crossing an intersection, spec §4.6.2.
    pub curve_max_forward_probes: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            overlap_correction: true,
            overlap_padding: 5,

            max_char_height: 30,
            max_char_width: 28,
            max_char_area: 30 * 28,

            min_contour_area: 20,
            min_contour_height: 7,
            min_contour_width: 3,

            max_space_between_chars_of_word: 15,
            max_space_between_words: 200,

            max_translator_choices: 3,
            log_level: "info".to_string(),

            slow_request_ms: 0,
            hung_request_ms: 0,
            slow_or_hung_request_log_level: "debug".to_string(),

            anchor_stop_score: 90.0,

            default_crop_begin_height: 0.60,
            default_crop_end_height: 1.0,

            curve_max_delta: 20.0,
            curve_good_small_delta: 15.0,
            curve_max_steps_back: 4,
            curve_probe_start_steps: 2,
            curve_max_forward_probes: 20,
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::configuration(format!("invalid config toml: {e}")))
    }

    /// Read and parse a config file, for CLI `--config` flags.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Overlay `OCR_<SCREAMING_SNAKE_CASE>` environment variables on top
    /// of the current values. Unset variables leave the field untouched;
    /// unparsable values are a configuration error.
    pub fn apply_env(mut self) -> Result<Self> {
        macro_rules! overlay_str {
            ($field:ident, $env:literal) => {
                if let Ok(v) = std::env::var($env) {
                    self.$field = v;
                }
            };
        }
        macro_rules! overlay_parsed {
            ($field:ident, $env:literal) => {
                if let Ok(v) = std::env::var($env) {
                    self.$field = v.parse().map_err(|_| {
                        Error::configuration(format!("invalid value for {}: {v}", $env))
                    })?;
                }
            };
        }

        overlay_parsed!(overlap_correction, "OCR_OVERLAP_CORRECTION");
        overlay_parsed!(overlap_padding, "OCR_OVERLAP_PADDING");
        overlay_parsed!(max_char_height, "OCR_MAX_CHAR_HEIGHT");
        overlay_parsed!(max_char_width, "OCR_MAX_CHAR_WIDTH");
        overlay_parsed!(max_char_area, "OCR_MAX_CHAR_AREA");
        overlay_parsed!(min_contour_area, "OCR_MIN_CONTOUR_AREA");
        overlay_parsed!(min_contour_height, "OCR_MIN_CONTOUR_HEIGHT");
        overlay_parsed!(min_contour_width, "OCR_MIN_CONTOUR_WIDTH");
        overlay_parsed!(
            max_space_between_chars_of_word,
            "OCR_MAX_SPACE_BETWEEN_CHARS_OF_WORD"
        );
        overlay_parsed!(max_space_between_words, "OCR_MAX_SPACE_BETWEEN_WORDS");
        overlay_parsed!(max_translator_choices, "OCR_MAX_TRANSLATOR_CHOICES");
        overlay_str!(log_level, "OCR_LOG_LEVEL");
        overlay_parsed!(slow_request_ms, "OCR_SLOW_REQUEST_MS");
        overlay_parsed!(hung_request_ms, "OCR_HUNG_REQUEST_MS");
        overlay_str!(
            slow_or_hung_request_log_level,
            "OCR_SLOW_OR_HUNG_REQUEST_LOG_LEVEL"
        );

        validate_log_level(&self.log_level)?;
        validate_log_level(&self.slow_or_hung_request_log_level)?;

        Ok(self)
    }
}

fn validate_log_level(level: &str) -> Result<()> {
    const VALID: &[&str] = &["trace", "debug", "info", "warn", "error"];
    if VALID.contains(&level) {
        Ok(())
    } else {
        Err(Error::configuration(format!("invalid log level: {level}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_config_table() {
        let c = Config::default();
        assert_eq!(c.overlap_padding, 5);
        assert_eq!(c.max_char_height, 30);
        assert_eq!(c.max_char_width, 28);
        assert_eq!(c.max_char_area, 840);
        assert_eq!(c.min_contour_area, 20);
        assert_eq!(c.min_contour_height, 7);
        assert_eq!(c.min_contour_width, 3);
        assert_eq!(c.max_space_between_chars_of_word, 15);
        assert_eq!(c.max_space_between_words, 200);
        assert_eq!(c.max_translator_choices, 3);
        assert_eq!(c.log_level, "info");
        assert_eq!(c.slow_request_ms, 0);
        assert_eq!(c.hung_request_ms, 0);
        assert_eq!(c.slow_or_hung_request_log_level, "debug");
    }

    #[test]
    fn invalid_log_level_rejected() {
        let toml = r#"log_level = "noisy""#;
        let cfg = Config::from_toml_str(toml).unwrap();
        assert!(cfg.apply_env().is_err());
    }

    #[test]
    fn from_toml_file_reads_overrides_from_disk() {
        use std::io::Write;

        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, r#"overlap_padding = 9"#).unwrap();
        writeln!(tmp, r#"log_level = "warn""#).unwrap();

        let cfg = Config::from_toml_file(tmp.path()).unwrap();
        assert_eq!(cfg.overlap_padding, 9);
        assert_eq!(cfg.log_level, "warn");
        assert_eq!(cfg.max_char_height, 30);
    }

    #[test]
    fn from_toml_file_missing_path_is_an_io_error() {
        let missing = std::path::Path::new("/nonexistent/ocr-config.toml");
        assert!(Config::from_toml_file(missing).is_err());
    }
}
