use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use serialscope_logs::{
    DEFAULT_FANOUT_CAPACITY, DEFAULT_HIDDEN_CAPACITY, DEFAULT_LOAD_CHUNK, DEFAULT_MAX_VISIBLE,
    DEFAULT_SUPPRESSED_PATTERN, FULL_VIEW, PipelineConfig, ScrollWindow, ViewSpec,
};
use serialscope_types::{DataBits, FlowControl, Parity, SerialSettings, StopBits};

/// Looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "serialscope.toml";

/// Settings read from `serialscope.toml`
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub serial: SerialSettings,

    /// Lines containing this are routed to the hidden buffer
    #[serde(default = "default_suppressed_pattern")]
    pub suppressed_pattern: String,

    #[serde(default = "default_hidden_capacity")]
    pub hidden_capacity: usize,

    /// Upper bound on lines materialized for the log pane
    #[serde(default = "default_max_visible")]
    pub max_visible: usize,

    /// Lines prepended per scroll-back step
    #[serde(default = "default_load_chunk")]
    pub load_chunk: usize,

    #[serde(default = "default_fanout_capacity")]
    pub fanout_capacity: usize,

    /// View shown when the log viewer opens
    #[serde(default = "default_view")]
    pub default_view: String,

    /// Extra `[[views]]` tables; a name matching a stock view replaces it
    #[serde(default)]
    pub views: Vec<ViewSpec>,
}

fn default_suppressed_pattern() -> String {
    DEFAULT_SUPPRESSED_PATTERN.to_string()
}

fn default_hidden_capacity() -> usize {
    DEFAULT_HIDDEN_CAPACITY
}

fn default_max_visible() -> usize {
    DEFAULT_MAX_VISIBLE
}

fn default_load_chunk() -> usize {
    DEFAULT_LOAD_CHUNK
}

fn default_fanout_capacity() -> usize {
    DEFAULT_FANOUT_CAPACITY
}

fn default_view() -> String {
    FULL_VIEW.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            serial: SerialSettings::default(),
            suppressed_pattern: default_suppressed_pattern(),
            hidden_capacity: default_hidden_capacity(),
            max_visible: default_max_visible(),
            load_chunk: default_load_chunk(),
            fanout_capacity: default_fanout_capacity(),
            default_view: default_view(),
            views: Vec::new(),
        }
    }
}

/// Command line values that win over the config file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub baud_rate: Option<u32>,
    pub data_bits: Option<DataBits>,
    pub parity: Option<Parity>,
    pub stop_bits: Option<StopBits>,
    pub flow_control: Option<FlowControl>,
    pub max_visible: Option<usize>,
    pub view: Option<String>,
}

impl AppConfig {
    /// Load from `path`, or from `serialscope.toml` when present.
    ///
    /// An explicit path must exist; the implicit one falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let implicit = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !implicit.exists() {
                    return Ok(Self::default());
                }
                implicit
            }
        };

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;

        info!(
            path = %path.display(),
            views = config.views.len(),
            "Loaded config"
        );
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content)?;

        if config.max_visible == 0 {
            warn!("max_visible of 0 ignored, using {}", DEFAULT_MAX_VISIBLE);
            config.max_visible = DEFAULT_MAX_VISIBLE;
        }
        if config.load_chunk == 0 {
            warn!("load_chunk of 0 ignored, using {}", DEFAULT_LOAD_CHUNK);
            config.load_chunk = DEFAULT_LOAD_CHUNK;
        }
        Ok(config)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(baud) = overrides.baud_rate {
            self.serial.baud_rate = baud;
        }
        if let Some(bits) = overrides.data_bits {
            self.serial.data_bits = bits;
        }
        if let Some(parity) = overrides.parity {
            self.serial.parity = parity;
        }
        if let Some(stop) = overrides.stop_bits {
            self.serial.stop_bits = stop;
        }
        if let Some(flow) = overrides.flow_control {
            self.serial.flow_control = flow;
        }
        if let Some(max) = overrides.max_visible.filter(|m| *m > 0) {
            self.max_visible = max;
        }
        if let Some(view) = overrides.view {
            self.default_view = view;
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            suppressed_pattern: self.suppressed_pattern.clone(),
            hidden_capacity: self.hidden_capacity,
            fanout_capacity: self.fanout_capacity,
            views: self.views.clone(),
        }
    }

    pub fn scroll_window(&self) -> ScrollWindow {
        ScrollWindow::new(self.max_visible, self.load_chunk)
    }
}

/// Map a numeric data-bit count onto the serial setting
pub fn data_bits_from(bits: u8) -> Option<DataBits> {
    match bits {
        5 => Some(DataBits::Five),
        6 => Some(DataBits::Six),
        7 => Some(DataBits::Seven),
        8 => Some(DataBits::Eight),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialscope_logs::ViewKind;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.serial, SerialSettings::default());
        assert_eq!(config.max_visible, DEFAULT_MAX_VISIBLE);
        assert_eq!(config.default_view, FULL_VIEW);
        assert!(config.views.is_empty());
    }

    #[test]
    fn test_parse_serial_and_views() {
        let config = AppConfig::from_toml(
            r#"
            suppressed_pattern = "[RX]"
            max_visible = 200
            default_view = "errors-only"

            [serial]
            baud_rate = 9600
            parity = "even"
            stop_bits = "two"

            [[views]]
            name = "errors-only"
            kind = "keyword"
            keyword = "error"

            [[views]]
            name = "boot"
            kind = "section"
            start = "BOOT START"
            end = "BOOT END"
            case_sensitive = true
            "#,
        )
        .unwrap();

        assert_eq!(config.suppressed_pattern, "[RX]");
        assert_eq!(config.max_visible, 200);
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.serial.parity, Parity::Even);
        assert_eq!(config.serial.stop_bits, StopBits::Two);
        assert_eq!(config.serial.data_bits, DataBits::Eight);

        assert_eq!(config.views.len(), 2);
        assert_eq!(
            config.views[0].kind,
            ViewKind::Keyword {
                keyword: "error".to_string()
            }
        );
        assert!(config.views[1].case_sensitive);
        assert_eq!(config.pipeline_config().views.len(), 2);
    }

    #[test]
    fn test_context_view_numbers() {
        let config = AppConfig::from_toml(
            r#"
            [[views]]
            name = "crash"
            kind = "context"
            target = "panic"
            before = 3
            after = 10
            "#,
        )
        .unwrap();

        assert_eq!(
            config.views[0].kind,
            ViewKind::Context {
                target: "panic".to_string(),
                before: 3,
                after: 10,
            }
        );
    }

    #[test]
    fn test_unknown_view_kind_rejected() {
        let result = AppConfig::from_toml(
            r#"
            [[views]]
            name = "bad"
            kind = "regex"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_window_sizes_fall_back() {
        let config = AppConfig::from_toml("max_visible = 0\nload_chunk = 0").unwrap();
        assert_eq!(config.max_visible, DEFAULT_MAX_VISIBLE);
        assert_eq!(config.load_chunk, DEFAULT_LOAD_CHUNK);
    }

    #[test]
    fn test_overrides_win() {
        let mut config = AppConfig::default();
        config.apply(Overrides {
            baud_rate: Some(57_600),
            data_bits: data_bits_from(7),
            flow_control: Some(FlowControl::Hardware),
            max_visible: Some(0),
            view: Some("wifi".to_string()),
            ..Default::default()
        });

        assert_eq!(config.serial.baud_rate, 57_600);
        assert_eq!(config.serial.data_bits, DataBits::Seven);
        assert_eq!(config.serial.flow_control, FlowControl::Hardware);
        assert_eq!(config.serial.parity, Parity::None);
        // Zero is not a usable window
        assert_eq!(config.max_visible, DEFAULT_MAX_VISIBLE);
        assert_eq!(config.default_view, "wifi");
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/serialscope.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_data_bits_range() {
        assert_eq!(data_bits_from(5), Some(DataBits::Five));
        assert_eq!(data_bits_from(9), None);
    }
}
