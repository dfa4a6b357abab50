//! Shared types for serialscope
//!
//! This crate contains data structures used across multiple serialscope crates.

use chrono::{DateTime, Utc};
use ratatui::style::Color;
use serde::{Deserialize, Serialize};

// ============================================================================
// Serial Connection Types
// ============================================================================

/// Number of data bits per character
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataBits {
    Five,
    Six,
    Seven,
    #[default]
    Eight,
}

/// Parity checking mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

/// Number of stop bits
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopBits {
    #[default]
    One,
    Two,
}

/// Flow control mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    #[default]
    None,
    Software,
    Hardware,
}

/// Framing parameters handed to the transport untouched
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            data_bits: DataBits::default(),
            parity: Parity::default(),
            stop_bits: StopBits::default(),
            flow_control: FlowControl::default(),
        }
    }
}

impl SerialSettings {
    /// Short "115200 8N1" style summary
    pub fn summary(&self) -> String {
        let bits = match self.data_bits {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        };
        let parity = match self.parity {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
        };
        let stop = match self.stop_bits {
            StopBits::One => 1,
            StopBits::Two => 2,
        };
        format!("{} {}{}{}", self.baud_rate, bits, parity, stop)
    }
}

/// A serial device discovered on the host
#[derive(Clone, Debug)]
pub struct PortInfo {
    pub name: String,
    pub description: String,
}

impl PortInfo {
    pub fn new(name: String, description: String) -> Self {
        Self { name, description }
    }
}

/// State of the active source connection
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error(String),
}

impl ConnectionStatus {
    pub fn label(&self) -> &str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error(msg) => msg,
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Disconnected => Color::DarkGray,
            Self::Connecting => Color::Yellow,
            Self::Connected => Color::Green,
            Self::Error(_) => Color::Red,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

// ============================================================================
// Log Types
// ============================================================================

/// A single framed line of device output
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogLine {
    /// Position in the owning store's sequence space
    pub sequence: u64,

    /// Arrival time of the chunk that completed this line
    pub timestamp: DateTime<Utc>,

    /// Line text without its terminator
    pub text: String,
}

impl LogLine {
    pub fn new(sequence: u64, timestamp: DateTime<Utc>, text: String) -> Self {
        Self {
            sequence,
            timestamp,
            text,
        }
    }
}

/// Severity bucket assigned by the classifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
    ConnectionThreshold,
    Error,
    Failure,
    Warning,
    Unexpected,
    Exception,
}

impl ErrorCategory {
    /// Every category, in classification precedence order
    pub const ALL: [ErrorCategory; 6] = [
        Self::ConnectionThreshold,
        Self::Error,
        Self::Failure,
        Self::Warning,
        Self::Unexpected,
        Self::Exception,
    ];

    /// Short display string (3 chars)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectionThreshold => "CON",
            Self::Error => "ERR",
            Self::Failure => "FAL",
            Self::Warning => "WRN",
            Self::Unexpected => "UNX",
            Self::Exception => "EXC",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ConnectionThreshold => "connection",
            Self::Error => "error",
            Self::Failure => "failure",
            Self::Warning => "warning",
            Self::Unexpected => "unexpected",
            Self::Exception => "exception",
        }
    }

    /// Get display color for this category
    pub fn color(&self) -> Color {
        match self {
            Self::ConnectionThreshold => Color::Magenta,
            Self::Error | Self::Failure => Color::Red,
            Self::Warning => Color::Yellow,
            Self::Unexpected => Color::LightRed,
            Self::Exception => Color::LightMagenta,
        }
    }
}

/// A classified reference back to the line that produced it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorRecord {
    /// Position within the error log
    pub sequence: u64,

    /// Sequence of the originating visible line
    pub source_sequence: u64,

    pub category: ErrorCategory,

    pub text: String,
}

/// Running tally per error category
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ErrorCounters {
    pub error: usize,
    pub failure: usize,
    pub warning: usize,
    pub unexpected: usize,
    pub exception: usize,
    pub connection: usize,
}

impl ErrorCounters {
    pub fn increment(&mut self, category: ErrorCategory) {
        match category {
            ErrorCategory::ConnectionThreshold => self.connection += 1,
            ErrorCategory::Error => self.error += 1,
            ErrorCategory::Failure => self.failure += 1,
            ErrorCategory::Warning => self.warning += 1,
            ErrorCategory::Unexpected => self.unexpected += 1,
            ErrorCategory::Exception => self.exception += 1,
        }
    }

    pub fn get(&self, category: ErrorCategory) -> usize {
        match category {
            ErrorCategory::ConnectionThreshold => self.connection,
            ErrorCategory::Error => self.error,
            ErrorCategory::Failure => self.failure,
            ErrorCategory::Warning => self.warning,
            ErrorCategory::Unexpected => self.unexpected,
            ErrorCategory::Exception => self.exception,
        }
    }

    pub fn total(&self) -> usize {
        self.error + self.failure + self.warning + self.unexpected + self.exception + self.connection
    }
}

/// Line payload pushed to remote viewers
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LineEvent {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

impl From<&LogLine> for LineEvent {
    fn from(line: &LogLine) -> Self {
        Self {
            sequence: line.sequence,
            timestamp: line.timestamp,
            text: line.text.clone(),
        }
    }
}

// ============================================================================
// Telemetry Types
// ============================================================================

/// Operating mode reported by the device
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Mode {
    Off,
    Heat,
    Cool,
    Auto,
    Fan,
}

impl Mode {
    /// Map the device's numeric mode code
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Off),
            1 => Some(Self::Heat),
            2 => Some(Self::Cool),
            3 => Some(Self::Auto),
            4 => Some(Self::Fan),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Heat => "heat",
            Self::Cool => "cool",
            Self::Auto => "auto",
            Self::Fan => "fan",
        }
    }
}

/// Display unit flag reported by the device
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum UnitSystem {
    Celsius,
    Fahrenheit,
}

impl UnitSystem {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }
}

/// Latest values derived from the line stream
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Telemetry {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub mode: Option<Mode>,
    pub firmware_version: Option<String>,
    pub units: Option<UnitSystem>,
}

impl Telemetry {
    /// One-line summary for status displays
    pub fn summary(&self) -> String {
        let unit = self.units.map(|u| u.symbol()).unwrap_or("°");
        let temperature = self
            .temperature
            .map(|t| format!("{:.1}{}", t, unit))
            .unwrap_or_else(|| "-".to_string());
        let humidity = self
            .humidity
            .map(|h| format!("{:.0}%", h))
            .unwrap_or_else(|| "-".to_string());
        let mode = self.mode.map(|m| m.label()).unwrap_or("-");
        let version = self.firmware_version.as_deref().unwrap_or("-");
        format!(
            "temp {} │ hum {} │ mode {} │ fw {}",
            temperature, humidity, mode, version
        )
    }
}
