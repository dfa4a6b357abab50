use regex::Regex;
use tracing::{debug, warn};

use serialscope_types::{Mode, Telemetry, UnitSystem};

use crate::classify::compile_pattern;

/// Temperatures arrive in hundredths of a degree
const TEMPERATURE_SCALE: f64 = 100.0;

/// Pulls device readings out of free-form lines
///
/// Every extractor runs on every line and either updates its own field or
/// leaves it alone. Malformed values are logged and skipped.
#[derive(Clone, Debug)]
pub struct TelemetryExtractor {
    temperature: Option<Regex>,
    humidity: Option<Regex>,
    mode: Option<Regex>,
    version: Option<Regex>,
    unit: Option<Regex>,
    values: Telemetry,
}

impl TelemetryExtractor {
    pub fn new() -> Self {
        Self {
            temperature: compile_pattern(r#""temperature"\s*:\s*\[([^\]]*)\]"#),
            humidity: compile_pattern(r#""humidity"\s*:\s*\[([^\]]*)\]"#),
            mode: compile_pattern(r#""mode"\s*:\s*"?(-?\d+)"?"#),
            version: compile_pattern(r"(?i)(?:version|firmware)\s*[:=]?\s*v?(\d+\.\d+\.\d+)"),
            unit: compile_pattern(r#""unit"\s*:\s*"?(-?\d+)"?"#),
            values: Telemetry::default(),
        }
    }

    /// Latest derived values
    pub fn values(&self) -> &Telemetry {
        &self.values
    }

    /// Run every extractor over one line; returns whether anything changed
    pub fn observe(&mut self, text: &str) -> bool {
        let before = self.values.clone();

        if let Some(avg) = capture(&self.temperature, text).and_then(|raw| mean("temperature", raw)) {
            self.values.temperature = Some(avg / TEMPERATURE_SCALE);
        }

        if let Some(avg) = capture(&self.humidity, text).and_then(|raw| mean("humidity", raw)) {
            self.values.humidity = Some(avg);
        }

        if let Some(raw) = capture(&self.mode, text) {
            match raw.parse::<u32>().ok().and_then(Mode::from_code) {
                Some(mode) => self.values.mode = Some(mode),
                None => warn!(code = raw, "unmapped mode code"),
            }
        }

        if let Some(raw) = capture(&self.version, text) {
            self.values.firmware_version = Some(raw.to_string());
        }

        if let Some(raw) = capture(&self.unit, text) {
            match raw {
                "0" => self.values.units = Some(UnitSystem::Celsius),
                "1" => self.values.units = Some(UnitSystem::Fahrenheit),
                other => warn!(code = other, "unmapped unit flag"),
            }
        }

        let changed = self.values != before;
        if changed {
            debug!(telemetry = %self.values.summary(), "telemetry updated");
        }
        changed
    }

    /// Forget every derived value
    pub fn reset(&mut self) {
        self.values = Telemetry::default();
    }
}

impl Default for TelemetryExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn capture<'t>(re: &Option<Regex>, text: &'t str) -> Option<&'t str> {
    re.as_ref()?
        .captures(text)?
        .get(1)
        .map(|m| m.as_str())
}

/// Average of a comma separated number list
fn mean(field: &str, raw: &str) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;

    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match item.parse::<f64>() {
            Ok(value) if value.is_finite() => {
                sum += value;
                count += 1;
            }
            _ => {
                warn!(field, value = item, "malformed reading");
                return None;
            }
        }
    }

    if count == 0 {
        warn!(field, "empty reading array");
        return None;
    }
    Some(sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_average_scaled() {
        let mut ex = TelemetryExtractor::new();
        assert!(ex.observe(r#"telemetry-sender: JSON: {"temperature": [2100, 2200, 2300]}"#));
        assert_eq!(ex.values().temperature, Some(22.0));
    }

    #[test]
    fn test_humidity_average() {
        let mut ex = TelemetryExtractor::new();
        ex.observe(r#"{"humidity":[40,50]}"#);
        assert_eq!(ex.values().humidity, Some(45.0));
    }

    #[test]
    fn test_malformed_reading_keeps_previous() {
        let mut ex = TelemetryExtractor::new();
        ex.observe(r#"{"temperature":[2000]}"#);
        assert!(!ex.observe(r#"{"temperature":[20x0, 1]}"#));
        assert!(!ex.observe(r#"{"temperature":[]}"#));
        assert_eq!(ex.values().temperature, Some(20.0));
    }

    #[test]
    fn test_mode_mapping() {
        let mut ex = TelemetryExtractor::new();
        ex.observe(r#"{"mode": 3}"#);
        assert_eq!(ex.values().mode, Some(Mode::Auto));
        ex.observe(r#"{"mode": 42}"#);
        assert_eq!(ex.values().mode, Some(Mode::Auto));
    }

    #[test]
    fn test_version_and_unit() {
        let mut ex = TelemetryExtractor::new();
        ex.observe("Firmware version: v2.4.1 build 7");
        ex.observe(r#"{"unit":1}"#);
        assert_eq!(ex.values().firmware_version.as_deref(), Some("2.4.1"));
        assert_eq!(ex.values().units, Some(UnitSystem::Fahrenheit));
        ex.observe(r#"{"unit":5}"#);
        assert_eq!(ex.values().units, Some(UnitSystem::Fahrenheit));
    }

    #[test]
    fn test_unrelated_line_changes_nothing() {
        let mut ex = TelemetryExtractor::new();
        assert!(!ex.observe("wifi connected"));
        assert_eq!(ex.values(), &Telemetry::default());
    }
}
