use std::sync::Arc;

use regex::Regex;
use tracing::warn;

use serialscope_types::{ErrorCategory, ErrorRecord, LogLine};

/// Default text marking a line for the hidden log
pub const DEFAULT_SUPPRESSED_PATTERN: &str = "[HIDDEN]";

/// Lowest reconnect attempt number that counts as a connection problem
pub const DEFAULT_CONNECTION_THRESHOLD: u64 = 7;

/// Keywords (lowercase) that place a line in a category
#[derive(Clone, Copy, Debug)]
pub struct KeywordRule {
    pub category: ErrorCategory,
    pub keywords: &'static [&'static str],
}

/// Keyword categories in precedence order; the first match wins.
///
/// `ConnectionThreshold` is not keyword driven and is checked before this
/// table.
pub const KEYWORD_PRECEDENCE: &[KeywordRule] = &[
    KeywordRule {
        category: ErrorCategory::Error,
        keywords: &["error"],
    },
    KeywordRule {
        category: ErrorCategory::Failure,
        keywords: &["failure", "failed", "fails", "fail"],
    },
    KeywordRule {
        category: ErrorCategory::Warning,
        keywords: &["warning", "warn"],
    },
    KeywordRule {
        category: ErrorCategory::Unexpected,
        keywords: &["unexpected"],
    },
    KeywordRule {
        category: ErrorCategory::Exception,
        keywords: &["exception"],
    },
];

/// Compile a pattern, logging instead of failing
pub(crate) fn compile_pattern(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(pattern, error = %e, "invalid pattern, matcher disabled");
            None
        }
    }
}

/// Decides where a line goes and which category it belongs to
#[derive(Clone, Debug)]
pub struct Classifier {
    /// Substring that routes a line to the hidden log
    suppressed: String,

    /// Matches `Connection attempt N`, capturing N
    connection_attempt: Option<Regex>,

    /// Attempt number at which the connection category applies
    connection_threshold: u64,
}

impl Classifier {
    pub fn new(suppressed: impl Into<String>) -> Self {
        Self {
            suppressed: suppressed.into(),
            connection_attempt: compile_pattern(r"Connection attempt (\d+)"),
            connection_threshold: DEFAULT_CONNECTION_THRESHOLD,
        }
    }

    /// Override the attempt number that triggers the connection category
    pub fn with_connection_threshold(mut self, threshold: u64) -> Self {
        self.connection_threshold = threshold;
        self
    }

    pub fn suppressed_pattern(&self) -> &str {
        &self.suppressed
    }

    /// Whether the line belongs in the hidden log
    pub fn is_suppressed(&self, text: &str) -> bool {
        !self.suppressed.is_empty() && text.contains(&self.suppressed)
    }

    /// Category for a visible line, if any
    pub fn classify(&self, text: &str) -> Option<ErrorCategory> {
        if self.is_connection_threshold(text) {
            return Some(ErrorCategory::ConnectionThreshold);
        }

        let lower = text.to_lowercase();
        KEYWORD_PRECEDENCE
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| lower.contains(k)))
            .map(|rule| rule.category)
    }

    /// Build the error log for a run of visible lines from scratch
    pub fn classify_lines(&self, lines: &[Arc<LogLine>], first_sequence: u64) -> Vec<ErrorRecord> {
        let mut next = first_sequence;
        lines
            .iter()
            .filter_map(|line| {
                let category = self.classify(&line.text)?;
                let record = ErrorRecord {
                    sequence: next,
                    source_sequence: line.sequence,
                    category,
                    text: line.text.clone(),
                };
                next += 1;
                Some(record)
            })
            .collect()
    }

    fn is_connection_threshold(&self, text: &str) -> bool {
        let Some(re) = &self.connection_attempt else {
            return false;
        };
        re.captures_iter(text).any(|caps| {
            // Digits too long for u64 are certainly past the threshold
            caps[1]
                .parse::<u64>()
                .map_or(true, |n| n >= self.connection_threshold)
        })
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_SUPPRESSED_PATTERN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_categories() {
        let c = Classifier::default();
        assert_eq!(c.classify("ERROR: boom"), Some(ErrorCategory::Error));
        assert_eq!(c.classify("sensor read failed"), Some(ErrorCategory::Failure));
        assert_eq!(c.classify("Fails to bind"), Some(ErrorCategory::Failure));
        assert_eq!(c.classify("W: low battery warning"), Some(ErrorCategory::Warning));
        assert_eq!(c.classify("Unexpected token"), Some(ErrorCategory::Unexpected));
        assert_eq!(c.classify("caught exception"), Some(ErrorCategory::Exception));
        assert_eq!(c.classify("all good"), None);
    }

    #[test]
    fn test_precedence_first_match_wins() {
        let c = Classifier::default();
        assert_eq!(
            c.classify("warning: unexpected error"),
            Some(ErrorCategory::Error)
        );
        assert_eq!(
            c.classify("exception after failed write"),
            Some(ErrorCategory::Failure)
        );
    }

    #[test]
    fn test_connection_threshold() {
        let c = Classifier::default();
        assert_eq!(c.classify("Connection attempt 6"), None);
        assert_eq!(
            c.classify("Connection attempt 7"),
            Some(ErrorCategory::ConnectionThreshold)
        );
        assert_eq!(
            c.classify("Connection attempt 12 error"),
            Some(ErrorCategory::ConnectionThreshold)
        );
        assert_eq!(c.classify("Connection attempt 3 error"), Some(ErrorCategory::Error));
    }

    #[test]
    fn test_custom_connection_threshold() {
        let c = Classifier::default().with_connection_threshold(3);
        assert_eq!(
            c.classify("Connection attempt 3"),
            Some(ErrorCategory::ConnectionThreshold)
        );
    }

    #[test]
    fn test_suppressed_pattern() {
        let c = Classifier::new("heartbeat");
        assert!(c.is_suppressed("heartbeat"));
        assert!(c.is_suppressed("tx heartbeat ok"));
        assert!(!c.is_suppressed("Heartbeat"));
        assert!(!Classifier::new("").is_suppressed("anything"));
    }

    #[test]
    fn test_classify_lines_back_references() {
        let c = Classifier::default();
        let lines: Vec<Arc<LogLine>> = ["ok", "error one", "fine", "warn two"]
            .iter()
            .enumerate()
            .map(|(i, t)| Arc::new(LogLine::new(i as u64 + 10, chrono::Utc::now(), t.to_string())))
            .collect();

        let records = c.classify_lines(&lines, 0);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sequence, 0);
        assert_eq!(records[0].source_sequence, 11);
        assert_eq!(records[1].source_sequence, 13);
        assert_eq!(records[1].category, ErrorCategory::Warning);
    }
}
