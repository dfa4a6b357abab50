use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use serialscope_types::{ErrorCategory, ErrorCounters, ErrorRecord, LogLine};

use crate::classify::Classifier;
use crate::framer::FramedLine;
use crate::store::LogStore;

/// Default capacity of the hidden log
pub const DEFAULT_HIDDEN_CAPACITY: usize = 1000;

/// Where an ingested line ended up
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Routed {
    Visible {
        line: Arc<LogLine>,
        category: Option<ErrorCategory>,
    },
    Hidden(Arc<LogLine>),
}

/// Consistent view of the index taken under one read lock
#[derive(Clone, Debug, Default)]
pub struct IndexSnapshot {
    pub visible: Vec<Arc<LogLine>>,
    pub errors: Vec<ErrorRecord>,
    pub counters: ErrorCounters,
    pub hidden_len: usize,
}

struct IndexState {
    visible: LogStore,
    hidden: LogStore,
    errors: Vec<ErrorRecord>,
    /// Sequence of the first record after the last clear
    error_base: u64,
    next_error: u64,
    counters: ErrorCounters,
}

/// Classification and correlation engine
///
/// Owns the canonical store, the hidden log, the error log and the counters.
/// All of them sit behind a single lock, so a clear is one unit of work and a
/// reader never sees a half-applied append.
#[derive(Clone)]
pub struct LogIndex {
    state: Arc<RwLock<IndexState>>,
    classifier: Arc<Classifier>,
}

impl LogIndex {
    pub fn new(classifier: Classifier, hidden_capacity: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(IndexState {
                visible: LogStore::unbounded(),
                hidden: LogStore::bounded(hidden_capacity),
                errors: Vec::new(),
                error_base: 0,
                next_error: 0,
                counters: ErrorCounters::default(),
            })),
            classifier: Arc::new(classifier),
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Route, store and classify one framed line
    pub fn ingest(&self, framed: FramedLine) -> Routed {
        let mut state = self.state.write();

        if self.classifier.is_suppressed(&framed.text) {
            let line = state.hidden.push(framed.timestamp, framed.text);
            return Routed::Hidden(line);
        }

        let line = state.visible.push(framed.timestamp, framed.text);
        let category = self.classifier.classify(&line.text);

        if let Some(category) = category {
            let sequence = state.next_error;
            state.next_error += 1;
            state.errors.push(ErrorRecord {
                sequence,
                source_sequence: line.sequence,
                category,
                text: line.text.clone(),
            });
            state.counters.increment(category);
            debug!(
                sequence = line.sequence,
                category = category.label(),
                "classified line"
            );
        }

        Routed::Visible { line, category }
    }

    /// Every visible line (Arc clones are cheap)
    pub fn visible(&self) -> Vec<Arc<LogLine>> {
        self.state.read().visible.all()
    }

    /// Lines currently retained in the hidden log
    pub fn hidden(&self) -> Vec<Arc<LogLine>> {
        self.state.read().hidden.all()
    }

    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.state.read().errors.clone()
    }

    pub fn counters(&self) -> ErrorCounters {
        self.state.read().counters
    }

    pub fn snapshot(&self) -> IndexSnapshot {
        let state = self.state.read();
        IndexSnapshot {
            visible: state.visible.all(),
            errors: state.errors.clone(),
            counters: state.counters,
            hidden_len: state.hidden.len(),
        }
    }

    /// Visible line count
    pub fn len(&self) -> usize {
        self.state.read().visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hidden_len(&self) -> usize {
        self.state.read().hidden.len()
    }

    /// Visible line by sequence
    pub fn line(&self, sequence: u64) -> Option<Arc<LogLine>> {
        self.state.read().visible.get(sequence).cloned()
    }

    /// Hidden line by sequence (hidden sequence space)
    pub fn hidden_line(&self, sequence: u64) -> Option<Arc<LogLine>> {
        self.state.read().hidden.get(sequence).cloned()
    }

    /// Resolve an error record back to the line that produced it
    pub fn source_of(&self, record: &ErrorRecord) -> Option<Arc<LogLine>> {
        self.line(record.source_sequence)
    }

    /// Rebuild the error log from the current store without touching state
    pub fn reclassify(&self) -> Vec<ErrorRecord> {
        let state = self.state.read();
        let lines = state.visible.all();
        self.classifier.classify_lines(&lines, state.error_base)
    }

    /// Empty every store and zero the counters as one unit of work
    pub fn clear(&self) {
        let mut state = self.state.write();
        let dropped = state.visible.len();
        state.visible.clear();
        state.hidden.clear();
        state.errors.clear();
        state.error_base = state.next_error;
        state.counters = ErrorCounters::default();
        info!(dropped, "cleared log index");
    }
}

impl Default for LogIndex {
    fn default() -> Self {
        Self::new(Classifier::default(), DEFAULT_HIDDEN_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framer::LineFramer;
    use chrono::Utc;

    fn framed(text: &str) -> FramedLine {
        FramedLine {
            timestamp: Utc::now(),
            text: text.to_string(),
        }
    }

    fn ingest_chunks(index: &LogIndex, chunks: &[&str]) {
        let mut framer = LineFramer::new();
        for chunk in chunks {
            for line in framer.push(chunk.as_bytes(), Utc::now()) {
                index.ingest(line);
            }
        }
    }

    #[test]
    fn test_connection_attempt_scenario() {
        let index = LogIndex::default();
        ingest_chunks(
            &index,
            &["Connection attempt 6\n", "Connection attempt 7\nERROR: boom\n"],
        );

        let visible = index.visible();
        assert_eq!(visible.len(), 3);

        let errors = index.errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].category, ErrorCategory::ConnectionThreshold);
        assert_eq!(errors[0].text, "Connection attempt 7");
        assert_eq!(errors[1].category, ErrorCategory::Error);
        assert!(errors.iter().all(|e| e.source_sequence != visible[0].sequence));

        let counters = index.counters();
        assert_eq!(counters.connection, 1);
        assert_eq!(counters.error, 1);
        assert_eq!(counters.total(), 2);
    }

    #[test]
    fn test_suppressed_line_is_hidden() {
        let index = LogIndex::new(Classifier::new("[HIDDEN] error"), 10);
        let routed = index.ingest(framed("[HIDDEN] error"));
        assert!(matches!(routed, Routed::Hidden(_)));
        assert!(index.is_empty());
        assert_eq!(index.counters().total(), 0);
        assert_eq!(index.hidden().len(), 1);
        assert_eq!(
            index.hidden_line(0).map(|l| l.text.clone()),
            Some("[HIDDEN] error".to_string())
        );
    }

    #[test]
    fn test_hidden_has_own_sequence_space() {
        let index = LogIndex::default();
        index.ingest(framed("visible"));
        let routed = index.ingest(framed("[HIDDEN] ping"));
        match routed {
            Routed::Hidden(line) => assert_eq!(line.sequence, 0),
            other => panic!("expected hidden, got {:?}", other),
        }
        match index.ingest(framed("visible again")) {
            Routed::Visible { line, .. } => assert_eq!(line.sequence, 1),
            other => panic!("expected visible, got {:?}", other),
        }
    }

    #[test]
    fn test_source_of_resolves_after_more_appends() {
        let index = LogIndex::default();
        index.ingest(framed("boot"));
        index.ingest(framed("sensor failed"));
        for i in 0..500 {
            index.ingest(framed(&format!("tick {}", i)));
        }
        let record = index.errors()[0].clone();
        let source = index.source_of(&record).unwrap();
        assert_eq!(source.text, "sensor failed");
        assert_eq!(index.classifier().classify(&source.text), Some(record.category));
    }

    #[test]
    fn test_reclassify_matches_incremental() {
        let index = LogIndex::default();
        for text in ["a", "error b", "c", "warn d", "unexpected e", "exception f"] {
            index.ingest(framed(text));
        }
        assert_eq!(index.reclassify(), index.errors());
        assert_eq!(index.reclassify(), index.reclassify());
    }

    #[test]
    fn test_clear_resets_everything() {
        let index = LogIndex::default();
        index.ingest(framed("error a"));
        index.ingest(framed("[HIDDEN] b"));
        index.clear();

        let snapshot = index.snapshot();
        assert!(snapshot.visible.is_empty());
        assert!(snapshot.errors.is_empty());
        assert_eq!(snapshot.counters, ErrorCounters::default());
        assert_eq!(snapshot.hidden_len, 0);

        index.ingest(framed("error c"));
        let errors = index.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].sequence, 1);
        assert_eq!(errors[0].source_sequence, 1);
        assert_eq!(index.reclassify(), errors);
    }

    #[test]
    fn test_clear_is_atomic_with_concurrent_ingest() {
        let index = LogIndex::default();
        let writer = {
            let index = index.clone();
            std::thread::spawn(move || {
                for i in 0..2000 {
                    index.ingest(framed(&format!("error {}", i)));
                }
            })
        };
        for _ in 0..50 {
            index.clear();
            let snapshot = index.snapshot();
            // Every visible line here is an error, so the tallies must agree
            assert_eq!(snapshot.visible.len(), snapshot.errors.len());
            assert_eq!(snapshot.counters.error, snapshot.errors.len());
        }
        writer.join().unwrap();
    }
}
