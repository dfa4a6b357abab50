use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, trace};

use serialscope_types::{ConnectionStatus, LineEvent, LogLine, Telemetry};

use crate::classify::{Classifier, DEFAULT_SUPPRESSED_PATTERN};
use crate::engine::{DEFAULT_HIDDEN_CAPACITY, LogIndex, Routed};
use crate::export::{ExportError, write_export};
use crate::fanout::{DEFAULT_FANOUT_CAPACITY, FanoutHub, StatusEvent};
use crate::framer::FramedLine;
use crate::session::SessionEvent;
use crate::telemetry::TelemetryExtractor;
use crate::view::{ViewRegistry, ViewSpec};

/// Tunables for building a [`Pipeline`]
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub suppressed_pattern: String,
    pub hidden_capacity: usize,
    pub fanout_capacity: usize,
    /// Views added to (or replacing) the stock set
    pub views: Vec<ViewSpec>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            suppressed_pattern: DEFAULT_SUPPRESSED_PATTERN.to_string(),
            hidden_capacity: DEFAULT_HIDDEN_CAPACITY,
            fanout_capacity: DEFAULT_FANOUT_CAPACITY,
            views: Vec::new(),
        }
    }
}

/// What a session event turned into
#[derive(Clone, Debug, PartialEq)]
pub enum PipelineUpdate {
    Line {
        routed: Routed,
        telemetry_changed: bool,
    },
    Status {
        address: String,
        status: ConnectionStatus,
    },
}

/// Ingestion pipeline: index, views, telemetry and fan-out wired together
pub struct Pipeline {
    index: LogIndex,
    views: ViewRegistry,
    telemetry: Mutex<TelemetryExtractor>,
    fanout: FanoutHub,

    /// Events from any other connection are stale
    active_connection: AtomicU64,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let mut views = ViewRegistry::with_defaults();
        for spec in config.views {
            views.upsert(spec);
        }

        Self {
            index: LogIndex::new(
                Classifier::new(config.suppressed_pattern),
                config.hidden_capacity,
            ),
            views,
            telemetry: Mutex::new(TelemetryExtractor::new()),
            fanout: FanoutHub::new(config.fanout_capacity),
            active_connection: AtomicU64::new(0),
        }
    }

    /// Accept events from connection `id` only
    pub fn set_active_connection(&self, id: u64) {
        self.active_connection.store(id, Ordering::SeqCst);
    }

    /// Apply one session event, dropping it if it belongs to a superseded connection
    pub fn handle_event(&self, event: SessionEvent) -> Option<PipelineUpdate> {
        let active = self.active_connection.load(Ordering::SeqCst);
        if event.connection_id() != active {
            trace!(
                connection = event.connection_id(),
                active,
                "dropping stale session event"
            );
            return None;
        }

        match event {
            SessionEvent::Line { line, .. } => {
                let (routed, telemetry_changed) = self.ingest_line(line);
                Some(PipelineUpdate::Line {
                    routed,
                    telemetry_changed,
                })
            }
            SessionEvent::Status {
                connection_id,
                address,
                status,
            } => {
                debug!(connection = connection_id, status = status.label(), "status");
                self.fanout.publish_status(StatusEvent {
                    connection_id,
                    address: address.clone(),
                    status: status.clone(),
                });
                Some(PipelineUpdate::Status { address, status })
            }
        }
    }

    /// Route one framed line through the index, telemetry and fan-out
    pub fn ingest(&self, framed: FramedLine) -> Routed {
        self.ingest_line(framed).0
    }

    fn ingest_line(&self, framed: FramedLine) -> (Routed, bool) {
        let routed = self.index.ingest(framed);
        let mut changed = false;
        if let Routed::Visible { line, .. } = &routed {
            changed = self.telemetry.lock().observe(&line.text);
            self.fanout.publish(LineEvent::from(line.as_ref()));
        }
        (routed, changed)
    }

    /// Evaluate a named view over the current store
    pub fn view(&self, name: &str) -> Vec<Arc<LogLine>> {
        self.views.evaluate(name, &self.index.visible())
    }

    pub fn index(&self) -> &LogIndex {
        &self.index
    }

    pub fn views(&self) -> &ViewRegistry {
        &self.views
    }

    pub fn fanout(&self) -> &FanoutHub {
        &self.fanout
    }

    pub fn telemetry(&self) -> Telemetry {
        self.telemetry.lock().values().clone()
    }

    /// Drop every line, record and derived value
    pub fn clear(&self) {
        self.index.clear();
        self.telemetry.lock().reset();
    }

    /// Write a view's current output to `path`
    pub fn export_view(&self, name: &str, path: &Path) -> Result<usize, ExportError> {
        write_export(path, &self.view(name))
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fanout::Delivery;
    use crate::view::ViewKind;
    use chrono::Utc;
    use serialscope_types::{ErrorCategory, Mode};

    fn line(connection_id: u64, text: &str) -> SessionEvent {
        SessionEvent::Line {
            connection_id,
            line: FramedLine {
                timestamp: Utc::now(),
                text: text.to_string(),
            },
        }
    }

    #[test]
    fn test_stale_connection_dropped() {
        let pipeline = Pipeline::default();
        pipeline.set_active_connection(2);

        assert!(pipeline.handle_event(line(1, "old")).is_none());
        assert!(pipeline.handle_event(line(2, "new")).is_some());

        let texts: Vec<String> = pipeline.view("full").iter().map(|l| l.text.clone()).collect();
        assert_eq!(texts, vec!["new"]);
    }

    #[test]
    fn test_visible_lines_reach_subscribers_hidden_do_not() {
        let pipeline = Pipeline::default();
        let mut sub = pipeline.fanout().subscribe_lines();
        pipeline.set_active_connection(1);

        pipeline.handle_event(line(1, "[HIDDEN]"));
        pipeline.handle_event(line(1, "ERROR: boom"));

        match sub.try_recv() {
            Some(Delivery::Item(event)) => {
                assert_eq!(event.text, "ERROR: boom");
                assert_eq!(event.sequence, 0);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(sub.try_recv().is_none());
        assert_eq!(pipeline.index().counters().get(ErrorCategory::Error), 1);
        assert_eq!(pipeline.index().hidden().len(), 1);
    }

    #[test]
    fn test_telemetry_follows_visible_lines() {
        let pipeline = Pipeline::default();
        pipeline.set_active_connection(1);

        let update = pipeline.handle_event(line(1, r#"{"mode": 2}"#));
        assert!(matches!(
            update,
            Some(PipelineUpdate::Line {
                telemetry_changed: true,
                ..
            })
        ));
        assert_eq!(pipeline.telemetry().mode, Some(Mode::Cool));

        pipeline.clear();
        assert_eq!(pipeline.telemetry(), Telemetry::default());
        assert!(pipeline.view("full").is_empty());
    }

    #[test]
    fn test_config_views_override_defaults() {
        let pipeline = Pipeline::new(PipelineConfig {
            views: vec![ViewSpec::new(
                "wifi",
                ViewKind::Keyword {
                    keyword: "WLAN".to_string(),
                },
            )],
            ..PipelineConfig::default()
        });
        pipeline.ingest(FramedLine {
            timestamp: Utc::now(),
            text: "wifi up".to_string(),
        });
        pipeline.ingest(FramedLine {
            timestamp: Utc::now(),
            text: "wlan up".to_string(),
        });

        let texts: Vec<String> = pipeline.view("wifi").iter().map(|l| l.text.clone()).collect();
        assert_eq!(texts, vec!["wlan up"]);
    }

    #[test]
    fn test_status_is_published() {
        let pipeline = Pipeline::default();
        let mut sub = pipeline.fanout().subscribe_status();
        pipeline.set_active_connection(3);

        pipeline.handle_event(SessionEvent::Status {
            connection_id: 3,
            address: "/dev/ttyUSB0".to_string(),
            status: ConnectionStatus::Connected,
        });

        match sub.try_recv() {
            Some(Delivery::Item(event)) => {
                assert_eq!(event.connection_id, 3);
                assert_eq!(event.status, ConnectionStatus::Connected);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
