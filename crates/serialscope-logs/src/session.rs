use std::sync::Arc;

use chrono::Utc;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use serialscope_serial::{Connection, Transport};
use serialscope_types::{ConnectionStatus, SerialSettings};

use crate::framer::{FramedLine, LineFramer};

/// Bytes requested from the transport per read
const READ_BUFFER_SIZE: usize = 4096;

/// Everything a connection task reports, tagged with its connection id
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    Status {
        connection_id: u64,
        address: String,
        status: ConnectionStatus,
    },
    Line {
        connection_id: u64,
        line: FramedLine,
    },
}

impl SessionEvent {
    pub fn connection_id(&self) -> u64 {
        match self {
            SessionEvent::Status { connection_id, .. } | SessionEvent::Line { connection_id, .. } => {
                *connection_id
            }
        }
    }
}

/// Owns the single active source connection
pub struct SessionManager<T: Transport> {
    transport: Arc<T>,

    /// Cancellation token for the running connection task
    cancel: CancellationToken,

    /// Running connection task
    task: Option<JoinHandle<()>>,

    /// Id handed to the most recent connection; 0 means none yet
    generation: u64,

    address: Option<String>,
}

impl<T: Transport> SessionManager<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            cancel: CancellationToken::new(),
            task: None,
            generation: 0,
            address: None,
        }
    }

    /// Replace the active connection with one to `address`
    ///
    /// The previous connection is torn down and awaited first, so its final
    /// flushed line is already on `event_tx` before anything from the new one.
    /// Returns the id the new connection's events carry.
    pub async fn connect(
        &mut self,
        address: &str,
        settings: &SerialSettings,
        event_tx: mpsc::UnboundedSender<SessionEvent>,
    ) -> u64 {
        self.disconnect().await;

        self.generation += 1;
        self.cancel = CancellationToken::new();
        self.address = Some(address.to_string());

        info!(
            connection = self.generation,
            address,
            settings = %settings.summary(),
            "opening connection"
        );

        self.task = Some(tokio::spawn(run_connection(
            Arc::clone(&self.transport),
            self.generation,
            address.to_string(),
            settings.clone(),
            event_tx,
            self.cancel.clone(),
        )));

        self.generation
    }

    /// Cancel the active connection and wait for its teardown
    pub async fn disconnect(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "connection task ended abnormally");
            }
        }
    }

    /// Id of the most recent connection (superseded events carry older ids)
    pub fn current_connection(&self) -> u64 {
        self.generation
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl<T: Transport> Drop for SessionManager<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_connection<T: Transport>(
    transport: Arc<T>,
    connection_id: u64,
    address: String,
    settings: SerialSettings,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
    cancel: CancellationToken,
) {
    let status = |status: ConnectionStatus| {
        let _ = event_tx.send(SessionEvent::Status {
            connection_id,
            address: address.clone(),
            status,
        });
    };

    status(ConnectionStatus::Connecting);

    let opened = tokio::select! {
        _ = cancel.cancelled() => {
            status(ConnectionStatus::Disconnected);
            return;
        }
        result = transport.connect(&address, &settings) => result,
    };

    let mut conn = match opened {
        Ok(conn) => conn,
        Err(e) => {
            warn!(connection = connection_id, error = %e, "open failed");
            status(ConnectionStatus::Error(e.to_string()));
            return;
        }
    };

    status(ConnectionStatus::Connected);

    let mut framer = LineFramer::new();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    let outcome = loop {
        tokio::select! {
            _ = cancel.cancelled() => break Ok(()),

            read = conn.read(&mut buf) => {
                match read {
                    Ok(0) => {
                        debug!(connection = connection_id, "end of stream");
                        break Ok(());
                    }
                    Ok(n) => {
                        let lines = framer.push(&buf[..n], Utc::now());
                        let delivered = lines.into_iter().all(|line| {
                            event_tx
                                .send(SessionEvent::Line { connection_id, line })
                                .is_ok()
                        });
                        if !delivered {
                            // Receiver gone, nobody left to report to
                            break Ok(());
                        }
                    }
                    Err(e) => break Err(e),
                }
            }
        }
    };

    if let Some(line) = framer.flush(Utc::now()) {
        let _ = event_tx.send(SessionEvent::Line { connection_id, line });
    }

    if let Err(e) = conn.release() {
        warn!(connection = connection_id, error = %e, "failed to release control lines");
    }

    if let Err(e) = outcome {
        warn!(connection = connection_id, error = %e, "read failed");
        status(ConnectionStatus::Error(e.to_string()));
    }

    info!(connection = connection_id, "connection closed");
    status(ConnectionStatus::Disconnected);
}
