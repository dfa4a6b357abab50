use std::future::Future;

use tokio::io::AsyncRead;

use serialscope_types::SerialSettings;

/// Failures surfaced by a transport
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to open {address}: {message}")]
    Open { address: String, message: String },

    #[error("failed to enumerate ports: {0}")]
    Enumerate(String),

    #[error("failed to release control lines: {0}")]
    ControlLines(String),

    #[error("transport i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// An open byte source
pub trait Connection: AsyncRead + Send + Unpin {
    /// Drop any control-line state held by the connection before it closes
    fn release(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Opens connections to a device address
pub trait Transport: Send + Sync + 'static {
    type Conn: Connection + 'static;

    /// Open `address` with the given framing parameters
    fn connect(
        &self,
        address: &str,
        settings: &SerialSettings,
    ) -> impl Future<Output = Result<Self::Conn, TransportError>> + Send;
}
