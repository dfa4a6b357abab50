//! Serial transport for serialscope
//!
//! This crate provides the inbound byte source: a transport abstraction and
//! its serial port implementation, plus device discovery.

mod serial;
mod transport;

pub use serial::{SerialConnection, SerialTransport, available_ports};
pub use transport::{Connection, Transport, TransportError};

// Re-export types that are used in our public API
pub use serialscope_types::{DataBits, FlowControl, Parity, PortInfo, SerialSettings, StopBits};
