//! Observability: structured audit records and the stream buffer.

mod audit;
mod buffer;

pub use audit::{log_system_event, AuditLogger, AUDIT_TARGET};
pub use buffer::{BufferedMessage, StreamBuffer, StreamFrame};
