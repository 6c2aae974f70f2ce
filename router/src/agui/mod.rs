//! AG-UI upstream protocol: SSE parsing and the agent client.

mod client;
mod sse;

pub use client::{parse_event, AguiClient};
pub use sse::{SseFrame, SseParser};
