//! AG-UI protocol wire types: event sum type + chat request models.
//!
//! This crate defines the wire shape of AG-UI events and the ingress/egress
//! request bodies. It does not depend on the router core; the router parses
//! upstream frames into [`AguiEvent`] and the HTTP layer frames them as SSE.

pub mod event;
pub mod request;

pub use event::{
    AguiEvent, RunError, RunFinished, RunStarted, TextMessageContent, TextMessageEnd,
    TextMessageStart, EVENT_RUN_ERROR, EVENT_RUN_FINISHED, EVENT_RUN_STARTED,
    EVENT_TEXT_MESSAGE_CONTENT, EVENT_TEXT_MESSAGE_END, EVENT_TEXT_MESSAGE_START,
};
pub use request::{
    ChatMessage, ChatRequest, ContentPart, MessageContent, RequestError, RunAgentInput,
    MAX_MESSAGES, MAX_THREAD_ID_LEN,
};
