//! A2A backend protocol: wire types, streaming client, and the translator
//! that turns A2A frames into AG-UI events.

mod client;
mod translator;
mod types;

pub use client::{A2aClient, A2aStream};
pub use translator::A2aTranslator;
pub use types::{
    first_text, A2aFrame, A2aMessage, Artifact, Part, Task, TaskArtifactUpdate, TaskStatus,
    TaskStatusUpdate,
};
