//! services/api/src/web/protocol.rs
//!
//! Defines the push-channel message protocol between the server and connected
//! browser clients. The stream is one-way: clients only listen.

use serde::Serialize;
use studio_core::domain::{Generation, Project};

/// An event broadcast to every connected observer, serialized as
/// `{"type": <kind>, "data": <payload>}`.
///
/// Events for a single generation are emitted in lifecycle order: zero or more
/// `generation_progress` entries followed by exactly one terminal
/// `generation_completed` or `generation_error`.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A project was created through the REST layer.
    ProjectCreated(Project),

    /// A project was updated through the REST layer.
    ProjectUpdated(Project),

    /// A project was deleted; only the id remains.
    ProjectDeleted { id: i32 },

    /// A generation record was created and its job handed to the executor.
    GenerationStarted(Generation),

    /// A progress mutation on a running generation.
    GenerationProgress(Generation),

    /// Terminal success, carrying the finished generation with its result.
    GenerationCompleted(Generation),

    /// Terminal failure, carrying the generation with its error message.
    GenerationError(Generation),
}
