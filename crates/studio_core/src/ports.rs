//! crates/studio_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or model
//! providers.

use async_trait::async_trait;

use crate::domain::{
    Generation, GenerationPatch, NewGeneration, NewProject, NewUser, Project, ProjectPatch, User,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    Invalid(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Repository of users, projects and generations.
///
/// Project and generation ids are monotonic integers assigned by the store;
/// user ids are strings. Mutations go through the explicit `*Patch` structs,
/// and lookups of absent ids surface as `PortError::NotFound`, never panics.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    // --- User Management ---

    /// Inserts the user under the given id if absent, otherwise returns the
    /// existing record unchanged. Used to seed the singleton demo user.
    async fn ensure_user(&self, id: &str, user: NewUser) -> PortResult<User>;

    async fn get_user(&self, id: &str) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<User>;

    /// Creates a user with a server-assigned id. Fails with
    /// `PortError::Invalid` when the email is already taken.
    async fn create_user(&self, user: NewUser) -> PortResult<User>;

    // --- Project Management ---

    /// All projects owned by `user_id`, ordered by `updated_at` descending.
    async fn get_projects(&self, user_id: &str) -> PortResult<Vec<Project>>;

    async fn get_project(&self, id: i32) -> PortResult<Project>;

    /// Assigns the next id, stamps timestamps, defaults status to `Draft` and
    /// progress to 0. Returns the full entity.
    async fn create_project(&self, project: NewProject) -> PortResult<Project>;

    /// Merges the patch into the existing project and recomputes `updated_at`.
    async fn update_project(&self, id: i32, patch: ProjectPatch) -> PortResult<Project>;

    /// Removes the project, returning whether it existed. Does not cascade to
    /// the project's generations.
    async fn delete_project(&self, id: i32) -> PortResult<bool>;

    // --- Generation Management ---

    /// All generations owned by `user_id`, ordered by `created_at` descending.
    async fn get_generations(&self, user_id: &str) -> PortResult<Vec<Generation>>;

    async fn get_generation(&self, id: i32) -> PortResult<Generation>;

    /// Assigns the next id, stamps `created_at`, defaults status to `Pending`
    /// with progress 0 and a null `completed_at`.
    async fn create_generation(&self, generation: NewGeneration) -> PortResult<Generation>;

    /// Merges the patch into the existing generation. A patch that sets the
    /// status to `Completed` forces `completed_at = now()` regardless of the
    /// caller; any other patch preserves the prior value (subject to
    /// `StorePolicy::stamp_completed_at_on_error`).
    async fn update_generation(&self, id: i32, patch: GenerationPatch) -> PortResult<Generation>;

    /// The subset with status in {pending, processing} for `user_id`, ordered
    /// by `created_at` descending.
    async fn get_active_generations(&self, user_id: &str) -> PortResult<Vec<Generation>>;
}

/// A single call to an external generative model.
#[async_trait]
pub trait ContentGenerationService: Send + Sync {
    /// Sends the structured prompt pair to the model and returns the raw text
    /// of its reply, which is expected (but not guaranteed) to be JSON.
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> PortResult<String>;
}
