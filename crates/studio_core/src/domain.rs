//! crates/studio_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database; serde derives exist only to
//! fix the wire names (camelCase, `type` for the content kind) used by the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

//=========================================================================================
// Enumerations
//=========================================================================================

/// The kind of content a project (and its generations) produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Movie,
    Music,
    Voice,
    Analysis,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Movie => "movie",
            ContentType::Music => "music",
            ContentType::Voice => "voice",
            ContentType::Analysis => "analysis",
        }
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(ContentType::Movie),
            "music" => Ok(ContentType::Music),
            "voice" => Ok(ContentType::Voice),
            "analysis" => Ok(ContentType::Analysis),
            other => Err(format!("'{}' is not a valid content type", other)),
        }
    }
}

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Draft,
    Generating,
    Completed,
    Error,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::Generating => "generating",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Error => "error",
        }
    }
}

impl std::str::FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ProjectStatus::Draft),
            "generating" => Ok(ProjectStatus::Generating),
            "completed" => Ok(ProjectStatus::Completed),
            "error" => Ok(ProjectStatus::Error),
            other => Err(format!("'{}' is not a valid project status", other)),
        }
    }
}

/// Lifecycle status of a single generation job.
///
/// Transitions run `pending -> processing -> completed | error`; the two
/// terminal states never advance further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl GenerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Pending => "pending",
            GenerationStatus::Processing => "processing",
            GenerationStatus::Completed => "completed",
            GenerationStatus::Error => "error",
        }
    }

    /// Whether the job is still in flight (counts toward "active" listings).
    pub fn is_active(&self) -> bool {
        matches!(self, GenerationStatus::Pending | GenerationStatus::Processing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationStatus::Completed | GenerationStatus::Error)
    }
}

impl std::str::FromStr for GenerationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(GenerationStatus::Pending),
            "processing" => Ok(GenerationStatus::Processing),
            "completed" => Ok(GenerationStatus::Completed),
            "error" => Ok(GenerationStatus::Error),
            other => Err(format!("'{}' is not a valid generation status", other)),
        }
    }
}

//=========================================================================================
// Entities
//=========================================================================================

/// Represents an account that owns projects and generations.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user-owned unit of work with a target content type and lifecycle status.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i32,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: ContentType,
    pub status: ProjectStatus,
    /// Percentage in `[0, 100]`; only reaches 100 together with `Completed`.
    pub progress: i32,
    pub quality: Option<String>,
    pub duration: Option<String>,
    pub content: Option<Value>,
    pub settings: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One asynchronous model invocation attempt tied to a project.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Generation {
    pub id: i32,
    /// The owning project. Not enforced after creation: deleting the project
    /// leaves its generations behind with a dangling reference.
    pub project_id: i32,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: ContentType,
    pub prompt: String,
    pub model: String,
    pub status: GenerationStatus,
    pub progress: i32,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Set when the job completes successfully; stamping it on `Error` too is a
    /// store policy decision (see `StorePolicy`).
    pub completed_at: Option<DateTime<Utc>>,
}

//=========================================================================================
// Insert and Patch Payloads
//=========================================================================================

/// Fields the caller supplies when creating a user; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Fields the caller supplies when creating a project; the store assigns the
/// id and timestamps and defaults the status to `Draft` with progress 0.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub kind: ContentType,
    pub quality: Option<String>,
    pub duration: Option<String>,
    pub settings: Option<Value>,
}

/// Fields the caller supplies when creating a generation record.
#[derive(Debug, Clone)]
pub struct NewGeneration {
    pub project_id: i32,
    pub user_id: String,
    pub kind: ContentType,
    pub prompt: String,
    pub model: String,
}

/// The exact set of project fields a partial update is permitted to change.
/// Absent fields are left untouched; `updated_at` is always recomputed.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub progress: Option<i32>,
    pub quality: Option<String>,
    pub duration: Option<String>,
    pub content: Option<Value>,
    pub settings: Option<Value>,
}

impl ProjectPatch {
    /// Checks the patch for out-of-range values before any merge happens.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(progress) = self.progress {
            if !(0..=100).contains(&progress) {
                return Err(format!("progress must be within 0..=100, got {}", progress));
            }
        }
        Ok(())
    }
}

/// The exact set of generation fields the state machine may change.
#[derive(Debug, Clone, Default)]
pub struct GenerationPatch {
    pub status: Option<GenerationStatus>,
    pub progress: Option<i32>,
    pub result: Option<Value>,
    pub error: Option<String>,
}

//=========================================================================================
// Store Policy
//=========================================================================================

/// Tunable store behavior that the domain leaves open.
#[derive(Debug, Clone, Copy, Default)]
pub struct StorePolicy {
    /// When true, a transition to `GenerationStatus::Error` also stamps
    /// `completed_at`. The default (false) keeps "finished successfully"
    /// distinguishable from "ended".
    pub stamp_completed_at_on_error: bool,
}
