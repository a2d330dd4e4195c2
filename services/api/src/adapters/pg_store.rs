//! services/api/src/adapters/pg_store.rs
//!
//! This module contains the database adapter, a concrete implementation of the
//! `ProjectStore` port backed by PostgreSQL via `sqlx`. It is selected at startup
//! when `DATABASE_URL` is set; otherwise the service runs on `MemStore`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use studio_core::domain::{
    Generation, GenerationPatch, NewGeneration, NewProject, NewUser, Project, ProjectPatch,
    StorePolicy, User,
};
use studio_core::ports::{PortError, PortResult, ProjectStore};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `ProjectStore` port.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    policy: StorePolicy,
}

impl PgStore {
    /// Creates a new `PgStore`.
    pub fn new(pool: PgPool, policy: StorePolicy) -> Self {
        Self { pool, policy }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or(e: sqlx::Error, message: String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(message),
        other => PortError::Unexpected(other.to_string()),
    }
}

/// Maps a unique-constraint violation on the users email column to a
/// validation error; everything else stays unexpected.
fn email_conflict_or(e: sqlx::Error, email: &str) -> PortError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.constraint() == Some("users_email_key") {
            return PortError::Invalid(format!("Email '{}' is already in use", email));
        }
    }
    unexpected(e)
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: String,
    email: String,
    first_name: String,
    last_name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct ProjectRecord {
    id: i32,
    user_id: String,
    title: String,
    description: Option<String>,
    content_type: String,
    status: String,
    progress: i32,
    quality: Option<String>,
    duration: Option<String>,
    content: Option<Value>,
    settings: Option<Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProjectRecord {
    fn to_domain(self) -> PortResult<Project> {
        Ok(Project {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            kind: self.content_type.parse().map_err(PortError::Unexpected)?,
            status: self.status.parse().map_err(PortError::Unexpected)?,
            progress: self.progress,
            quality: self.quality,
            duration: self.duration,
            content: self.content,
            settings: self.settings,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct GenerationRecord {
    id: i32,
    project_id: i32,
    user_id: String,
    content_type: String,
    prompt: String,
    model: String,
    status: String,
    progress: i32,
    result: Option<Value>,
    error: Option<String>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl GenerationRecord {
    fn to_domain(self) -> PortResult<Generation> {
        Ok(Generation {
            id: self.id,
            project_id: self.project_id,
            user_id: self.user_id,
            kind: self.content_type.parse().map_err(PortError::Unexpected)?,
            prompt: self.prompt,
            model: self.model,
            status: self.status.parse().map_err(PortError::Unexpected)?,
            progress: self.progress,
            result: self.result,
            error: self.error,
            created_at: self.created_at,
            completed_at: self.completed_at,
        })
    }
}

const PROJECT_COLUMNS: &str = "id, user_id, title, description, content_type, status, progress, \
     quality, duration, content, settings, created_at, updated_at";

const GENERATION_COLUMNS: &str = "id, project_id, user_id, content_type, prompt, model, status, \
     progress, result, error, created_at, completed_at";

//=========================================================================================
// `ProjectStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ProjectStore for PgStore {
    async fn ensure_user(&self, id: &str, user: NewUser) -> PortResult<User> {
        sqlx::query(
            "INSERT INTO users (id, email, first_name, last_name) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(id)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .execute(&self.pool)
        .await
        .map_err(|e| email_conflict_or(e, &user.email))?;

        self.get_user(id).await
    }

    async fn get_user(&self, id: &str) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, email, first_name, last_name, created_at, updated_at \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, format!("User {} not found", id)))?;

        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, email, first_name, last_name, created_at, updated_at \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, format!("User with email {} not found", email)))?;

        Ok(record.to_domain())
    }

    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        let id = format!("user-{}", Uuid::new_v4());
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, email, first_name, last_name) VALUES ($1, $2, $3, $4) \
             RETURNING id, email, first_name, last_name, created_at, updated_at",
        )
        .bind(&id)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| email_conflict_or(e, &user.email))?;

        Ok(record.to_domain())
    }

    async fn get_projects(&self, user_id: &str) -> PortResult<Vec<Project>> {
        let records = sqlx::query_as::<_, ProjectRecord>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE user_id = $1 \
             ORDER BY updated_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(ProjectRecord::to_domain).collect()
    }

    async fn get_project(&self, id: i32) -> PortResult<Project> {
        let record = sqlx::query_as::<_, ProjectRecord>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, format!("Project {} not found", id)))?;

        record.to_domain()
    }

    async fn create_project(&self, project: NewProject) -> PortResult<Project> {
        let record = sqlx::query_as::<_, ProjectRecord>(&format!(
            "INSERT INTO projects (user_id, title, description, content_type, quality, duration, settings) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {PROJECT_COLUMNS}"
        ))
        .bind(&project.user_id)
        .bind(&project.title)
        .bind(&project.description)
        .bind(project.kind.as_str())
        .bind(&project.quality)
        .bind(&project.duration)
        .bind(&project.settings)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        record.to_domain()
    }

    async fn update_project(&self, id: i32, patch: ProjectPatch) -> PortResult<Project> {
        patch.validate().map_err(PortError::Invalid)?;

        let record = sqlx::query_as::<_, ProjectRecord>(&format!(
            "UPDATE projects SET \
                 title = COALESCE($2, title), \
                 description = COALESCE($3, description), \
                 status = COALESCE($4, status), \
                 progress = COALESCE($5, progress), \
                 quality = COALESCE($6, quality), \
                 duration = COALESCE($7, duration), \
                 content = COALESCE($8, content), \
                 settings = COALESCE($9, settings), \
                 updated_at = now() \
             WHERE id = $1 RETURNING {PROJECT_COLUMNS}"
        ))
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(patch.status.map(|s| s.as_str()))
        .bind(patch.progress)
        .bind(&patch.quality)
        .bind(&patch.duration)
        .bind(&patch.content)
        .bind(&patch.settings)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, format!("Project {} not found", id)))?;

        record.to_domain()
    }

    async fn delete_project(&self, id: i32) -> PortResult<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_generations(&self, user_id: &str) -> PortResult<Vec<Generation>> {
        let records = sqlx::query_as::<_, GenerationRecord>(&format!(
            "SELECT {GENERATION_COLUMNS} FROM generations WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(GenerationRecord::to_domain).collect()
    }

    async fn get_generation(&self, id: i32) -> PortResult<Generation> {
        let record = sqlx::query_as::<_, GenerationRecord>(&format!(
            "SELECT {GENERATION_COLUMNS} FROM generations WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, format!("Generation {} not found", id)))?;

        record.to_domain()
    }

    async fn create_generation(&self, generation: NewGeneration) -> PortResult<Generation> {
        let record = sqlx::query_as::<_, GenerationRecord>(&format!(
            "INSERT INTO generations (project_id, user_id, content_type, prompt, model) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {GENERATION_COLUMNS}"
        ))
        .bind(generation.project_id)
        .bind(&generation.user_id)
        .bind(generation.kind.as_str())
        .bind(&generation.prompt)
        .bind(&generation.model)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        record.to_domain()
    }

    async fn update_generation(&self, id: i32, patch: GenerationPatch) -> PortResult<Generation> {
        let record = sqlx::query_as::<_, GenerationRecord>(&format!(
            "UPDATE generations SET \
                 status = COALESCE($2, status), \
                 progress = COALESCE($3, progress), \
                 result = COALESCE($4, result), \
                 error = COALESCE($5, error), \
                 completed_at = CASE \
                     WHEN $2 = 'completed' THEN now() \
                     WHEN $2 = 'error' AND $6 THEN now() \
                     ELSE completed_at \
                 END \
             WHERE id = $1 RETURNING {GENERATION_COLUMNS}"
        ))
        .bind(id)
        .bind(patch.status.map(|s| s.as_str()))
        .bind(patch.progress)
        .bind(&patch.result)
        .bind(&patch.error)
        .bind(self.policy.stamp_completed_at_on_error)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, format!("Generation {} not found", id)))?;

        record.to_domain()
    }

    async fn get_active_generations(&self, user_id: &str) -> PortResult<Vec<Generation>> {
        let records = sqlx::query_as::<_, GenerationRecord>(&format!(
            "SELECT {GENERATION_COLUMNS} FROM generations \
             WHERE user_id = $1 AND status IN ('pending', 'processing') \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(GenerationRecord::to_domain).collect()
    }
}
