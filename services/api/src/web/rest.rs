//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::{
    generation::{
        run_generation, GenerateAnalysisRequest, GenerateMovieRequest, GenerateMusicRequest,
        GenerateVoiceRequest, JobSpec,
    },
    protocol::ServerEvent,
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use studio_core::domain::{
    ContentType, Generation, GenerationPatch, GenerationStatus, NewGeneration, NewProject, Project,
    ProjectPatch, ProjectStatus, User,
};
use studio_core::ports::PortError;
use tracing::error;
use utoipa::{OpenApi, ToSchema};

/// The singleton demo account every request operates as; there is no auth model.
pub const DEFAULT_USER_ID: &str = "standalone-user";

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        get_current_user_handler,
        list_projects_handler,
        get_project_handler,
        create_project_handler,
        update_project_handler,
        delete_project_handler,
        list_generations_handler,
        list_active_generations_handler,
        generate_movie_handler,
        generate_music_handler,
        generate_voice_handler,
        generate_analysis_handler,
    ),
    components(
        schemas(
            User,
            Project,
            Generation,
            ContentType,
            ProjectStatus,
            GenerationStatus,
            ProjectPatch,
            CreateProjectRequest,
            GenerateMovieRequest,
            GenerateMusicRequest,
            GenerateVoiceRequest,
            GenerateAnalysisRequest,
            StartGenerationResponse,
        )
    ),
    tags(
        (name = "Content Studio API", description = "Projects and AI generation jobs with live progress over WebSocket.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The request payload for creating a project.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ContentType,
    pub description: Option<String>,
    pub quality: Option<String>,
    pub duration: Option<String>,
    pub settings: Option<Value>,
}

/// The response payload returned by every generate endpoint.
#[derive(Debug, serde::Serialize, ToSchema)]
pub struct StartGenerationResponse {
    pub generation: Generation,
}

/// Maps a port error onto HTTP: 404 for missing ids, 400 for bad input,
/// 500 (with the detail logged, not leaked) otherwise.
fn port_error_response(e: PortError) -> (StatusCode, String) {
    match e {
        PortError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        PortError::Invalid(message) => (StatusCode::BAD_REQUEST, message),
        PortError::Unexpected(message) => {
            error!("Unexpected port error: {}", message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

//=========================================================================================
// User Handlers
//=========================================================================================

/// Returns the current (singleton, demo) user.
#[utoipa::path(
    get,
    path = "/auth/user",
    responses(
        (status = 200, description = "The current user", body = User),
        (status = 404, description = "Default user missing")
    )
)]
pub async fn get_current_user_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user = app_state
        .store
        .get_user(DEFAULT_USER_ID)
        .await
        .map_err(port_error_response)?;
    Ok(Json(user))
}

//=========================================================================================
// Project Handlers
//=========================================================================================

/// Lists the current user's projects, most recently updated first.
#[utoipa::path(
    get,
    path = "/projects",
    responses((status = 200, description = "All projects for the current user", body = [Project]))
)]
pub async fn list_projects_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let projects = app_state
        .store
        .get_projects(DEFAULT_USER_ID)
        .await
        .map_err(port_error_response)?;
    Ok(Json(projects))
}

/// Fetches a single project by id.
#[utoipa::path(
    get,
    path = "/projects/{id}",
    params(("id" = i32, Path, description = "Project id")),
    responses(
        (status = 200, description = "The project", body = Project),
        (status = 404, description = "Project not found")
    )
)]
pub async fn get_project_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let project = app_state
        .store
        .get_project(id)
        .await
        .map_err(port_error_response)?;
    Ok(Json(project))
}

/// Creates a draft project for the current user.
#[utoipa::path(
    post,
    path = "/projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = Project),
        (status = 400, description = "Invalid project data")
    )
)]
pub async fn create_project_handler(
    State(app_state): State<Arc<AppState>>,
    Json(body): Json<CreateProjectRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if body.title.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "title is required".to_string()));
    }

    let project = app_state
        .store
        .create_project(NewProject {
            user_id: DEFAULT_USER_ID.to_string(),
            title: body.title,
            description: body.description,
            kind: body.kind,
            quality: body.quality,
            duration: body.duration,
            settings: body.settings,
        })
        .await
        .map_err(port_error_response)?;

    app_state
        .broadcaster
        .broadcast(&ServerEvent::ProjectCreated(project.clone()));
    Ok((StatusCode::CREATED, Json(project)))
}

/// Applies a partial update to a project.
#[utoipa::path(
    patch,
    path = "/projects/{id}",
    params(("id" = i32, Path, description = "Project id")),
    request_body = ProjectPatch,
    responses(
        (status = 200, description = "Updated project", body = Project),
        (status = 400, description = "Invalid patch"),
        (status = 404, description = "Project not found")
    )
)]
pub async fn update_project_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(patch): Json<ProjectPatch>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let project = app_state
        .store
        .update_project(id, patch)
        .await
        .map_err(port_error_response)?;

    app_state
        .broadcaster
        .broadcast(&ServerEvent::ProjectUpdated(project.clone()));
    Ok(Json(project))
}

/// Deletes a project. Its generations are left in place.
#[utoipa::path(
    delete,
    path = "/projects/{id}",
    params(("id" = i32, Path, description = "Project id")),
    responses(
        (status = 204, description = "Project deleted"),
        (status = 404, description = "Project not found")
    )
)]
pub async fn delete_project_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let existed = app_state
        .store
        .delete_project(id)
        .await
        .map_err(port_error_response)?;
    if !existed {
        return Err((StatusCode::NOT_FOUND, "Project not found".to_string()));
    }

    app_state
        .broadcaster
        .broadcast(&ServerEvent::ProjectDeleted { id });
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Generation Handlers
//=========================================================================================

/// Lists the current user's generations, newest first.
#[utoipa::path(
    get,
    path = "/generations",
    responses((status = 200, description = "All generations for the current user", body = [Generation]))
)]
pub async fn list_generations_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let generations = app_state
        .store
        .get_generations(DEFAULT_USER_ID)
        .await
        .map_err(port_error_response)?;
    Ok(Json(generations))
}

/// Lists generations still pending or processing, newest first.
#[utoipa::path(
    get,
    path = "/generations/active",
    responses((status = 200, description = "In-flight generations for the current user", body = [Generation]))
)]
pub async fn list_active_generations_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let generations = app_state
        .store
        .get_active_generations(DEFAULT_USER_ID)
        .await
        .map_err(port_error_response)?;
    Ok(Json(generations))
}

/// Starts a movie generation job.
#[utoipa::path(
    post,
    path = "/generate/movie",
    request_body = GenerateMovieRequest,
    responses(
        (status = 200, description = "Generation created and launched", body = StartGenerationResponse),
        (status = 400, description = "Missing required field"),
        (status = 404, description = "Project not found")
    )
)]
pub async fn generate_movie_handler(
    State(app_state): State<Arc<AppState>>,
    Json(body): Json<GenerateMovieRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    start_generation(app_state, JobSpec::Movie(body)).await
}

/// Starts a music generation job.
#[utoipa::path(
    post,
    path = "/generate/music",
    request_body = GenerateMusicRequest,
    responses(
        (status = 200, description = "Generation created and launched", body = StartGenerationResponse),
        (status = 400, description = "Missing required field"),
        (status = 404, description = "Project not found")
    )
)]
pub async fn generate_music_handler(
    State(app_state): State<Arc<AppState>>,
    Json(body): Json<GenerateMusicRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    start_generation(app_state, JobSpec::Music(body)).await
}

/// Starts a voice generation job.
#[utoipa::path(
    post,
    path = "/generate/voice",
    request_body = GenerateVoiceRequest,
    responses(
        (status = 200, description = "Generation created and launched", body = StartGenerationResponse),
        (status = 400, description = "Missing required field"),
        (status = 404, description = "Project not found")
    )
)]
pub async fn generate_voice_handler(
    State(app_state): State<Arc<AppState>>,
    Json(body): Json<GenerateVoiceRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    start_generation(app_state, JobSpec::Voice(body)).await
}

/// Starts an analysis generation job.
#[utoipa::path(
    post,
    path = "/generate/analysis",
    request_body = GenerateAnalysisRequest,
    responses(
        (status = 200, description = "Generation created and launched", body = StartGenerationResponse),
        (status = 400, description = "Missing required field"),
        (status = 404, description = "Project not found")
    )
)]
pub async fn generate_analysis_handler(
    State(app_state): State<Arc<AppState>>,
    Json(body): Json<GenerateAnalysisRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    start_generation(app_state, JobSpec::Analysis(body)).await
}

/// The shared "start generation" operation.
///
/// Creates the pending generation, flips the project to `generating`, emits
/// `generation_started`, hands the job to the registry and returns the record
/// immediately. This function never waits on the model.
async fn start_generation(
    app_state: Arc<AppState>,
    spec: JobSpec,
) -> Result<(StatusCode, Json<StartGenerationResponse>), (StatusCode, String)> {
    let required_field = match &spec {
        JobSpec::Movie(_) => "script",
        JobSpec::Music(_) => "lyrics",
        JobSpec::Voice(_) => "text",
        JobSpec::Analysis(_) => "content",
    };
    if spec.prompt_text().trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("{} is required", required_field),
        ));
    }

    // The project must exist when the generation is created; afterwards the
    // reference is allowed to dangle.
    let project = app_state
        .store
        .get_project(spec.project_id())
        .await
        .map_err(port_error_response)?;

    let generation = app_state
        .store
        .create_generation(NewGeneration {
            project_id: project.id,
            user_id: DEFAULT_USER_ID.to_string(),
            kind: spec.content_type(),
            prompt: spec.prompt_text().to_string(),
            model: app_state.config.generation_model.clone(),
        })
        .await
        .map_err(port_error_response)?;

    if let Err(e) = app_state
        .store
        .update_project(
            project.id,
            ProjectPatch {
                status: Some(ProjectStatus::Generating),
                ..Default::default()
            },
        )
        .await
    {
        // The project vanished between the lookup and the flip. The generation
        // was already created but will never be spawned; close it out so it
        // does not sit in the active listing forever.
        match app_state
            .store
            .update_generation(
                generation.id,
                GenerationPatch {
                    status: Some(GenerationStatus::Error),
                    error: Some("Project was deleted before generation could start".to_string()),
                    ..Default::default()
                },
            )
            .await
        {
            Ok(failed) => app_state
                .broadcaster
                .broadcast(&ServerEvent::GenerationError(failed)),
            Err(close_err) => error!(
                "Failed to close out generation {} after project flip failed: {}",
                generation.id, close_err
            ),
        }
        return Err(port_error_response(e));
    }

    app_state
        .broadcaster
        .broadcast(&ServerEvent::GenerationStarted(generation.clone()));

    let generation_id = generation.id;
    let task_state = app_state.clone();
    app_state.jobs.clone().spawn(generation_id, move |token| {
        run_generation(task_state, generation_id, spec, token)
    });

    Ok((StatusCode::OK, Json(StartGenerationResponse { generation })))
}
