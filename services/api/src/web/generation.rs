//! services/api/src/web/generation.rs
//!
//! The generation job state machine.
//!
//! Every content type follows the same shape: flip the record to processing,
//! build a type-specific prompt pair, make one model call, parse the reply as
//! JSON, and finalize both the generation and its parent project. The types
//! differ only in their prompt schemas and progress checkpoints, so a single
//! parameterized task drives all four.

use crate::web::{protocol::ServerEvent, state::AppState};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use studio_core::domain::{
    ContentType, Generation, GenerationPatch, GenerationStatus, ProjectPatch, ProjectStatus,
};
use studio_core::ports::{PortError, PortResult};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use utoipa::ToSchema;

//=========================================================================================
// Prompt Templates
//=========================================================================================

const MOVIE_SYSTEM_PROMPT: &str = r#"You are a professional film production AI. Create a comprehensive movie production plan with scene breakdown, cinematography notes, and technical specifications. Respond with JSON in this format:
{
  "scenes": [{"id": "scene_1", "description": "...", "duration": 120, "visualElements": ["..."], "audioElements": ["..."]}],
  "productionNotes": {"cinematography": "...", "visualEffects": ["..."], "audioSpecs": "...", "exportSettings": {}},
  "timeline": [{"timestamp": 0, "event": "...", "description": "..."}],
  "metadata": {"totalDuration": "...", "sceneCount": 0, "quality": "...", "genre": "..."}
}"#;

const MUSIC_SYSTEM_PROMPT: &str = r#"You are a professional music producer. Create a comprehensive music production plan with arrangement, instrumentation, and technical specifications. Respond with JSON in this format:
{
  "arrangement": {"intro": "...", "verse": "...", "chorus": "...", "bridge": "...", "outro": "..."},
  "instrumentation": ["...", "...", "..."],
  "production": {"tempo": 0, "key": "...", "timeSignature": "...", "genre": "...", "style": "..."},
  "timeline": [{"timestamp": 0, "element": "...", "description": "..."}],
  "metadata": {"duration": "...", "genre": "...", "style": "...", "complexity": "..."}
}"#;

const VOICE_SYSTEM_PROMPT: &str = r#"You are a professional voice synthesis director. Create a comprehensive voice production plan with timing, emphasis, and technical specifications. Respond with JSON in this format:
{
  "segments": [{"text": "...", "timing": 0, "emphasis": "...", "pause": 0}],
  "voiceSettings": {"voice": "...", "style": "...", "speed": 0, "pitch": "...", "tone": "..."},
  "production": {"totalDuration": "...", "segmentCount": 0, "quality": "..."},
  "metadata": {"wordCount": 0, "estimatedDuration": "...", "complexity": "..."}
}"#;

const ANALYSIS_SYSTEM_PROMPT: &str = r#"You are a professional content analyst. Analyze the provided content and give detailed insights and recommendations. Respond with JSON in this format:
{
  "analysis": {"summary": "...", "keyPoints": ["...", "..."], "strengths": ["...", "..."], "weaknesses": ["...", "..."]},
  "metrics": {"readability": 0, "engagement": 0, "sentiment": 0, "complexity": 0},
  "recommendations": [{"category": "...", "suggestion": "...", "priority": "..."}],
  "metadata": {"analysisType": "...", "contentLength": 0, "processingTime": "..."}
}"#;

//=========================================================================================
// Request Payloads and Job Parameterization
//=========================================================================================

/// Request body for `POST /generate/movie`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateMovieRequest {
    pub project_id: i32,
    pub script: String,
    pub genre: String,
    pub quality: String,
    pub duration: String,
    #[serde(default)]
    pub audio_enhancement: Vec<String>,
}

/// Request body for `POST /generate/music`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateMusicRequest {
    pub project_id: i32,
    pub lyrics: String,
    pub genre: String,
    pub style: String,
    pub duration: String,
}

/// Request body for `POST /generate/voice`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVoiceRequest {
    pub project_id: i32,
    pub text: String,
    pub voice: String,
    pub style: String,
    pub speed: f32,
}

/// Request body for `POST /generate/analysis`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateAnalysisRequest {
    pub project_id: i32,
    pub content: String,
    pub analysis_type: String,
}

/// Per-type progress checkpoints. These are tuning data, not invariants: the
/// start value is reported when the job flips to processing, the checkpoint
/// after the model call returns, and 100 only with the completed transition.
#[derive(Debug, Clone, Copy)]
pub struct JobProfile {
    pub start_progress: i32,
    pub checkpoint_progress: i32,
}

/// A fully parameterized generation job: one variant per content type.
#[derive(Debug, Clone)]
pub enum JobSpec {
    Movie(GenerateMovieRequest),
    Music(GenerateMusicRequest),
    Voice(GenerateVoiceRequest),
    Analysis(GenerateAnalysisRequest),
}

impl JobSpec {
    pub fn content_type(&self) -> ContentType {
        match self {
            JobSpec::Movie(_) => ContentType::Movie,
            JobSpec::Music(_) => ContentType::Music,
            JobSpec::Voice(_) => ContentType::Voice,
            JobSpec::Analysis(_) => ContentType::Analysis,
        }
    }

    pub fn project_id(&self) -> i32 {
        match self {
            JobSpec::Movie(req) => req.project_id,
            JobSpec::Music(req) => req.project_id,
            JobSpec::Voice(req) => req.project_id,
            JobSpec::Analysis(req) => req.project_id,
        }
    }

    /// The caller's free text, recorded verbatim as the generation's prompt.
    pub fn prompt_text(&self) -> &str {
        match self {
            JobSpec::Movie(req) => &req.script,
            JobSpec::Music(req) => &req.lyrics,
            JobSpec::Voice(req) => &req.text,
            JobSpec::Analysis(req) => &req.content,
        }
    }

    pub fn profile(&self) -> JobProfile {
        match self {
            JobSpec::Movie(_) => JobProfile { start_progress: 10, checkpoint_progress: 80 },
            JobSpec::Music(_) => JobProfile { start_progress: 15, checkpoint_progress: 85 },
            JobSpec::Voice(_) => JobProfile { start_progress: 20, checkpoint_progress: 90 },
            JobSpec::Analysis(_) => JobProfile { start_progress: 25, checkpoint_progress: 95 },
        }
    }

    fn system_prompt(&self) -> &'static str {
        match self {
            JobSpec::Movie(_) => MOVIE_SYSTEM_PROMPT,
            JobSpec::Music(_) => MUSIC_SYSTEM_PROMPT,
            JobSpec::Voice(_) => VOICE_SYSTEM_PROMPT,
            JobSpec::Analysis(_) => ANALYSIS_SYSTEM_PROMPT,
        }
    }

    fn user_prompt(&self) -> String {
        match self {
            JobSpec::Movie(req) => {
                let enhancement = if req.audio_enhancement.is_empty() {
                    "standard".to_string()
                } else {
                    req.audio_enhancement.join(", ")
                };
                format!(
                    "Create a {} quality {} movie from this script ({} duration): {}. Include {} audio enhancement.",
                    req.quality, req.genre, req.duration, req.script, enhancement
                )
            }
            JobSpec::Music(req) => format!(
                "Create a {} {} song with these lyrics ({} duration): {}",
                req.genre, req.style, req.duration, req.lyrics
            ),
            JobSpec::Voice(req) => format!(
                "Create voice synthesis for this text with {} voice in {} style at {}x speed: {}",
                req.voice, req.style, req.speed, req.text
            ),
            JobSpec::Analysis(req) => format!(
                "Perform {} analysis on this content: {}",
                req.analysis_type, req.content
            ),
        }
    }
}

//=========================================================================================
// The Generation Task
//=========================================================================================

/// The main asynchronous task driving one generation job to a terminal state.
///
/// Any failure along the way is absorbed here: the generation record ends up
/// in `error` with a message, the parent project is flagged, and a terminal
/// event goes out. The task never panics the process over a bad model reply.
pub async fn run_generation(
    state: Arc<AppState>,
    generation_id: i32,
    spec: JobSpec,
    token: CancellationToken,
) {
    info!(
        "Generation {} started ({})",
        generation_id,
        spec.content_type().as_str()
    );

    if let Err(e) = drive(&state, generation_id, &spec, token).await {
        error!("Generation {} failed: {}", generation_id, e);
        fail_generation(&state, generation_id, e.to_string()).await;
    }
}

/// Runs the happy path; returning an error hands control to `fail_generation`.
async fn drive(
    state: &AppState,
    generation_id: i32,
    spec: &JobSpec,
    token: CancellationToken,
) -> PortResult<()> {
    let profile = spec.profile();

    report_progress(state, generation_id, profile.start_progress).await?;

    // The single suspension point: one model call, cancellable between polls.
    let user_prompt = spec.user_prompt();
    let raw = tokio::select! {
        _ = token.cancelled() => {
            return Err(PortError::Unexpected("Generation cancelled".to_string()));
        }
        result = state.llm.generate(spec.system_prompt(), &user_prompt) => result?,
    };

    report_progress(state, generation_id, profile.checkpoint_progress).await?;

    // An unparseable reply degrades to an empty result rather than a failure.
    let result: Value = serde_json::from_str(&raw).unwrap_or_else(|_| json!({}));

    let generation = state
        .store
        .update_generation(
            generation_id,
            GenerationPatch {
                status: Some(GenerationStatus::Completed),
                progress: Some(100),
                result: Some(result.clone()),
                ..Default::default()
            },
        )
        .await?;

    finalize_project(
        state,
        generation.project_id,
        ProjectPatch {
            status: Some(ProjectStatus::Completed),
            progress: Some(100),
            content: Some(result),
            ..Default::default()
        },
    )
    .await;

    state
        .broadcaster
        .broadcast(&ServerEvent::GenerationCompleted(generation));
    Ok(())
}

/// Persists a progress mutation and re-broadcasts the updated generation.
async fn report_progress(
    state: &AppState,
    generation_id: i32,
    progress: i32,
) -> PortResult<Generation> {
    let generation = state
        .store
        .update_generation(
            generation_id,
            GenerationPatch {
                status: Some(GenerationStatus::Processing),
                progress: Some(progress),
                ..Default::default()
            },
        )
        .await?;
    state
        .broadcaster
        .broadcast(&ServerEvent::GenerationProgress(generation.clone()));
    Ok(generation)
}

/// Records a terminal failure on the generation and flags the parent project.
async fn fail_generation(state: &AppState, generation_id: i32, message: String) {
    let generation = match state
        .store
        .update_generation(
            generation_id,
            GenerationPatch {
                status: Some(GenerationStatus::Error),
                error: Some(message),
                ..Default::default()
            },
        )
        .await
    {
        Ok(generation) => generation,
        Err(e) => {
            // Nothing left to broadcast if the record itself is gone.
            error!(
                "Failed to record error state for generation {}: {}",
                generation_id, e
            );
            return;
        }
    };

    finalize_project(
        state,
        generation.project_id,
        ProjectPatch {
            status: Some(ProjectStatus::Error),
            ..Default::default()
        },
    )
    .await;

    state
        .broadcaster
        .broadcast(&ServerEvent::GenerationError(generation));
}

/// Applies the terminal patch to the parent project. A missing project is a
/// tolerated dangling reference (it may have been deleted mid-flight).
async fn finalize_project(state: &AppState, project_id: i32, patch: ProjectPatch) {
    match state.store.update_project(project_id, patch).await {
        Ok(_) => {}
        Err(PortError::NotFound(_)) => {
            info!(
                "Project {} vanished during generation; leaving the generation record as-is",
                project_id
            );
        }
        Err(e) => error!("Failed to finalize project {}: {}", project_id, e),
    }
}
