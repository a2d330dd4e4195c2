//! Shared test support: a scripted model adapter and an `AppState` wired to
//! the in-memory store, mirroring what the `api` binary assembles at startup.

use api_lib::adapters::MemStore;
use api_lib::config::Config;
use api_lib::web::{state::AppState, Broadcaster, JobRegistry, DEFAULT_USER_ID};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use studio_core::domain::{NewUser, StorePolicy};
use studio_core::ports::{ContentGenerationService, PortError, PortResult, ProjectStore};

/// What the mock model does when invoked.
pub enum MockBehavior {
    /// Reply with this text after a short pause.
    Reply(String),
    /// Fail with this message.
    Fail(String),
    /// Never return (used to exercise cancellation).
    Hang,
}

pub struct MockLlm {
    behavior: MockBehavior,
}

impl MockLlm {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            behavior: MockBehavior::Reply(text.to_string()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            behavior: MockBehavior::Fail(message.to_string()),
        })
    }

    pub fn hanging() -> Arc<Self> {
        Arc::new(Self {
            behavior: MockBehavior::Hang,
        })
    }
}

#[async_trait]
impl ContentGenerationService for MockLlm {
    async fn generate(&self, _system_prompt: &str, _user_prompt: &str) -> PortResult<String> {
        match &self.behavior {
            MockBehavior::Reply(text) => {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(text.clone())
            }
            MockBehavior::Fail(message) => Err(PortError::Unexpected(message.clone())),
            MockBehavior::Hang => {
                futures::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().expect("valid socket address"),
        database_url: None,
        log_level: tracing::Level::INFO,
        openai_api_key: None,
        generation_model: "gpt-4o".to_string(),
        cors_origin: "http://localhost:5173".to_string(),
        completed_at_on_error: false,
    }
}

/// Builds an `AppState` on the in-memory store with the demo user seeded.
pub async fn test_state(llm: Arc<dyn ContentGenerationService>) -> Arc<AppState> {
    let store = Arc::new(MemStore::new(StorePolicy::default()));
    test_state_with_store(store, llm).await
}

/// Like `test_state`, but on a caller-supplied store implementation.
#[allow(dead_code)]
pub async fn test_state_with_store(
    store: Arc<dyn ProjectStore>,
    llm: Arc<dyn ContentGenerationService>,
) -> Arc<AppState> {
    store
        .ensure_user(
            DEFAULT_USER_ID,
            NewUser {
                email: "user@aistudio.local".to_string(),
                first_name: "AI Studio".to_string(),
                last_name: "User".to_string(),
            },
        )
        .await
        .expect("seeding the demo user");

    Arc::new(AppState {
        store,
        llm,
        config: Arc::new(test_config()),
        broadcaster: Broadcaster::new(),
        jobs: Arc::new(JobRegistry::new()),
    })
}

/// Polls `check` until it passes or the timeout elapses.
pub async fn wait_until<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within the timeout");
}
