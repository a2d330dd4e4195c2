//! services/api/src/adapters/mem_store.rs
//!
//! This module contains the in-memory store, the default implementation of the
//! `ProjectStore` port. It is the standalone-mode backend: keyed maps guarded by
//! an async RwLock, with monotonic integer ids for projects and generations.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use studio_core::domain::{
    Generation, GenerationPatch, GenerationStatus, NewGeneration, NewProject, NewUser, Project,
    ProjectPatch, ProjectStatus, StorePolicy, User,
};
use studio_core::ports::{PortError, PortResult, ProjectStore};
use tokio::sync::RwLock;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An in-memory store that implements the `ProjectStore` port.
pub struct MemStore {
    inner: RwLock<Inner>,
    policy: StorePolicy,
}

struct Inner {
    users: HashMap<String, User>,
    projects: HashMap<i32, Project>,
    generations: HashMap<i32, Generation>,
    next_project_id: i32,
    next_generation_id: i32,
}

impl MemStore {
    /// Creates an empty `MemStore` with the given policy.
    pub fn new(policy: StorePolicy) -> Self {
        Self {
            inner: RwLock::new(Inner {
                users: HashMap::new(),
                projects: HashMap::new(),
                generations: HashMap::new(),
                next_project_id: 1,
                next_generation_id: 1,
            }),
            policy,
        }
    }
}

//=========================================================================================
// `ProjectStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ProjectStore for MemStore {
    async fn ensure_user(&self, id: &str, user: NewUser) -> PortResult<User> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.users.get(id) {
            return Ok(existing.clone());
        }
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(PortError::Invalid(format!(
                "Email '{}' is already in use",
                user.email
            )));
        }

        let now = Utc::now();
        let user = User {
            id: id.to_string(),
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: &str) -> PortResult<User> {
        let inner = self.inner.read().await;
        inner
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", id)))
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<User> {
        let inner = self.inner.read().await;
        inner
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User with email {} not found", email)))
    }

    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(PortError::Invalid(format!(
                "Email '{}' is already in use",
                user.email
            )));
        }

        let now = Utc::now();
        let user = User {
            id: format!("user-{}", Uuid::new_v4()),
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn get_projects(&self, user_id: &str) -> PortResult<Vec<Project>> {
        let inner = self.inner.read().await;
        let mut projects: Vec<Project> = inner
            .projects
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        // Most recently touched first; id breaks same-instant ties.
        projects.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(projects)
    }

    async fn get_project(&self, id: i32) -> PortResult<Project> {
        let inner = self.inner.read().await;
        inner
            .projects
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Project {} not found", id)))
    }

    async fn create_project(&self, project: NewProject) -> PortResult<Project> {
        let mut inner = self.inner.write().await;
        let id = inner.next_project_id;
        inner.next_project_id += 1;

        let now = Utc::now();
        let project = Project {
            id,
            user_id: project.user_id,
            title: project.title,
            description: project.description,
            kind: project.kind,
            status: ProjectStatus::Draft,
            progress: 0,
            quality: project.quality,
            duration: project.duration,
            content: None,
            settings: project.settings,
            created_at: now,
            updated_at: now,
        };
        inner.projects.insert(id, project.clone());
        Ok(project)
    }

    async fn update_project(&self, id: i32, patch: ProjectPatch) -> PortResult<Project> {
        patch.validate().map_err(PortError::Invalid)?;

        let mut inner = self.inner.write().await;
        let project = inner
            .projects
            .get_mut(&id)
            .ok_or_else(|| PortError::NotFound(format!("Project {} not found", id)))?;

        if let Some(title) = patch.title {
            project.title = title;
        }
        if let Some(description) = patch.description {
            project.description = Some(description);
        }
        if let Some(status) = patch.status {
            project.status = status;
        }
        if let Some(progress) = patch.progress {
            project.progress = progress;
        }
        if let Some(quality) = patch.quality {
            project.quality = Some(quality);
        }
        if let Some(duration) = patch.duration {
            project.duration = Some(duration);
        }
        if let Some(content) = patch.content {
            project.content = Some(content);
        }
        if let Some(settings) = patch.settings {
            project.settings = Some(settings);
        }
        project.updated_at = Utc::now();

        Ok(project.clone())
    }

    async fn delete_project(&self, id: i32) -> PortResult<bool> {
        let mut inner = self.inner.write().await;
        // Generations keep their project_id; the reference is allowed to dangle.
        Ok(inner.projects.remove(&id).is_some())
    }

    async fn get_generations(&self, user_id: &str) -> PortResult<Vec<Generation>> {
        let inner = self.inner.read().await;
        let mut generations: Vec<Generation> = inner
            .generations
            .values()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect();
        generations.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(generations)
    }

    async fn get_generation(&self, id: i32) -> PortResult<Generation> {
        let inner = self.inner.read().await;
        inner
            .generations
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Generation {} not found", id)))
    }

    async fn create_generation(&self, generation: NewGeneration) -> PortResult<Generation> {
        let mut inner = self.inner.write().await;
        let id = inner.next_generation_id;
        inner.next_generation_id += 1;

        let generation = Generation {
            id,
            project_id: generation.project_id,
            user_id: generation.user_id,
            kind: generation.kind,
            prompt: generation.prompt,
            model: generation.model,
            status: GenerationStatus::Pending,
            progress: 0,
            result: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        inner.generations.insert(id, generation.clone());
        Ok(generation)
    }

    async fn update_generation(&self, id: i32, patch: GenerationPatch) -> PortResult<Generation> {
        let mut inner = self.inner.write().await;
        let generation = inner
            .generations
            .get_mut(&id)
            .ok_or_else(|| PortError::NotFound(format!("Generation {} not found", id)))?;

        if let Some(progress) = patch.progress {
            generation.progress = progress;
        }
        if let Some(result) = patch.result {
            generation.result = Some(result);
        }
        if let Some(error) = patch.error {
            generation.error = Some(error);
        }
        if let Some(status) = patch.status {
            generation.status = status;
            // A completed transition always owns the completion timestamp.
            match status {
                GenerationStatus::Completed => generation.completed_at = Some(Utc::now()),
                GenerationStatus::Error if self.policy.stamp_completed_at_on_error => {
                    generation.completed_at = Some(Utc::now());
                }
                _ => {}
            }
        }

        Ok(generation.clone())
    }

    async fn get_active_generations(&self, user_id: &str) -> PortResult<Vec<Generation>> {
        let inner = self.inner.read().await;
        let mut generations: Vec<Generation> = inner
            .generations
            .values()
            .filter(|g| g.user_id == user_id && g.status.is_active())
            .cloned()
            .collect();
        generations.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(generations)
    }
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use studio_core::domain::ContentType;

    fn new_project(user_id: &str, title: &str) -> NewProject {
        NewProject {
            user_id: user_id.to_string(),
            title: title.to_string(),
            description: None,
            kind: ContentType::Movie,
            quality: None,
            duration: None,
            settings: None,
        }
    }

    fn new_generation(project_id: i32, user_id: &str) -> NewGeneration {
        NewGeneration {
            project_id,
            user_id: user_id.to_string(),
            kind: ContentType::Movie,
            prompt: "a script".to_string(),
            model: "gpt-4o".to_string(),
        }
    }

    #[tokio::test]
    async fn create_project_assigns_monotonic_ids_and_defaults() {
        let store = MemStore::new(StorePolicy::default());

        let first = store.create_project(new_project("u1", "First")).await.unwrap();
        let second = store.create_project(new_project("u1", "Second")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.status, ProjectStatus::Draft);
        assert_eq!(first.progress, 0);
        assert!(first.content.is_none());
    }

    #[tokio::test]
    async fn created_project_round_trips_through_get() {
        let store = MemStore::new(StorePolicy::default());
        let created = store.create_project(new_project("u1", "Demo")).await.unwrap();
        let fetched = store.get_project(created.id).await.unwrap();

        assert_eq!(fetched.title, created.title);
        assert_eq!(fetched.user_id, created.user_id);
        assert_eq!(fetched.created_at, created.created_at);
    }

    #[tokio::test]
    async fn update_project_merges_and_bumps_updated_at() {
        let store = MemStore::new(StorePolicy::default());
        let created = store.create_project(new_project("u1", "Demo")).await.unwrap();

        let updated = store
            .update_project(
                created.id,
                ProjectPatch {
                    status: Some(ProjectStatus::Generating),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, ProjectStatus::Generating);
        assert_eq!(updated.title, "Demo");
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn update_project_signals_not_found() {
        let store = MemStore::new(StorePolicy::default());
        let result = store.update_project(42, ProjectPatch::default()).await;
        assert!(matches!(result, Err(PortError::NotFound(_))));
    }

    #[tokio::test]
    async fn projects_are_listed_by_updated_at_descending() {
        let store = MemStore::new(StorePolicy::default());
        let first = store.create_project(new_project("u1", "First")).await.unwrap();
        let _second = store.create_project(new_project("u1", "Second")).await.unwrap();
        let _other = store.create_project(new_project("u2", "Elsewhere")).await.unwrap();

        // Touch the first project so it becomes the most recently updated.
        store
            .update_project(
                first.id,
                ProjectPatch {
                    progress: Some(50),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let projects = store.get_projects("u1").await.unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].title, "First");
        assert_eq!(projects[1].title, "Second");
    }

    #[tokio::test]
    async fn delete_project_does_not_cascade_to_generations() {
        let store = MemStore::new(StorePolicy::default());
        let project = store.create_project(new_project("u1", "Demo")).await.unwrap();
        let generation = store
            .create_generation(new_generation(project.id, "u1"))
            .await
            .unwrap();

        assert!(store.delete_project(project.id).await.unwrap());
        assert!(!store.delete_project(project.id).await.unwrap());

        // The generation survives with a dangling project reference.
        let orphan = store.get_generation(generation.id).await.unwrap();
        assert_eq!(orphan.project_id, project.id);
        assert!(matches!(
            store.get_project(project.id).await,
            Err(PortError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn completed_transition_stamps_completed_at() {
        let store = MemStore::new(StorePolicy::default());
        let project = store.create_project(new_project("u1", "Demo")).await.unwrap();
        let generation = store
            .create_generation(new_generation(project.id, "u1"))
            .await
            .unwrap();
        assert!(generation.completed_at.is_none());

        let processing = store
            .update_generation(
                generation.id,
                GenerationPatch {
                    status: Some(GenerationStatus::Processing),
                    progress: Some(10),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(processing.completed_at.is_none());

        let completed = store
            .update_generation(
                generation.id,
                GenerationPatch {
                    status: Some(GenerationStatus::Completed),
                    progress: Some(100),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(completed.completed_at.is_some());
    }

    #[tokio::test]
    async fn error_transition_respects_store_policy() {
        let default_store = MemStore::new(StorePolicy::default());
        let project = default_store
            .create_project(new_project("u1", "Demo"))
            .await
            .unwrap();
        let generation = default_store
            .create_generation(new_generation(project.id, "u1"))
            .await
            .unwrap();
        let failed = default_store
            .update_generation(
                generation.id,
                GenerationPatch {
                    status: Some(GenerationStatus::Error),
                    error: Some("model unavailable".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(failed.completed_at.is_none());

        let stamping_store = MemStore::new(StorePolicy {
            stamp_completed_at_on_error: true,
        });
        let project = stamping_store
            .create_project(new_project("u1", "Demo"))
            .await
            .unwrap();
        let generation = stamping_store
            .create_generation(new_generation(project.id, "u1"))
            .await
            .unwrap();
        let failed = stamping_store
            .update_generation(
                generation.id,
                GenerationPatch {
                    status: Some(GenerationStatus::Error),
                    error: Some("model unavailable".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(failed.completed_at.is_some());
    }

    #[tokio::test]
    async fn active_generations_filters_terminal_states() {
        let store = MemStore::new(StorePolicy::default());
        let project = store.create_project(new_project("u1", "Demo")).await.unwrap();

        let pending = store
            .create_generation(new_generation(project.id, "u1"))
            .await
            .unwrap();
        let processing = store
            .create_generation(new_generation(project.id, "u1"))
            .await
            .unwrap();
        let completed = store
            .create_generation(new_generation(project.id, "u1"))
            .await
            .unwrap();
        let _foreign = store
            .create_generation(new_generation(project.id, "u2"))
            .await
            .unwrap();

        store
            .update_generation(
                processing.id,
                GenerationPatch {
                    status: Some(GenerationStatus::Processing),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        store
            .update_generation(
                completed.id,
                GenerationPatch {
                    status: Some(GenerationStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let active = store.get_active_generations("u1").await.unwrap();
        let ids: Vec<i32> = active.iter().map(|g| g.id).collect();
        // Newest first, terminal and foreign entries excluded.
        assert_eq!(ids, vec![processing.id, pending.id]);
    }

    #[tokio::test]
    async fn user_emails_are_unique() {
        let store = MemStore::new(StorePolicy::default());
        let user = store
            .create_user(NewUser {
                email: "a@studio.local".to_string(),
                first_name: "A".to_string(),
                last_name: "User".to_string(),
            })
            .await
            .unwrap();
        assert!(user.id.starts_with("user-"));

        let duplicate = store
            .create_user(NewUser {
                email: "a@studio.local".to_string(),
                first_name: "B".to_string(),
                last_name: "User".to_string(),
            })
            .await;
        assert!(matches!(duplicate, Err(PortError::Invalid(_))));

        let by_email = store.get_user_by_email("a@studio.local").await.unwrap();
        assert_eq!(by_email.id, user.id);
    }

    #[tokio::test]
    async fn ensure_user_is_idempotent() {
        let store = MemStore::new(StorePolicy::default());
        let seed = NewUser {
            email: "user@aistudio.local".to_string(),
            first_name: "AI Studio".to_string(),
            last_name: "User".to_string(),
        };

        let first = store.ensure_user("standalone-user", seed.clone()).await.unwrap();
        let second = store.ensure_user("standalone-user", seed).await.unwrap();

        assert_eq!(first.id, "standalone-user");
        assert_eq!(first.created_at, second.created_at);
    }
}
