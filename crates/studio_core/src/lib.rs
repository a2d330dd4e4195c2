pub mod domain;
pub mod ports;

pub use domain::{
    ContentType, Generation, GenerationPatch, GenerationStatus, NewGeneration, NewProject,
    NewUser, Project, ProjectPatch, ProjectStatus, StorePolicy, User,
};
pub use ports::{ContentGenerationService, PortError, PortResult, ProjectStore};
