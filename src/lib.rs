//! HealthLens: image analysis and chat assistant backed by a hosted multimodal model.
//!
//! The same front-end serves two domain profiles (human medical and veterinary);
//! the profile only selects prompt text, labels and theming.

pub mod assistant;
pub mod config;
pub mod generation;
pub mod profile;
pub mod server;

pub use assistant::{Analysis, Assistant, AssistantError, Exchange, Transcript, UploadedImage};
pub use config::Config;
pub use generation::{Completion, GenerationError, GenerationRequest, GenerationService};
pub use profile::{DomainProfile, ProfileKind};
