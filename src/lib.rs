pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod provision;
pub mod transcript;

// Re-export commonly used types
pub use config::ChatConfig;
pub use coordinator::ChatCoordinator;
pub use engine::{GenerationEngine, GenerationEvent, SimulatedEngine};
pub use error::ProvisionError;
pub use provision::ModelProvisioner;
pub use transcript::{Message, Role};
