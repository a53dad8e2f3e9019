pub mod types;
pub mod settings;
pub mod error;

// Re-export EngineError for convenience
pub use error::{EngineError, EngineResult};
