// Re-export needed modules for testing
pub mod backend;
pub mod chat;
pub mod error;
pub mod models;
pub mod profile;

// Re-export main types for convenience
pub use chat::ChatClient;
pub use models::*;
