//! Concrete collaborators for the session core
//! 
//! In-memory authentication and preference storage used by the HTTP
//! service.

pub mod auth;
pub mod preferences;

// Re-export main types
pub use auth::{AuthService, AuthSession, DEFAULT_ENTRY_POINT};
pub use preferences::PreferenceStore;
