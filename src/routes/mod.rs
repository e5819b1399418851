// Export all route modules
pub mod auth;
pub mod candidates;
pub mod imports;

// Re-export all route handlers for easy importing
pub use auth::*;
pub use candidates::*;
pub use imports::*;
