//! Drawing and session persistence over a single object-storage bucket.
//!
//! Two logical collections share one flat bucket through key prefixes:
//! drawings live under `drawing-content/` and the single active session
//! under `sessions/`. The session side also serves a provisioned
//! `credentials` blob and static assets under `client`.

pub mod config;
pub mod errors;
pub mod models;
pub mod services;
pub mod store;

pub use errors::{RepositoryError, RepositoryResult};
pub use models::session::SessionId;
pub use services::{drawing_repository::DrawingRepository, session_repository::SessionRepository};
pub use store::{MemoryObjectStore, ObjectStore, S3ObjectStore, S3Settings};
