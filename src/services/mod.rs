//! Repositories that map drawings and sessions onto object keys, and the
//! listing helper they share.

pub mod drawing_repository;
pub mod key_listing;
pub mod session_repository;
