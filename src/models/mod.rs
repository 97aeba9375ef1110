//! Domain vocabulary for the store: how drawings, sessions, credentials and
//! client assets are laid out as keys in a single flat bucket, and the
//! session identifier type.

pub mod keys;
pub mod session;
