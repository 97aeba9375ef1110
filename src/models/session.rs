//! Session identifiers.

use rand::{RngCore, rngs::OsRng};
use std::fmt;

/// Bytes of OS randomness behind each session id.
pub const SESSION_ID_BYTES: usize = 32;

/// An opaque session token: 32 random bytes rendered as 64 lowercase hex
/// characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Draw a fresh id from the operating system's secure random source.
    pub fn generate() -> Result<Self, rand::Error> {
        let mut buf = [0u8; SESSION_ID_BYTES];
        OsRng.try_fill_bytes(&mut buf)?;
        Ok(Self(hex::encode(buf)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl PartialEq<str> for SessionId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<String> for SessionId {
    fn eq(&self, other: &String) -> bool {
        &self.0 == other
    }
}
