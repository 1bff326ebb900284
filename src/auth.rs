//! auth.rs
//!
//! Hosting-provider credential, stored per user. The artifact session is
//! keyed by a hash of the credential, so stored artifacts die with the
//! login that produced them.

use std::fs;
use std::path::PathBuf;

use sha2::{Digest, Sha256};

use crate::error::Error;

pub struct Session {
    pub token: String,
}

impl Session {
    /// Stable id binding stored artifacts to this credential.
    pub fn id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.token.as_bytes());
        hex::encode(hasher.finalize())
    }
}

pub fn login(token: &str) -> Result<(), Error> {
    if token.trim().is_empty() {
        return Err(Error::Validation("token cannot be empty".into()));
    }

    let path = token_file();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::Storage(e.to_string()))?;
    }
    fs::write(path, token.trim()).map_err(|e| Error::Storage(e.to_string()))
}

pub fn current() -> Option<Session> {
    let raw = fs::read_to_string(token_file()).ok()?;
    let token = raw.trim().to_string();
    if token.is_empty() {
        return None;
    }
    Some(Session { token })
}

/// Remove the credential, returning the session id so the caller can
/// wipe the artifact file in the same breath; neither half survives
/// alone.
pub fn logout() -> Option<String> {
    let session = current()?;
    let id = session.id();
    let _ = fs::remove_file(token_file());
    Some(id)
}

fn token_file() -> PathBuf {
    let mut base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.push("testloom");
    base.push("token");
    base
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_is_stable_and_distinct() {
        let a = Session { token: "tok-a".into() };
        let b = Session { token: "tok-b".into() };

        assert_eq!(a.id(), a.id());
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id().len(), 64);
    }
}
