use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use log::{error, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// The locally stored sign-in record. There is no server behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub name: String,
    pub email: String,
    pub is_authenticated: bool,
}

/// Who is using the simulator right now. Passed to whatever needs the gate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user: Option<User>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.is_authenticated)
    }
}

/// JSON file holding the sign-in record.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored record. A missing or unreadable file means nobody is signed in.
    pub fn load(&self) -> Session {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Session::anonymous(),
            Err(e) => {
                error!("Error reading session {}: {e}", self.path.display());
                return Session::anonymous();
            }
        };
        match serde_json::from_str::<User>(&raw) {
            Ok(user) => Session { user: Some(user) },
            Err(e) => {
                error!("Error parsing session {}: {e}", self.path.display());
                Session::anonymous()
            }
        }
    }

    pub fn sign_in(&self, name: &str, email: &str) -> Result<Session> {
        let name = name.trim();
        let email = email.trim();
        ensure!(!name.is_empty(), "name must not be empty");
        let email_pattern = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")?;
        ensure!(
            email_pattern.is_match(email),
            "'{email}' is not a valid email address"
        );

        let user = User {
            name: name.to_string(),
            email: email.to_string(),
            is_authenticated: true,
        };
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(&user)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("failed to write session {}", self.path.display()))?;

        info!("Signed in as {} <{}>", user.name, user.email);
        Ok(Session { user: Some(user) })
    }

    pub fn sign_out(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => info!("Signed out"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => warn!("Nobody was signed in"),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to remove session {}", self.path.display()))
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, SessionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("session.json"));
        (dir, store)
    }

    #[test]
    fn test_missing_file_is_anonymous() {
        let (_dir, store) = store();
        let session = store.load();
        assert!(!session.is_authenticated());
        assert!(session.user().is_none());
    }

    #[test]
    fn test_sign_in_round_trip() {
        let (_dir, store) = store();
        let session = store.sign_in("  Jane Doe ", "jane@example.com").unwrap();
        assert!(session.is_authenticated());

        let loaded = store.load();
        assert_eq!(loaded, session);
        assert_eq!(loaded.user().unwrap().name, "Jane Doe");

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"isAuthenticated\": true"));
        assert!(!raw.contains("is_authenticated"));
    }

    #[test]
    fn test_sign_in_validates() {
        let (_dir, store) = store();
        assert!(store.sign_in("", "jane@example.com").is_err());
        assert!(store.sign_in("Jane", "not-an-email").is_err());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_sign_out_clears() {
        let (_dir, store) = store();
        store.sign_in("Jane", "jane@example.com").unwrap();
        store.sign_out().unwrap();
        assert!(!store.load().is_authenticated());
        // signing out twice is fine
        store.sign_out().unwrap();
    }

    #[test]
    fn test_corrupt_file_is_anonymous() {
        let (dir, _) = store();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(!SessionStore::new(&path).load().is_authenticated());
    }

    #[test]
    fn test_unauthenticated_record() {
        let (dir, _) = store();
        let path = dir.path().join("session.json");
        std::fs::write(
            &path,
            r#"{"name": "Jane", "email": "jane@example.com", "isAuthenticated": false}"#,
        )
        .unwrap();
        let session = SessionStore::new(&path).load();
        assert!(session.user().is_some());
        assert!(!session.is_authenticated());
    }
}
