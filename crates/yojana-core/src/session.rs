//! Who is signed in, and which screen that unlocks.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::state::EligibilityProfile;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub profile_completed: bool,
    /// Last profile saved from this client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<EligibilityProfile>,
}

impl AuthSession {
    /// Record a profile the backend accepted
    pub fn complete_profile(&mut self, profile: EligibilityProfile) {
        self.profile = Some(profile);
        self.profile_completed = true;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Unauthenticated,
    ProfileIncomplete,
    Main,
}

pub struct SessionGuard;

impl SessionGuard {
    pub fn view(session: Option<&AuthSession>) -> View {
        match session {
            None => View::Unauthenticated,
            Some(s) if !s.profile_completed => View::ProfileIncomplete,
            Some(_) => View::Main,
        }
    }
}

/// Persists the signed-in session between runs
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join("session.json"))
    }

    pub fn load(&self) -> Result<Option<AuthSession>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let session: AuthSession = serde_json::from_str(&content)?;
        Ok(Some(session))
    }

    pub fn save(&self, session: &AuthSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(profile_completed: bool) -> AuthSession {
        AuthSession {
            token: "tok".to_string(),
            user_id: "42".to_string(),
            email: "asha@example.com".to_string(),
            profile_completed,
            profile: None,
        }
    }

    #[test]
    fn test_view_routing() {
        assert_eq!(SessionGuard::view(None), View::Unauthenticated);
        assert_eq!(
            SessionGuard::view(Some(&session(false))),
            View::ProfileIncomplete
        );
        assert_eq!(SessionGuard::view(Some(&session(true))), View::Main);
    }

    #[test]
    fn test_session_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::in_dir(dir.path());

        assert!(store.load().unwrap().is_none());

        store.save(&session(true)).unwrap();
        assert_eq!(store.load().unwrap(), Some(session(true)));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn test_complete_profile_unlocks_main() {
        let mut s = session(false);
        s.complete_profile(EligibilityProfile {
            name: "Asha".to_string(),
            dob: "2006-04-02".to_string(),
            state: "Bihar".to_string(),
            income: 180000,
            category: crate::state::Category::Sc,
            marks_12: None,
        });
        assert_eq!(SessionGuard::view(Some(&s)), View::Main);
        assert_eq!(s.profile.as_ref().map(|p| p.name.as_str()), Some("Asha"));
    }

    #[test]
    fn test_server_response_shape_decodes() {
        let s: AuthSession = serde_json::from_str(r#"{"token":"t","user_id":"7"}"#).unwrap();
        assert_eq!(s.user_id, "7");
        assert!(!s.profile_completed);
        assert!(s.email.is_empty());
    }
}
