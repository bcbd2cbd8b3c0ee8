//! UI-agnostic application state types
//!
//! This module contains data structures that are shared between the stores
//! and any UI built on top of them, and don't depend on a UI framework.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a source document, server- or client-generated
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh client-side id for sources that never touch the upload service
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The scope a conversation is bound to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum ContextKey {
    /// Questions about one uploaded or added source
    Source(SourceId),
    /// Program-eligibility questions answered against the user's profile
    Eligibility,
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextKey::Source(id) => write!(f, "source:{}", id),
            ContextKey::Eligibility => f.write_str("eligibility"),
        }
    }
}

/// A chat message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub context: ContextKey,
}

impl ChatMessage {
    pub fn user(context: ContextKey, content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            context,
        }
    }

    pub fn assistant(context: ContextKey, content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            context,
        }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Document,
    Text,
    Url,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Document => "document",
            SourceKind::Text => "text",
            SourceKind::Url => "url",
        }
    }
}

/// A source the user can chat about. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    pub title: String,
    pub content_preview: String,
    pub kind: SourceKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "GEN")]
    General,
    #[serde(rename = "OBC")]
    Obc,
    #[serde(rename = "SC")]
    Sc,
    #[serde(rename = "ST")]
    St,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::General => "GEN",
            Category::Obc => "OBC",
            Category::Sc => "SC",
            Category::St => "ST",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "GEN" | "GENERAL" => Some(Category::General),
            "OBC" => Some(Category::Obc),
            "SC" => Some(Category::Sc),
            "ST" => Some(Category::St),
            _ => None,
        }
    }

    pub fn all() -> Vec<Category> {
        vec![Category::General, Category::Obc, Category::Sc, Category::St]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::General => "General",
            Category::Obc => "OBC",
            Category::Sc => "SC",
            Category::St => "ST",
        }
    }
}

/// Profile fields collected at registration and sent along with
/// eligibility questions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityProfile {
    pub name: String,
    pub dob: String,
    pub state: String,
    pub income: u64,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks_12: Option<f32>,
}

impl EligibilityProfile {
    /// Every text field is required; income and category are typed already.
    pub fn validate(&self) -> Result<(), crate::error::StoreError> {
        let missing = [&self.name, &self.dob, &self.state]
            .iter()
            .any(|field| field.trim().is_empty());
        if missing {
            return Err(crate::error::StoreError::Validation(
                "Please fill all fields".to_string(),
            ));
        }
        if let Some(marks) = self.marks_12 {
            if !(0.0..=100.0).contains(&marks) {
                return Err(crate::error::StoreError::Validation(
                    "Class 12 marks must be a percentage between 0 and 100".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> EligibilityProfile {
        EligibilityProfile {
            name: "Asha".to_string(),
            dob: "2006-04-12".to_string(),
            state: "Bihar".to_string(),
            income: 250_000,
            category: Category::Sc,
            marks_12: Some(90.0),
        }
    }

    #[test]
    fn test_profile_requires_all_fields() {
        assert!(profile().validate().is_ok());

        let mut blank_state = profile();
        blank_state.state = "   ".to_string();
        assert!(blank_state.validate().is_err());
    }

    #[test]
    fn test_profile_rejects_out_of_range_marks() {
        let mut p = profile();
        p.marks_12 = Some(140.0);
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_category_wire_names() {
        assert_eq!(serde_json::to_string(&Category::General).unwrap(), "\"GEN\"");
        assert_eq!(Category::from_str("obc"), Some(Category::Obc));
        assert_eq!(Category::from_str("other"), None);
    }

    #[test]
    fn test_context_key_display() {
        let key = ContextKey::Source(SourceId::new("abc"));
        assert_eq!(key.to_string(), "source:abc");
        assert_eq!(ContextKey::Eligibility.to_string(), "eligibility");
    }
}
