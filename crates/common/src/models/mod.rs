//! Core data model shared by ingestion, retrieval, and orchestration

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Structural element a passage was cut from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    Title,
    NarrativeText,
    ListItem,
    Text,
}

impl ElementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Title => "Title",
            ElementType::NarrativeText => "NarrativeText",
            ElementType::ListItem => "ListItem",
            ElementType::Text => "Text",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A span of cleaned document text, the unit of retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    pub document_name: String,
    /// 1-based page number; 1 when the source has no page concept
    pub page_number: u32,
    pub element_type: ElementType,
}

impl Passage {
    pub fn new(
        text: impl Into<String>,
        document_name: impl Into<String>,
        page_number: u32,
        element_type: ElementType,
    ) -> Self {
        Self {
            text: text.into(),
            document_name: document_name.into(),
            page_number: page_number.max(1),
            element_type,
        }
    }

    /// The (document name, page) provenance pair of this passage
    pub fn citation(&self) -> Citation {
        Citation {
            page: self.page_number,
            document_name: self.document_name.clone(),
        }
    }
}

/// Provenance marker attached to an answer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Citation {
    pub page: u32,
    pub document_name: String,
}

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One exchange unit of a transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Answer returned for one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub conversation_id: String,
}
