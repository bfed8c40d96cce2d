//! Identifier generation for conversations and documents

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Source of fresh identifiers
pub trait IdGenerator: Send + Sync {
    /// Identifier for a new conversation
    fn conversation_id(&self) -> String;

    /// Identifier for a newly indexed document
    fn document_id(&self) -> String;
}

/// Random identifiers: `conv_<32 hex>` and UUID v4 documents
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn conversation_id(&self) -> String {
        format!("conv_{}", Uuid::new_v4().simple())
    }

    fn document_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic counters: `conv_1`, `conv_2`, ... and `doc_1`, `doc_2`, ...
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    conversations: AtomicU64,
    documents: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn conversation_id(&self) -> String {
        format!("conv_{}", self.conversations.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn document_id(&self) -> String {
        format!("doc_{}", self.documents.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_ids() {
        let ids = RandomIdGenerator;
        let conv = ids.conversation_id();
        assert!(conv.starts_with("conv_"));
        assert_eq!(conv.len(), "conv_".len() + 32);
        assert_ne!(conv, ids.conversation_id());
        assert!(Uuid::parse_str(&ids.document_id()).is_ok());
    }

    #[test]
    fn test_sequential_ids() {
        let ids = SequentialIdGenerator::new();
        assert_eq!(ids.conversation_id(), "conv_1");
        assert_eq!(ids.conversation_id(), "conv_2");
        assert_eq!(ids.document_id(), "doc_1");
    }
}
