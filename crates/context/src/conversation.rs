//! Conversation memory
//!
//! Maps conversation identifiers to transcripts. Each transcript sits behind
//! its own async mutex: queries on one conversation are serialised while
//! different conversations never contend. Readers see the last committed
//! exchange through a published copy and never wait on an in-flight query.
//! Nothing is evicted or persisted; transcripts live as long as the process.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use docqa_common::errors::{AppError, Result};
use docqa_common::Turn;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Ordered turns of one conversation
#[derive(Debug, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }
}

/// Exclusive access to one transcript
///
/// Held by the orchestrator for the whole pipeline of a query, so the
/// history it reads is the history it appends to.
pub struct ConversationGuard {
    id: String,
    transcript: OwnedMutexGuard<Transcript>,
    published: Arc<RwLock<Vec<Turn>>>,
}

impl ConversationGuard {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Turns recorded so far, oldest first
    pub fn history(&self) -> &[Turn] {
        self.transcript.turns()
    }

    /// Append a user turn and its answer as one unit
    pub fn append_exchange(&mut self, user: Turn, assistant: Turn) {
        self.transcript.turns.reserve(2);
        self.transcript.turns.push(user);
        self.transcript.turns.push(assistant);

        let snapshot = self.transcript.turns.clone();
        *self.published.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }
}

/// One map entry: the serialised writer side and the copy readers see
#[derive(Clone)]
struct Conversation {
    transcript: Arc<Mutex<Transcript>>,
    published: Arc<RwLock<Vec<Turn>>>,
}

/// Process-wide conversation map
#[derive(Default)]
pub struct ConversationStore {
    conversations: DashMap<String, Conversation>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to an existing conversation
    pub async fn lock(&self, id: &str) -> Result<ConversationGuard> {
        let conversation = self.entry(id)?;

        Ok(ConversationGuard {
            id: id.to_string(),
            transcript: conversation.transcript.lock_owned().await,
            published: conversation.published,
        })
    }

    /// Create a conversation holding its first exchange
    pub fn start(&self, id: &str, user: Turn, assistant: Turn) -> Result<()> {
        match self.conversations.entry(id.to_string()) {
            Entry::Occupied(_) => Err(AppError::Internal {
                message: format!("Conversation id {} already exists", id),
            }),
            Entry::Vacant(slot) => {
                let turns = vec![user, assistant];
                slot.insert(Conversation {
                    published: Arc::new(RwLock::new(turns.clone())),
                    transcript: Arc::new(Mutex::new(Transcript { turns })),
                });
                Ok(())
            }
        }
    }

    /// Snapshot of a conversation's committed turns, without waiting for the lock
    pub fn transcript(&self, id: &str) -> Result<Vec<Turn>> {
        let conversation = self.entry(id)?;
        let turns = conversation
            .published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Ok(turns)
    }

    fn entry(&self, id: &str) -> Result<Conversation> {
        self.conversations
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::InvalidConversation { id: id.to_string() })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.conversations.contains_key(id)
    }

    /// Number of conversations
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}
