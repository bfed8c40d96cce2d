//! Grounded prompt assembly
//!
//! A prompt is fixed system instructions, the conversation so far, the
//! selected context passages, and the question. `messages` renders it as a
//! provider-neutral chat sequence.

use docqa_common::{Passage, Role, Turn};
use serde::Serialize;

/// Instructions sent as the system message of every query
pub const SYSTEM_INSTRUCTIONS: &str = "You are an intelligent assistant for question-answering tasks. \
Use ONLY the following retrieved context from a document to answer the user's question. \
If you don't know the answer from the provided context, or if the context is empty or states no relevant information, \
say that you don't have enough information from the document to answer. \
Do not make up information not present in the context. \
Your answers should be concise and directly address the question. \
When you use information from the context, you MUST cite the page number and document name \
from the metadata of the relevant context snippet. \
Format citations like this: (Source: [document_name], Page: [page_number]). \
If multiple sources are used, list them all.";

/// Context block used when no passage was selected
pub const NO_CONTEXT_MARKER: &str = "No relevant context found in the document for this question.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl From<Role> for ChatRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => ChatRole::User,
            Role::Assistant => ChatRole::Assistant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Everything the generator sees for one query
#[derive(Debug, Clone)]
pub struct Prompt {
    pub system: String,
    pub history: Vec<Turn>,
    pub context: Vec<Passage>,
    pub question: String,
}

impl Prompt {
    pub fn new(question: impl Into<String>, history: Vec<Turn>, context: Vec<Passage>) -> Self {
        Self {
            system: SYSTEM_INSTRUCTIONS.to_string(),
            history,
            context,
            question: question.into(),
        }
    }

    /// Numbered snippets with their provenance, or the no-context marker
    pub fn context_block(&self) -> String {
        if self.context.is_empty() {
            return NO_CONTEXT_MARKER.to_string();
        }

        self.context
            .iter()
            .enumerate()
            .map(|(i, passage)| {
                format!(
                    "Context Snippet {} (Source: {}, Page: {}):\n{}",
                    i + 1,
                    passage.document_name,
                    passage.page_number,
                    passage.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// The final user message: context plus question
    pub fn user_message(&self) -> String {
        format!(
            "Retrieved Context:\n<context>\n{}\n</context>\n\nUser Question: {}",
            self.context_block(),
            self.question
        )
    }

    /// System message, history in original order, then the user message
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(ChatMessage::new(ChatRole::System, self.system.as_str()));
        messages.extend(
            self.history
                .iter()
                .map(|turn| ChatMessage::new(turn.role.into(), turn.content.as_str())),
        );
        messages.push(ChatMessage::new(ChatRole::User, self.user_message()));
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_common::ElementType;

    #[test]
    fn test_context_block_format() {
        let prompt = Prompt::new(
            "How much notice is required?",
            vec![],
            vec![
                Passage::new("Leave requires 30 days notice.", "policy.pdf", 1, ElementType::NarrativeText),
                Passage::new("Exceptions apply for medical leave.", "policy.pdf", 2, ElementType::NarrativeText),
            ],
        );
        assert_eq!(
            prompt.context_block(),
            "Context Snippet 1 (Source: policy.pdf, Page: 1):\nLeave requires 30 days notice.\n\n\
             Context Snippet 2 (Source: policy.pdf, Page: 2):\nExceptions apply for medical leave."
        );
    }

    #[test]
    fn test_empty_context_uses_marker() {
        let prompt = Prompt::new("Anything?", vec![], vec![]);
        assert_eq!(
            prompt.user_message(),
            format!(
                "Retrieved Context:\n<context>\n{}\n</context>\n\nUser Question: Anything?",
                NO_CONTEXT_MARKER
            )
        );
    }

    #[test]
    fn test_messages_keep_history_order() {
        let history = vec![Turn::user("first question"), Turn::assistant("first answer")];
        let prompt = Prompt::new("second question", history, vec![]);
        let messages = prompt.messages();

        let roles: Vec<ChatRole> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![ChatRole::System, ChatRole::User, ChatRole::Assistant, ChatRole::User]
        );
        assert_eq!(messages[0].content, SYSTEM_INSTRUCTIONS);
        assert_eq!(messages[1].content, "first question");
        assert_eq!(messages[2].content, "first answer");
        assert!(messages[3].content.ends_with("User Question: second question"));
    }
}
