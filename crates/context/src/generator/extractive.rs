//! Offline extractive answerer
//!
//! Answers with the context passage sharing the most distinct terms with the
//! question, followed by its citation. Earlier passages win ties. Useful for
//! running the full pipeline without a hosted model.

use super::Generator;
use crate::prompt::Prompt;
use async_trait::async_trait;
use docqa_common::errors::Result;
use docqa_common::text::tokenize;
use std::collections::HashSet;

/// Answer given when there is no context to quote
pub const NO_INFORMATION_ANSWER: &str =
    "I don't have enough information from the document to answer that question.";

#[derive(Debug, Default, Clone, Copy)]
pub struct ExtractiveGenerator;

#[async_trait]
impl Generator for ExtractiveGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let question: HashSet<String> = tokenize(&prompt.question).into_iter().collect();

        let mut best = None;
        let mut best_overlap = 0;
        for passage in &prompt.context {
            let overlap = tokenize(&passage.text)
                .into_iter()
                .collect::<HashSet<_>>()
                .intersection(&question)
                .count();
            if best.is_none() || overlap > best_overlap {
                best = Some(passage);
                best_overlap = overlap;
            }
        }

        Ok(match best {
            Some(passage) => format!(
                "{} (Source: {}, Page: {})",
                passage.text, passage.document_name, passage.page_number
            ),
            None => NO_INFORMATION_ANSWER.to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "extractive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_common::{ElementType, Passage};

    fn passage(text: &str, page: u32) -> Passage {
        Passage::new(text, "policy.pdf", page, ElementType::NarrativeText)
    }

    #[tokio::test]
    async fn test_quotes_best_overlap() {
        let prompt = Prompt::new(
            "What about medical leave?",
            vec![],
            vec![
                passage("Leave requires 30 days notice.", 1),
                passage("Exceptions apply for medical leave.", 2),
            ],
        );
        let answer = ExtractiveGenerator.generate(&prompt).await.unwrap();
        assert_eq!(answer, "Exceptions apply for medical leave. (Source: policy.pdf, Page: 2)");
    }

    #[tokio::test]
    async fn test_no_context() {
        let prompt = Prompt::new("Anything?", vec![], vec![]);
        assert_eq!(ExtractiveGenerator.generate(&prompt).await.unwrap(), NO_INFORMATION_ANSWER);
    }

    #[tokio::test]
    async fn test_ties_prefer_first_passage() {
        let prompt = Prompt::new("zebra", vec![], vec![passage("alpha", 4), passage("beta", 5)]);
        let answer = ExtractiveGenerator.generate(&prompt).await.unwrap();
        assert!(answer.starts_with("alpha"));
    }
}
