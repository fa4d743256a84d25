//! services/api/src/adapters/cards_llm.rs
//!
//! This module contains the adapter for the flashcard-generating LLM.
//! It implements the `CardGenerationService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::str::FromStr;

use study_tracker_core::domain::Difficulty;
use study_tracker_core::ports::{CardDraft, CardGenerationService, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CardGenerationService` using an
/// OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiCardsAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiCardsAdapter {
    /// Creates a new `OpenAiCardsAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

/// The raw shape the model is asked to produce, before validation.
#[derive(Deserialize)]
struct RawCard {
    question: String,
    answer: String,
    #[serde(default)]
    difficulty: Option<String>,
}

/// Extracts the JSON array from the model output and validates every entry.
/// Anything downstream of this function only ever sees valid drafts.
fn parse_cards(content: &str) -> PortResult<Vec<CardDraft>> {
    // The model occasionally wraps the array in prose or a code fence.
    let start = content.find('[');
    let end = content.rfind(']');
    let json = match (start, end) {
        (Some(s), Some(e)) if s < e => &content[s..=e],
        _ => {
            return Err(PortError::Unexpected(
                "Card generation LLM response contained no JSON array".to_string(),
            ))
        }
    };

    let raw: Vec<RawCard> = serde_json::from_str(json)
        .map_err(|e| PortError::Unexpected(format!("Failed to parse generated cards: {}", e)))?;

    raw.into_iter()
        .map(|card| {
            let difficulty = match card.difficulty {
                Some(label) => Difficulty::from_str(&label)
                    .map_err(|e| PortError::Unexpected(e.to_string()))?,
                None => Difficulty::default(),
            };
            Ok(CardDraft {
                question: card.question,
                answer: card.answer,
                difficulty,
            })
        })
        .collect()
}

//=========================================================================================
// `CardGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CardGenerationService for OpenAiCardsAdapter {
    /// Generates flashcard drafts covering the key facts in `content`.
    async fn generate_cards(
        &self,
        content: &str,
        subject_name: &str,
        number_of_cards: u32,
    ) -> PortResult<Vec<CardDraft>> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(
                    "You are an expert educator who creates effective flashcards for \
                     spaced-repetition study. Always respond with valid JSON only.",
                )
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(format!(
                    "Create {} flashcards for the subject \"{}\" from the following material:\n\n\
                     {}\n\n\
                     Format your response as a JSON array with this structure:\n\
                     [\n  {{\"question\": \"...\", \"answer\": \"...\", \"difficulty\": \"easy|medium|hard\"}}\n]\n\n\
                     Each question should test one fact or concept, and the difficulty should \
                     reflect how hard the card is to recall.",
                    number_of_cards, subject_name, content
                ))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error if it occurs, which respects
        // the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected(
                    "Card generation LLM returned no text content in its response.".to_string(),
                )
            })?;

        parse_cards(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_plain_json_array() {
        let drafts = parse_cards(
            r#"[{"question": "Q1", "answer": "A1", "difficulty": "hard"},
                {"question": "Q2", "answer": "A2"}]"#,
        )
        .unwrap();

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].difficulty, Difficulty::Hard);
        assert_eq!(drafts[1].difficulty, Difficulty::Medium);
    }

    #[test]
    fn strips_surrounding_prose_and_fences() {
        let drafts = parse_cards(
            "Here are your cards:\n```json\n[{\"question\": \"Q\", \"answer\": \"A\"}]\n```",
        )
        .unwrap();
        assert_eq!(drafts.len(), 1);
    }

    #[test]
    fn rejects_output_without_an_array() {
        assert!(parse_cards("Sorry, I cannot help with that.").is_err());
    }

    #[test]
    fn rejects_unknown_difficulty_labels() {
        let result =
            parse_cards(r#"[{"question": "Q", "answer": "A", "difficulty": "impossible"}]"#);
        assert!(result.is_err());
    }
}
