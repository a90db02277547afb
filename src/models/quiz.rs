use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::question::{BlueprintEntry, Question};
use crate::models::quiz_config::QuizConfig;

/// A generated quiz, replaced wholesale on every new generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuiz {
    pub questions: Vec<Question>,
    pub blueprint: Vec<BlueprintEntry>,
    pub metadata: QuizConfig,
    pub generated_at: DateTime<Utc>,
}

impl GeneratedQuiz {
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

/// Question id -> inline `data:` URL. Kept apart from the quiz so images can
/// arrive after the text is already displayable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageMap(HashMap<String, String>);

impl ImageMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, question_id: &str) -> Option<&str> {
        self.0.get(question_id).map(String::as_str)
    }

    pub fn insert(&mut self, question_id: impl Into<String>, data_url: impl Into<String>) {
        self.0.insert(question_id.into(), data_url.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
