use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub label: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: String,
    pub difficulty: String,
    /// Markdown with inline `$…$` / block `$$…$$` LaTeX.
    pub question_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stimulus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<QuestionOption>>,
    pub correct_answer: String,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indicator: Option<String>,
}

impl Question {
    pub fn has_options(&self) -> bool {
        self.options.as_ref().is_some_and(|o| !o.is_empty())
    }

    /// Labels named by `correct_answer`, e.g. `"A, C"` -> `["A", "C"]`.
    pub fn answer_labels(&self) -> Vec<String> {
        self.correct_answer
            .split([',', ';', '/', '&', ' '])
            .map(|s| s.trim().trim_end_matches('.').trim_end_matches(')'))
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("dan") && !s.eq_ignore_ascii_case("and"))
            .map(|s| s.to_uppercase())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlueprintEntry {
    pub no: u32,
    pub competency: String,
    pub indicator: String,
    pub level: String,
    #[serde(rename = "type")]
    pub question_type: String,
}
