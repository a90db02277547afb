use chrono::Utc;
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::models::catalog::AnswerShape;
use crate::models::question::{BlueprintEntry, Question, QuestionOption};
use crate::models::quiz::GeneratedQuiz;
use crate::models::quiz_config::QuizConfig;

/// What to do when a parsed response breaks the requested contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationPolicy {
    /// Reject the response.
    #[default]
    Strict,
    /// Log the finding and keep the quiz.
    Lenient,
}

impl FromStr for ValidationPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(ValidationPolicy::Strict),
            "lenient" => Ok(ValidationPolicy::Lenient),
            other => Err(format!("expected 'strict' or 'lenient', got '{}'", other)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawResponse {
    questions: Vec<RawQuestion>,
    #[serde(default)]
    blueprint: Option<Vec<RawBlueprintEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(rename = "type")]
    question_type: String,
    difficulty: String,
    question_text: String,
    #[serde(default)]
    stimulus: Option<String>,
    #[serde(default)]
    options: Option<Vec<QuestionOption>>,
    #[serde(deserialize_with = "string_or_number")]
    correct_answer: String,
    explanation: String,
    #[serde(default)]
    image_prompt: Option<String>,
    #[serde(default)]
    indicator: Option<String>,
}

/// Provider numbering (`no`) is never read; entries are renumbered by position.
#[derive(Debug, Deserialize)]
struct RawBlueprintEntry {
    #[serde(default)]
    competency: String,
    #[serde(default)]
    indicator: String,
    #[serde(default)]
    level: String,
    #[serde(rename = "type", default)]
    question_type: String,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match JsonValue::deserialize(deserializer)? {
        JsonValue::String(s) => Ok(s),
        JsonValue::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Removes a surrounding markdown code fence (```json … ```), if any.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Turns raw provider output into a [`GeneratedQuiz`] bound to `config`.
pub fn parse_response(
    raw: &str,
    config: &QuizConfig,
    policy: ValidationPolicy,
) -> Result<GeneratedQuiz> {
    let body = strip_code_fence(raw);
    let parsed: RawResponse = serde_json::from_str(body).map_err(|e| {
        tracing::error!(error = %e, "AI response is not a valid quiz document");
        Error::ResponseFormat(e.to_string())
    })?;

    let mut questions: Vec<Question> = parsed
        .questions
        .into_iter()
        .map(|q| Question {
            id: q.id.trim().to_string(),
            question_type: q.question_type.trim().to_string(),
            difficulty: q.difficulty,
            question_text: q.question_text,
            stimulus: blank_to_none(q.stimulus),
            options: q.options.filter(|o| !o.is_empty()).map(|opts| {
                opts.into_iter()
                    .map(|o| QuestionOption {
                        label: o.label.trim().trim_end_matches('.').to_string(),
                        text: o.text,
                    })
                    .collect()
            }),
            correct_answer: q.correct_answer.trim().to_string(),
            explanation: q.explanation,
            image_prompt: blank_to_none(q.image_prompt),
            indicator: blank_to_none(q.indicator),
        })
        .collect();

    let blueprint = renumber_blueprint(parsed.blueprint.unwrap_or_default());

    let mut findings = Vec::new();
    check_counts(&questions, config, &mut findings);
    check_types(&questions, config, &mut findings);
    check_answers(&questions, config, &mut findings);
    let blank: Vec<String> = questions
        .iter()
        .enumerate()
        .filter(|(_, q)| q.id.is_empty())
        .map(|(idx, _)| (idx + 1).to_string())
        .collect();
    if !blank.is_empty() {
        findings.push(format!("questions without id at positions: {}", blank.join(", ")));
    }
    let duplicates = duplicate_ids(&questions);
    if !duplicates.is_empty() {
        findings.push(format!("duplicate question ids: {}", duplicates.join(", ")));
    }

    if !findings.is_empty() {
        match policy {
            ValidationPolicy::Strict => {
                tracing::error!(?findings, "AI response rejected");
                return Err(Error::ResponseFormat(findings.join("; ")));
            }
            ValidationPolicy::Lenient => {
                for finding in &findings {
                    tracing::warn!(finding = %finding, "AI response accepted with inconsistency");
                }
                make_ids_unique(&mut questions);
            }
        }
    }

    tracing::info!(
        questions = questions.len(),
        blueprint = blueprint.len(),
        "AI response normalized"
    );

    Ok(GeneratedQuiz {
        questions,
        blueprint,
        metadata: config.clone(),
        generated_at: Utc::now(),
    })
}

fn renumber_blueprint(entries: Vec<RawBlueprintEntry>) -> Vec<BlueprintEntry> {
    entries
        .into_iter()
        .enumerate()
        .map(|(idx, e)| BlueprintEntry {
            no: idx as u32 + 1,
            competency: e.competency,
            indicator: e.indicator,
            level: e.level,
            question_type: e.question_type,
        })
        .collect()
}

fn check_counts(questions: &[Question], config: &QuizConfig, findings: &mut Vec<String>) {
    let expected_total = config.total_active_question_count() as usize;
    if questions.len() != expected_total {
        findings.push(format!(
            "expected {} questions, got {}",
            expected_total,
            questions.len()
        ));
    }

    let mut actual: HashMap<&str, usize> = HashMap::new();
    for q in questions {
        *actual.entry(q.question_type.as_str()).or_default() += 1;
    }
    for entry in config.requested_types() {
        let got = actual.get(entry.id.as_str()).copied().unwrap_or(0);
        if got != entry.count as usize {
            findings.push(format!(
                "expected {} questions of type {}, got {}",
                entry.count, entry.id, got
            ));
        }
    }
}

fn check_types(questions: &[Question], config: &QuizConfig, findings: &mut Vec<String>) {
    let requested: HashSet<&str> = config.requested_types().map(|t| t.id.as_str()).collect();
    for q in questions {
        if config.archetype(&q.question_type).is_none() {
            findings.push(format!("question {} has unknown type {}", q.id, q.question_type));
        } else if !requested.contains(q.question_type.as_str()) {
            findings.push(format!(
                "question {} has type {} which was not requested",
                q.id, q.question_type
            ));
        }
    }
}

fn check_answers(questions: &[Question], config: &QuizConfig, findings: &mut Vec<String>) {
    for q in questions {
        let Some(options) = q.options.as_ref() else {
            continue;
        };
        let labels: HashSet<String> = options.iter().map(|o| o.label.to_uppercase()).collect();
        let answer = q.answer_labels();
        let shape = config
            .archetype(&q.question_type)
            .map(|a| a.answer_shape)
            .unwrap_or(AnswerShape::SingleOption);

        let valid = match shape {
            AnswerShape::MultipleOptions | AnswerShape::Open => {
                !answer.is_empty() && answer.iter().all(|l| labels.contains(l))
            }
            AnswerShape::SingleOption => {
                answer.first().is_some_and(|l| labels.contains(l))
                    && answer.iter().filter(|l| labels.contains(*l)).count() == 1
            }
        };
        if !valid {
            findings.push(format!(
                "question {} answer '{}' does not name one of its options",
                q.id, q.correct_answer
            ));
        }
    }
}

fn duplicate_ids(questions: &[Question]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for q in questions {
        if !seen.insert(q.id.as_str()) && !duplicates.contains(&q.id) {
            duplicates.push(q.id.clone());
        }
    }
    duplicates
}

/// Image lookups are keyed by id, so ids have to be unique even when lenient.
fn make_ids_unique(questions: &mut [Question]) {
    let mut seen: HashSet<String> = HashSet::new();
    for (idx, q) in questions.iter_mut().enumerate() {
        if q.id.is_empty() || seen.contains(&q.id) {
            let mut candidate = if q.id.is_empty() {
                format!("q{}", idx + 1)
            } else {
                format!("{}-{}", q.id, idx + 1)
            };
            while seen.contains(&candidate) {
                candidate.push('_');
            }
            q.id = candidate;
        }
        seen.insert(q.id.clone());
    }
}
