use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use std::fmt::Write as _;

use crate::error::Result;
use crate::models::catalog::{self, MATCHING_ID, TRUE_FALSE_ID};
use crate::models::quiz_config::{AppMode, CompetencyMode, Language, QuizConfig};

/// Provider-agnostic generation request: what to write and the exact shape to return.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizRequest {
    pub instruction: String,
    pub schema: JsonValue,
}

pub const IMAGE_STYLE_PREFIX: &str =
    "High quality academic illustration, clean educational diagram, white background style: ";

pub fn build_request(config: &QuizConfig) -> Result<QuizRequest> {
    config.ensure_submittable()?;
    Ok(QuizRequest {
        instruction: build_instruction(config),
        schema: output_schema(),
    })
}

pub fn image_prompt(prompt: &str) -> String {
    format!("{}{}", IMAGE_STYLE_PREFIX, prompt.trim())
}

struct TableHeaders {
    statement: &'static str,
    true_col: &'static str,
    false_col: &'static str,
    choices: &'static str,
}

fn table_headers(language: Language) -> TableHeaders {
    match language {
        Language::Indonesian => TableHeaders {
            statement: "Pernyataan",
            true_col: "Benar",
            false_col: "Salah",
            choices: "Pilihan Jawaban (Acak)",
        },
        Language::English => TableHeaders {
            statement: "Statement",
            true_col: "True",
            false_col: "False",
            choices: "Answer Choices (Shuffled)",
        },
    }
}

fn build_instruction(config: &QuizConfig) -> String {
    let total = config.total_active_question_count();
    let requested: Vec<_> = config.requested_types().collect();
    let curriculum = match config.mode {
        AppMode::School => "school curriculum (Kurikulum Merdeka/K13)",
        AppMode::Tutoring => "tutoring-centre and entrance-exam preparation (SNBT/TKA/CPNS)",
    };

    let mut out = String::new();
    // Writes into a String cannot fail.
    let _ = writeln!(
        out,
        "You are an expert curriculum and assessment designer for Indonesian {}.",
        curriculum
    );
    let _ = writeln!(out, "Write high-quality assessment questions from these parameters:");
    let _ = writeln!(out, "Mode: {}", config.mode.label());
    let _ = writeln!(out, "Language: {}", config.language.label());
    let _ = writeln!(out, "Level: {} ({})", config.level, config.grade);
    let _ = writeln!(out, "Subject: {}", config.subject);
    let _ = writeln!(out, "Assessment Type: {}", config.assessment_type);
    let _ = writeln!(out, "Topic: {}", config.topic);
    let _ = writeln!(out, "Language Style: {}", config.language_style.label());
    let _ = writeln!(out, "Difficulty: {}", config.difficulty.label());
    let _ = writeln!(out, "Distribution: {}", config.distribution.label());
    let _ = writeln!(out, "Answer Key: {}", config.answer_key_mode.label());
    let _ = writeln!(out, "Time Limit: {} minutes", config.time_limit);
    match config.competency_mode {
        CompetencyMode::Manual if !config.competency_input.trim().is_empty() => {
            let _ = writeln!(out, "Competency (use exactly): {}", config.competency_input.trim());
        }
        _ => {
            let _ = writeln!(out, "Competency: derive from the topic and grade");
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "REQUIRED QUESTION COUNT: exactly {} questions in total.", total);
    let breakdown = requested
        .iter()
        .map(|t| format!("{} questions of type {} ({})", t.count, t.id, t.label))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(out, "Type breakdown: {}", breakdown);
    let _ = writeln!(
        out,
        "Every question's \"type\" field must be one of the type ids above. \
         Every question needs a unique \"id\"."
    );

    let _ = writeln!(out);
    let _ = writeln!(out, "MATHEMATICAL & CHEMICAL NOTATION:");
    let _ = writeln!(
        out,
        "- Use LaTeX: $...$ inline and $$...$$ for display formulas."
    );

    let headers = table_headers(config.language);
    if requested.iter().any(|t| t.id == TRUE_FALSE_ID) {
        let _ = writeln!(out);
        let _ = writeln!(out, "TRUE/FALSE ({}):", TRUE_FALSE_ID);
        let _ = writeln!(
            out,
            "- You MUST present the statements as a MARKDOWN TABLE inside \"questionText\"."
        );
        let _ = writeln!(
            out,
            "- Columns: \"{}\", \"{}\", \"{}\".",
            headers.statement, headers.true_col, headers.false_col
        );
        let _ = writeln!(
            out,
            "- Put an empty box symbol (☐) in the \"{}\" and \"{}\" cells so it looks like a real answer sheet.",
            headers.true_col, headers.false_col
        );
        let _ = writeln!(out, "- Give at least 3-5 statements per {} question.", TRUE_FALSE_ID);
    }

    if requested.iter().any(|t| t.id == MATCHING_ID) {
        let _ = writeln!(out);
        let _ = writeln!(out, "MATCHING ({}):", MATCHING_ID);
        let _ = writeln!(
            out,
            "- Present the pairs as a MARKDOWN TABLE inside \"questionText\"."
        );
        let _ = writeln!(
            out,
            "- The table has 2 columns: \"{}\" and \"{}\"; shuffle the answer column.",
            headers.statement, headers.choices
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "IMAGES:");
    if config.include_images && config.image_count > 0 {
        let eligible = requested
            .iter()
            .filter(|t| {
                catalog::find_archetype(config.mode, &t.id).is_some_and(|a| a.supports_images)
            })
            .map(|t| t.id.as_str())
            .collect::<Vec<_>>();
        if eligible.is_empty() {
            let _ = writeln!(out, "- Do not include any \"imagePrompt\".");
        } else {
            let _ = writeln!(
                out,
                "- Give a descriptive \"imagePrompt\" only for the first {} questions of types: {}.",
                config.image_count,
                eligible.join(", ")
            );
            let _ = writeln!(out, "- Leave \"imagePrompt\" out of every other question.");
        }
    } else {
        let _ = writeln!(out, "- Do not include any \"imagePrompt\".");
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Multiple-choice options: {} options labelled {}.",
        config.mc_options,
        option_labels(config.mc_options).join(", ")
    );
    let _ = writeln!(
        out,
        "For questions with options, \"correctAnswer\" must be the label of the correct option \
         (comma-separated labels when several are correct)."
    );
    let _ = writeln!(
        out,
        "Stimulus: {}",
        if config.stimulus_mode {
            "open each question with a stimulus (text, data or case) in \"stimulus\""
        } else {
            "go straight to the question, no stimulus"
        }
    );
    let _ = writeln!(
        out,
        "Blueprint: one \"blueprint\" row per question, in question order, with competency, \
         indicator, cognitive level and type."
    );

    if !config.summary_text.trim().is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Reference Material:");
        let _ = writeln!(out, "<<<");
        let _ = writeln!(out, "{}", config.summary_text.trim());
        let _ = writeln!(out, ">>>");
    }

    let _ = writeln!(out);
    let _ = write!(
        out,
        "Output pure JSON with a 'questions' array containing exactly {} objects.",
        total
    );
    out
}

fn option_labels(count: u8) -> Vec<String> {
    (0..count).map(|i| char::from(b'A' + i).to_string()).collect()
}

/// JSON Schema of the response document.
pub fn output_schema() -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "questions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string" },
                        "type": { "type": "string" },
                        "difficulty": { "type": "string" },
                        "questionText": { "type": "string" },
                        "stimulus": { "type": "string" },
                        "options": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "label": { "type": "string" },
                                    "text": { "type": "string" }
                                },
                                "required": ["label", "text"]
                            }
                        },
                        "correctAnswer": { "type": "string" },
                        "explanation": { "type": "string" },
                        "imagePrompt": { "type": "string" },
                        "indicator": { "type": "string" }
                    },
                    "required": ["id", "type", "questionText", "correctAnswer", "explanation", "difficulty"]
                }
            },
            "blueprint": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "no": { "type": "integer" },
                        "competency": { "type": "string" },
                        "indicator": { "type": "string" },
                        "level": { "type": "string" },
                        "type": { "type": "string" }
                    }
                }
            }
        },
        "required": ["questions", "blueprint"]
    })
}
