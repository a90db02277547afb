use serde::Serialize;

use crate::error::Error;
use crate::models::question::Question;
use crate::services::ai_service::QuizProvider;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageResolutionReport {
    pub requested: usize,
    pub resolved: usize,
    pub failed: Vec<String>,
}

/// Questions that get an illustration: the first `image_count` carrying a prompt.
pub fn image_candidates(questions: &[Question], image_count: usize) -> Vec<&Question> {
    questions
        .iter()
        .filter(|q| q.image_prompt.as_deref().is_some_and(|p| !p.trim().is_empty()))
        .take(image_count)
        .collect()
}

/// Resolves images one at a time, in document order. A failed or empty result
/// only costs that question its image; `on_resolved` sees each success as soon
/// as it arrives.
pub async fn resolve_images<F>(
    provider: &dyn QuizProvider,
    questions: &[Question],
    image_count: usize,
    mut on_resolved: F,
) -> ImageResolutionReport
where
    F: FnMut(&str, String),
{
    let candidates = image_candidates(questions, image_count);
    let mut report = ImageResolutionReport {
        requested: candidates.len(),
        ..Default::default()
    };

    for question in candidates {
        let Some(prompt) = question.image_prompt.as_deref() else {
            continue;
        };
        let outcome = match provider.generate_image(prompt).await {
            Ok(Some(url)) => Ok(url),
            Ok(None) => Err(Error::ImageResolution("provider returned no image".to_string())),
            Err(e) => Err(Error::ImageResolution(e.to_string())),
        };

        match outcome {
            Ok(url) => {
                tracing::info!(question_id = %question.id, "Image resolved");
                on_resolved(&question.id, url);
                report.resolved += 1;
            }
            Err(e) => {
                tracing::warn!(question_id = %question.id, error = %e, "Image skipped");
                report.failed.push(question.id.clone());
            }
        }
    }
    report
}
