use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::quiz::GeneratedQuiz;
use crate::services::ai_service::QuizProvider;
use crate::services::image_service::{self, ImageResolutionReport};
use crate::services::prompt_service;
use crate::services::quiz_validator::{self, ValidationPolicy};
use crate::services::session_service::{GenerationGuard, SessionStore};

/// Runs one generation for a session: request, provider call, validation,
/// installation, then serial image resolution.
#[derive(Clone)]
pub struct GenerationService {
    provider: Arc<dyn QuizProvider>,
    sessions: SessionStore,
    policy: ValidationPolicy,
}

impl GenerationService {
    pub fn new(provider: Arc<dyn QuizProvider>, sessions: SessionStore, policy: ValidationPolicy) -> Self {
        Self {
            provider,
            sessions,
            policy,
        }
    }

    /// Generates and installs a quiz. Any failure leaves the session's previous
    /// quiz in place and releases the busy flag. Images, if requested, resolve
    /// in a background task that keeps the session busy until it finishes.
    pub async fn generate(&self, session_id: Uuid) -> Result<Arc<GeneratedQuiz>> {
        let (quiz, guard) = self.generate_text(session_id).await?;

        let image_count = quiz.metadata.image_count as usize;
        if quiz.metadata.include_images && image_count > 0 {
            let service = self.clone();
            let quiz_for_images = quiz.clone();
            tokio::spawn(async move {
                let report = service.resolve_images(&quiz_for_images, &guard).await;
                tracing::info!(
                    session_id = %guard.session_id(),
                    requested = report.requested,
                    resolved = report.resolved,
                    failed = report.failed.len(),
                    "Image resolution finished"
                );
            });
        }

        Ok(quiz)
    }

    /// Text half of a generation. The returned guard keeps the session busy.
    pub async fn generate_text(&self, session_id: Uuid) -> Result<(Arc<GeneratedQuiz>, GenerationGuard)> {
        let (config, guard) = self.sessions.begin_generation(session_id)?;
        tracing::info!(
            session_id = %session_id,
            generation = guard.generation(),
            total = config.total_active_question_count(),
            "Quiz generation started"
        );

        let request = prompt_service::build_request(&config)?;
        let raw = self
            .provider
            .generate_quiz(&request.instruction, &request.schema)
            .await
            .map_err(|e| {
                tracing::error!(session_id = %session_id, error = %e, "Quiz generation call failed");
                e
            })?;
        let quiz = Arc::new(quiz_validator::parse_response(&raw, &config, self.policy)?);

        self.sessions.install_quiz(&guard, quiz.clone())?;
        tracing::info!(
            session_id = %session_id,
            questions = quiz.questions.len(),
            "Quiz installed"
        );
        Ok((quiz, guard))
    }

    pub async fn resolve_images(
        &self,
        quiz: &GeneratedQuiz,
        guard: &GenerationGuard,
    ) -> ImageResolutionReport {
        image_service::resolve_images(
            self.provider.as_ref(),
            &quiz.questions,
            quiz.metadata.image_count as usize,
            |question_id, url| {
                if !self.sessions.attach_image(guard, question_id, url) {
                    tracing::debug!(question_id = %question_id, "Image arrived for a replaced quiz");
                }
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::services::ai_service::MockQuizProvider;
    use serde_json::json;

    fn valid_response(count: usize, with_prompts: bool) -> String {
        let questions: Vec<_> = (1..=count)
            .map(|i| {
                let mut q = json!({
                    "id": format!("q{}", i),
                    "type": "pgs",
                    "difficulty": "Sedang",
                    "questionText": format!("Soal nomor {}", i),
                    "options": [
                        { "label": "A", "text": "satu" },
                        { "label": "B", "text": "dua" }
                    ],
                    "correctAnswer": "A",
                    "explanation": "Karena satu."
                });
                if with_prompts {
                    q["imagePrompt"] = json!(format!("gambar {}", i));
                }
                q
            })
            .collect();
        json!({
            "questions": questions,
            "blueprint": [{ "no": 3, "competency": "K", "indicator": "I", "level": "C1", "type": "pgs" }]
        })
        .to_string()
    }

    fn session_with(store: &SessionStore, count: u32, images: u32) -> Uuid {
        let id = store.create().id;
        store
            .update_config(id, |c| {
                c.update_question_type("pgs", Some(count), Some(true))?;
                c.include_images = images > 0;
                c.set_image_count(images);
                Ok(())
            })
            .unwrap();
        id
    }

    #[tokio::test]
    async fn installs_quiz_and_releases_busy() {
        let store = SessionStore::new();
        let id = session_with(&store, 3, 0);
        let mut provider = MockQuizProvider::new();
        provider
            .expect_generate_quiz()
            .withf(|instruction, _| instruction.contains("exactly 3 questions in total"))
            .times(1)
            .returning(|_, _| Ok(valid_response(3, false)));
        provider.expect_generate_image().never();

        let service = GenerationService::new(Arc::new(provider), store.clone(), ValidationPolicy::Strict);
        let quiz = service.generate(id).await.unwrap();

        assert_eq!(quiz.questions.len(), 3);
        assert_eq!(quiz.blueprint[0].no, 1);
        let status = store.status(id).unwrap();
        assert!(status.has_quiz);
        assert!(!status.busy);
        assert!(store.images(id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_response_keeps_previous_quiz() {
        let store = SessionStore::new();
        let id = session_with(&store, 2, 0);
        let mut provider = MockQuizProvider::new();
        let mut calls = 0;
        provider.expect_generate_quiz().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Ok(valid_response(2, false))
            } else {
                Ok("{\"questions\": [ this is not json".to_string())
            }
        });

        let service = GenerationService::new(Arc::new(provider), store.clone(), ValidationPolicy::Strict);
        let first = service.generate(id).await.unwrap();

        let err = service.generate(id).await.unwrap_err();
        assert!(matches!(err, Error::ResponseFormat(_)));

        let (current, _) = store.current(id).unwrap().unwrap();
        assert_eq!(current, first);
        assert!(!store.status(id).unwrap().busy);
    }

    #[tokio::test]
    async fn transport_failure_releases_busy() {
        let store = SessionStore::new();
        let id = session_with(&store, 1, 0);
        let mut provider = MockQuizProvider::new();
        provider
            .expect_generate_quiz()
            .returning(|_, _| Err(Error::GenerationTransport("connection reset".to_string())));

        let service = GenerationService::new(Arc::new(provider), store.clone(), ValidationPolicy::Strict);
        let err = service.generate(id).await.unwrap_err();
        assert!(matches!(err, Error::GenerationTransport(_)));
        let status = store.status(id).unwrap();
        assert!(!status.busy);
        assert!(!status.has_quiz);
    }

    #[tokio::test]
    async fn zero_questions_never_reach_the_provider() {
        let store = SessionStore::new();
        let id = store.create().id;
        let mut provider = MockQuizProvider::new();
        provider.expect_generate_quiz().never();

        let service = GenerationService::new(Arc::new(provider), store.clone(), ValidationPolicy::Strict);
        let err = service.generate(id).await.unwrap_err();
        assert!(matches!(err, Error::ConfigurationInvalid(_)));
    }

    #[tokio::test]
    async fn images_attach_by_id_and_failures_are_isolated() {
        let store = SessionStore::new();
        let id = session_with(&store, 3, 3);
        let mut provider = MockQuizProvider::new();
        provider
            .expect_generate_quiz()
            .returning(|_, _| Ok(valid_response(3, true)));
        provider.expect_generate_image().times(3).returning(|prompt| {
            if prompt == "gambar 2" {
                Err(Error::ImageResolution("blocked".to_string()))
            } else {
                Ok(Some(format!("data:image/png;base64,{}", prompt.len())))
            }
        });

        let service = GenerationService::new(Arc::new(provider), store.clone(), ValidationPolicy::Strict);
        let (quiz, guard) = service.generate_text(id).await.unwrap();
        assert!(store.status(id).unwrap().busy);

        let report = service.resolve_images(&quiz, &guard).await;
        drop(guard);

        assert_eq!(report.resolved, 2);
        let images = store.images(id).unwrap();
        assert!(images.get("q1").is_some());
        assert!(images.get("q2").is_none());
        assert!(images.get("q3").is_some());
        assert!(!store.status(id).unwrap().busy);
    }
}
