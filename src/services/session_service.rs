use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::quiz::{GeneratedQuiz, ImageMap};
use crate::models::quiz_config::QuizConfig;

/// One teacher's workspace: the draft configuration plus whatever quiz was
/// generated from it last.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub config: QuizConfig,
    pub quiz: Option<Arc<GeneratedQuiz>>,
    pub images: ImageMap,
    pub busy: bool,
    pub generation: u64,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl Session {
    fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            config: QuizConfig::default(),
            quiz: None,
            images: ImageMap::new(),
            busy: false,
            generation: 0,
            created_at: now,
            last_active: now,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub id: Uuid,
    pub busy: bool,
    pub has_quiz: bool,
    pub generation: u64,
    pub total_questions: u32,
    pub resolved_images: usize,
    pub created_at: DateTime<Utc>,
    pub config: QuizConfig,
}

impl From<&Session> for SessionStatus {
    fn from(s: &Session) -> Self {
        Self {
            id: s.id,
            busy: s.busy,
            has_quiz: s.quiz.is_some(),
            generation: s.generation,
            total_questions: s.config.total_active_question_count(),
            resolved_images: s.images.len(),
            created_at: s.created_at,
            config: s.config.clone(),
        }
    }
}

/// In-memory, per-session state. Every write goes through a short critical
/// section; the lock is never held across an await point.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self) -> SessionStatus {
        let session = Session::new(Uuid::new_v4());
        let status = SessionStatus::from(&session);
        self.sessions
            .write()
            .expect("session store lock poisoned")
            .insert(session.id, session);
        tracing::info!(session_id = %status.id, "Session created");
        status
    }

    pub fn remove(&self, id: Uuid) -> Result<()> {
        self.sessions
            .write()
            .expect("session store lock poisoned")
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found(id))
    }

    pub fn status(&self, id: Uuid) -> Result<SessionStatus> {
        self.read(id, |s| SessionStatus::from(s))
    }

    pub fn config(&self, id: Uuid) -> Result<QuizConfig> {
        self.read(id, |s| s.config.clone())
    }

    /// Applies `f` to the draft configuration. On error the draft is left as it was.
    pub fn update_config<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut QuizConfig) -> Result<T>,
    ) -> Result<T> {
        self.write(id, |s| {
            let mut draft = s.config.clone();
            let out = f(&mut draft)?;
            s.config = draft;
            Ok(out)
        })?
    }

    /// Current quiz with a copy of the images resolved so far.
    pub fn current(&self, id: Uuid) -> Result<Option<(Arc<GeneratedQuiz>, ImageMap)>> {
        self.read(id, |s| s.quiz.clone().map(|q| (q, s.images.clone())))
    }

    pub fn images(&self, id: Uuid) -> Result<ImageMap> {
        self.read(id, |s| s.images.clone())
    }

    /// Marks the session busy and snapshots its configuration. Fails while
    /// another generation is still running.
    pub fn begin_generation(&self, id: Uuid) -> Result<(QuizConfig, GenerationGuard)> {
        let (config, generation) = self.write(id, |s| {
            if s.busy {
                return Err(Error::Conflict(
                    "A generation is already in progress for this session".to_string(),
                ));
            }
            s.config.ensure_submittable()?;
            s.busy = true;
            s.generation += 1;
            Ok((s.config.clone(), s.generation))
        })??;

        Ok((
            config,
            GenerationGuard {
                store: self.clone(),
                session_id: id,
                generation,
            },
        ))
    }

    /// Replaces the quiz and image map wholesale.
    pub fn install_quiz(&self, guard: &GenerationGuard, quiz: Arc<GeneratedQuiz>) -> Result<()> {
        self.write(guard.session_id, |s| {
            if s.generation == guard.generation {
                s.quiz = Some(quiz);
                s.images = ImageMap::new();
            }
        })
    }

    /// Returns `false` when the image belongs to a generation that has since been replaced.
    pub fn attach_image(&self, guard: &GenerationGuard, question_id: &str, data_url: String) -> bool {
        self.write(guard.session_id, |s| {
            let current = s.generation == guard.generation
                && s.quiz.as_ref().is_some_and(|q| q.question(question_id).is_some());
            if current {
                s.images.insert(question_id, data_url);
            }
            current
        })
        .unwrap_or(false)
    }

    /// Drops sessions idle for longer than `ttl`; returns how many went.
    pub fn purge_idle(&self, ttl: Duration) -> usize {
        let cutoff = Utc::now() - ttl;
        let mut sessions = self.sessions.write().expect("session store lock poisoned");
        let before = sessions.len();
        sessions.retain(|_, s| s.busy || s.last_active >= cutoff);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().expect("session store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, id: Uuid, generation: u64) {
        let _ = self.write(id, |s| {
            if s.generation == generation {
                s.busy = false;
            }
        });
    }

    fn read<T>(&self, id: Uuid, f: impl FnOnce(&Session) -> T) -> Result<T> {
        let sessions = self.sessions.read().expect("session store lock poisoned");
        sessions.get(&id).map(f).ok_or_else(|| not_found(id))
    }

    fn write<T>(&self, id: Uuid, f: impl FnOnce(&mut Session) -> T) -> Result<T> {
        let mut sessions = self.sessions.write().expect("session store lock poisoned");
        let session = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
        session.last_active = Utc::now();
        Ok(f(session))
    }
}

fn not_found(id: Uuid) -> Error {
    Error::NotFound(format!("Session {} not found", id))
}

/// Holds a session's busy flag for one generation; dropping it releases the flag.
pub struct GenerationGuard {
    store: SessionStore,
    session_id: Uuid,
    generation: u64,
}

impl GenerationGuard {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for GenerationGuard {
    fn drop(&mut self) {
        self.store.release(self.session_id, self.generation);
        tracing::debug!(session_id = %self.session_id, generation = self.generation, "Session released");
    }
}
