use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::catalog::{self, Archetype};

pub const MAX_COUNT_PER_TYPE: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppMode {
    School,
    Tutoring,
}

impl AppMode {
    pub fn label(&self) -> &'static str {
        match self {
            AppMode::School => "Guru Sekolah",
            AppMode::Tutoring => "Guru Bimbel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Indonesian,
    English,
}

impl Language {
    pub fn label(&self) -> &'static str {
        match self {
            Language::Indonesian => "Indonesia",
            Language::English => "Inggris",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DifficultyLevel {
    L1,
    L2,
    L3,
    L4,
    L5,
}

impl DifficultyLevel {
    pub fn label(&self) -> &'static str {
        match self {
            DifficultyLevel::L1 => "Level 1: Mudah (Pemahaman Dasar)",
            DifficultyLevel::L2 => "Level 2: Sedang (Aplikasi)",
            DifficultyLevel::L3 => "Level 3: Sulit (Analisis)",
            DifficultyLevel::L4 => "Level 4: HOTS (Evaluasi & Kreasi)",
            DifficultyLevel::L5 => "Level 5: Olimpiade (Expert)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageStyle {
    Formal,
    SemiFormal,
    Simple,
    Madrasah,
    Tutoring,
}

impl LanguageStyle {
    pub fn label(&self) -> &'static str {
        match self {
            LanguageStyle::Formal => "Bahasa Formal Sekolah (Baku Akademik)",
            LanguageStyle::SemiFormal => "Bahasa Semi Formal (Luwes - Komunikatif)",
            LanguageStyle::Simple => "Bahasa Sederhana (Ramah Anak PAUD/SD)",
            LanguageStyle::Madrasah => "Bahasa Madrasah (Islami & Santun)",
            LanguageStyle::Tutoring => "Bahasa Bimbel (Trik Cepat)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKeyMode {
    Complete,
    Brief,
    Rubric,
}

impl AnswerKeyMode {
    pub fn label(&self) -> &'static str {
        match self {
            AnswerKeyMode::Complete => "Lengkap (Kunci + Pembahasan Detail)",
            AnswerKeyMode::Brief => "Ringkas (Hanya Kunci Jawaban)",
            AnswerKeyMode::Rubric => "Rubrik Penilaian dan Skor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionMode {
    Proportional,
    Flat,
    Hots,
    Remedial,
}

impl DistributionMode {
    pub fn label(&self) -> &'static str {
        match self {
            DistributionMode::Proportional => "Proporsional",
            DistributionMode::Flat => "Flat/Merata",
            DistributionMode::Hots => "Dominan HOTS",
            DistributionMode::Remedial => "Mode Remedial",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetencyMode {
    Auto,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuestionTypeEntry {
    pub id: String,
    pub label: String,
    #[validate(range(max = 50, message = "At most 50 questions per type"))]
    pub count: u32,
    pub active: bool,
}

impl From<&Archetype> for QuestionTypeEntry {
    fn from(archetype: &Archetype) -> Self {
        Self {
            id: archetype.id.to_string(),
            label: archetype.label.to_string(),
            count: 0,
            active: false,
        }
    }
}

/// Every parameter a teacher picks before asking for a quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuizConfig {
    pub mode: AppMode,
    pub language: Language,
    #[validate(length(min = 1, max = 50))]
    pub level: String,
    #[validate(length(max = 50))]
    pub grade: String,
    #[validate(length(min = 1, max = 120))]
    pub subject: String,
    #[validate(length(max = 120))]
    pub assessment_type: String,
    #[validate(length(max = 300))]
    pub topic: String,
    #[serde(default)]
    pub summary_text: String,
    pub competency_mode: CompetencyMode,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub competency_input: String,
    pub answer_key_mode: AnswerKeyMode,
    #[validate(nested)]
    pub question_types: Vec<QuestionTypeEntry>,
    #[validate(range(min = 3, max = 5, message = "Multiple-choice options must be 3, 4 or 5"))]
    pub mc_options: u8,
    pub include_images: bool,
    pub image_count: u32,
    pub language_style: LanguageStyle,
    pub stimulus_mode: bool,
    pub difficulty: DifficultyLevel,
    pub distribution: DistributionMode,
    #[validate(range(min = 1, max = 600, message = "Time limit must be 1-600 minutes"))]
    pub time_limit: u32,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            mode: AppMode::School,
            language: Language::Indonesian,
            level: "SMA".to_string(),
            grade: "Kelas 10".to_string(),
            subject: "Matematika".to_string(),
            assessment_type: "Ulangan Harian".to_string(),
            topic: String::new(),
            summary_text: String::new(),
            competency_mode: CompetencyMode::Auto,
            competency_input: String::new(),
            answer_key_mode: AnswerKeyMode::Complete,
            question_types: catalog_entries(AppMode::School),
            mc_options: 5,
            include_images: false,
            image_count: 0,
            language_style: LanguageStyle::Formal,
            stimulus_mode: true,
            difficulty: DifficultyLevel::L2,
            distribution: DistributionMode::Proportional,
            time_limit: 90,
        }
    }
}

fn catalog_entries(mode: AppMode) -> Vec<QuestionTypeEntry> {
    catalog::archetypes_for(mode)
        .iter()
        .map(QuestionTypeEntry::from)
        .collect()
}

impl QuizConfig {
    pub fn total_active_question_count(&self) -> u32 {
        self.question_types
            .iter()
            .filter(|t| t.active)
            .map(|t| t.count)
            .sum()
    }

    /// Active entries that actually ask for questions, in catalog order.
    pub fn requested_types(&self) -> impl Iterator<Item = &QuestionTypeEntry> {
        self.question_types.iter().filter(|t| t.active && t.count > 0)
    }

    pub fn clamp_image_count(&mut self) {
        let total = self.total_active_question_count();
        if self.image_count > total {
            self.image_count = total;
        }
    }

    /// Switching mode swaps in the other catalog with every entry reset.
    pub fn set_mode(&mut self, mode: AppMode) {
        self.mode = mode;
        self.question_types = catalog_entries(mode);
        self.clamp_image_count();
    }

    pub fn set_level(&mut self, level: &str) {
        self.level = level.to_string();
        self.grade = catalog::grades_for(level)
            .and_then(|grades| grades.first())
            .map(|g| g.to_string())
            .unwrap_or_default();
    }

    pub fn update_question_type(
        &mut self,
        id: &str,
        count: Option<u32>,
        active: Option<bool>,
    ) -> Result<&QuestionTypeEntry> {
        if let Some(count) = count {
            if count > MAX_COUNT_PER_TYPE {
                return Err(Error::BadRequest(format!(
                    "Count for {} must not exceed {}",
                    id, MAX_COUNT_PER_TYPE
                )));
            }
        }

        let idx = self
            .question_types
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| Error::BadRequest(format!("Unknown question type: {}", id)))?;

        {
            let entry = &mut self.question_types[idx];
            if let Some(count) = count {
                entry.count = count;
            }
            if let Some(active) = active {
                entry.active = active;
            }
        }
        self.clamp_image_count();
        Ok(&self.question_types[idx])
    }

    pub fn set_image_count(&mut self, image_count: u32) {
        self.image_count = image_count;
        self.clamp_image_count();
    }

    /// Submission gate: nothing to generate means nothing is sent.
    pub fn ensure_submittable(&self) -> Result<()> {
        if self.total_active_question_count() == 0 {
            return Err(Error::ConfigurationInvalid(
                "Select at least one question type with a count above zero".to_string(),
            ));
        }
        Ok(())
    }

    /// The question-type entries must be exactly the catalog of the selected mode.
    pub fn check_catalog(&self) -> Result<()> {
        let expected = catalog::archetypes_for(self.mode);
        if self.question_types.len() != expected.len()
            || self
                .question_types
                .iter()
                .zip(expected)
                .any(|(entry, archetype)| entry.id != archetype.id)
        {
            return Err(Error::BadRequest(format!(
                "Question types do not match the {} catalog",
                self.mode.label()
            )));
        }

        if let Some(grades) = catalog::grades_for(&self.level) {
            if !grades.contains(&self.grade.as_str()) {
                return Err(Error::BadRequest(format!(
                    "Grade {} is not available for level {}",
                    self.grade, self.level
                )));
            }
        }
        Ok(())
    }

    pub fn archetype(&self, id: &str) -> Option<&'static Archetype> {
        catalog::find_archetype(self.mode, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_counts(counts: &[(&str, u32, bool)]) -> QuizConfig {
        let mut config = QuizConfig::default();
        for (id, count, active) in counts {
            config
                .update_question_type(id, Some(*count), Some(*active))
                .unwrap();
        }
        config
    }

    #[test]
    fn total_counts_only_active_entries() {
        let config = with_counts(&[("pgs", 10, true), ("essay", 3, false), ("bs_akm", 2, true)]);
        assert_eq!(config.total_active_question_count(), 12);
        assert_eq!(config.requested_types().count(), 2);
    }

    #[test]
    fn zero_total_is_not_submittable() {
        let config = with_counts(&[("pgs", 0, true), ("essay", 4, false)]);
        assert_eq!(config.total_active_question_count(), 0);
        assert!(matches!(
            config.ensure_submittable(),
            Err(Error::ConfigurationInvalid(_))
        ));

        let config = with_counts(&[("pgs", 1, true)]);
        assert!(config.ensure_submittable().is_ok());
    }

    #[test]
    fn image_count_follows_total() {
        let mut config = with_counts(&[("pgs", 4, true), ("isian", 2, true)]);
        config.set_image_count(5);
        assert_eq!(config.image_count, 5);

        config.update_question_type("isian", None, Some(false)).unwrap();
        assert_eq!(config.image_count, 4);

        config.update_question_type("pgs", Some(1), None).unwrap();
        assert_eq!(config.image_count, 1);

        config.set_image_count(100);
        assert_eq!(config.image_count, 1);

        config.set_mode(AppMode::Tutoring);
        assert_eq!(config.image_count, 0);
    }

    #[test]
    fn mode_switch_resets_catalog() {
        let mut config = with_counts(&[("pgs", 4, true)]);
        config.set_mode(AppMode::Tutoring);
        assert_eq!(config.question_types.len(), catalog::TUTORING_ARCHETYPES.len());
        assert!(config.question_types.iter().all(|t| !t.active && t.count == 0));
        assert!(config.check_catalog().is_ok());
    }

    #[test]
    fn rejects_unknown_type_and_oversized_count() {
        let mut config = QuizConfig::default();
        assert!(config.update_question_type("tiu", Some(1), None).is_err());
        assert!(config.update_question_type("pgs", Some(51), None).is_err());
        assert_eq!(config.question_types[0].count, 0);
    }

    #[test]
    fn level_change_resets_grade() {
        let mut config = QuizConfig::default();
        config.set_level("SD");
        assert_eq!(config.grade, "Kelas 1");
        config.set_level("Umum");
        assert_eq!(config.grade, "");
        assert!(config.check_catalog().is_ok());
    }

    #[test]
    fn deserializes_camel_case_payload() {
        let mut raw = serde_json::to_value(QuizConfig::default()).unwrap();
        raw["imageCount"] = serde_json::json!(0);
        raw["difficulty"] = serde_json::json!("L4");
        raw["answerKeyMode"] = serde_json::json!("rubric");
        let config: QuizConfig = serde_json::from_value(raw).unwrap();
        assert_eq!(config.difficulty, DifficultyLevel::L4);
        assert_eq!(config.answer_key_mode, AnswerKeyMode::Rubric);
        assert!(config.validate().is_ok());
    }
}
