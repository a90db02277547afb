use serde::Serialize;

use crate::models::quiz_config::AppMode;

/// How a question archetype expects its answer to be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerShape {
    /// One option label, e.g. `"C"`.
    SingleOption,
    /// One or more option labels, e.g. `"A, C"`.
    MultipleOptions,
    /// Free-form answer, table answers, rubric.
    Open,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Archetype {
    pub id: &'static str,
    pub label: &'static str,
    pub answer_shape: AnswerShape,
    pub supports_images: bool,
}

const fn archetype(
    id: &'static str,
    label: &'static str,
    answer_shape: AnswerShape,
    supports_images: bool,
) -> Archetype {
    Archetype {
        id,
        label,
        answer_shape,
        supports_images,
    }
}

pub const TRUE_FALSE_ID: &str = "bs_akm";
pub const MATCHING_ID: &str = "jodoh";

pub const SCHOOL_ARCHETYPES: &[Archetype] = &[
    archetype("pgs", "Pilihan Ganda Standar", AnswerShape::SingleOption, true),
    archetype("pgk", "Pilihan Ganda Kompleks (Model 1,2,3)", AnswerShape::SingleOption, true),
    archetype("pgk_akm", "Pilihan Ganda Kompleks (AKM-Multi Jawaban)", AnswerShape::MultipleOptions, true),
    archetype(TRUE_FALSE_ID, "Benar / Salah (AKM)", AnswerShape::Open, false),
    archetype("skala", "Skala Sikap (Tabel TS-S-SS)", AnswerShape::Open, false),
    archetype(MATCHING_ID, "Menjodohkan (Matching)", AnswerShape::Open, false),
    archetype("isian", "Isian Singkat", AnswerShape::Open, true),
    archetype("essay", "Essay / Uraian", AnswerShape::Open, true),
    archetype("literasi", "Asesmen Literasi (Teks & Analisis)", AnswerShape::SingleOption, true),
    archetype("numerasi", "Asesmen Numerasi (Data & Tabel)", AnswerShape::SingleOption, true),
    archetype("kasus", "Studi Kasus (HOTS)", AnswerShape::Open, true),
    archetype("urut", "Menyusun Pernyataan / Urutan", AnswerShape::Open, false),
];

pub const TUTORING_ARCHETYPES: &[Archetype] = &[
    archetype("dg", "Drilling Ganda (Speed Test)", AnswerShape::SingleOption, true),
    archetype("pgk_tka", "PG Kompleks (Adaptasi TKA - Model 1-2-3 / Sebab Akibat)", AnswerShape::SingleOption, true),
    archetype("tps", "Tes Potensi Skolastik (TPS - Penalaran Umum)", AnswerShape::SingleOption, true),
    archetype("pk", "Pengetahuan Kuantitatif (Trik Matematika)", AnswerShape::SingleOption, true),
    archetype("pbm", "Pemahaman Bacaan & Menulis (PBM)", AnswerShape::SingleOption, true),
    archetype("eng_snbt", "Literasi Bahasa Inggris (Model SNBT)", AnswerShape::SingleOption, true),
    archetype("mat_pen", "Penalaran Matematika (Soal Cerita Kompleks)", AnswerShape::SingleOption, true),
    archetype("tiu", "Tes Intelegensia Umum (TIU - Kedinasan/CPNS)", AnswerShape::SingleOption, true),
    archetype("twk", "Tes Wawasan Kebangsaan (TWK - Hafalan & Analisis)", AnswerShape::SingleOption, true),
];

pub const SCHOOL_SUBJECTS: &[&str] = &[
    "Pendidikan Agama Islam",
    "Katolik",
    "Kristen Protestan",
    "Pend. Pancasila",
    "Bahasa Indonesia",
    "Matematika",
    "IPA",
    "IPS",
    "Bahasa Inggris",
    "PJOK",
    "Seni Budaya",
    "Informatika",
    "Muatan Lokal (Bahasa Jawa)",
    "Muatan Lokal (Bahasa Sunda)",
];

pub const ASSESSMENT_TYPES: &[&str] = &[
    "Ulangan Harian",
    "ASTS",
    "ASAS",
    "Asesmen Diagnostik",
    "AKM/TKA",
    "US/M",
];

pub const GRADE_MAPPING: &[(&str, &[&str])] = &[
    ("SD", &["Kelas 1", "Kelas 2", "Kelas 3", "Kelas 4", "Kelas 5", "Kelas 6"]),
    ("SMP", &["Kelas 7", "Kelas 8", "Kelas 9"]),
    ("SMA", &["Kelas 10", "Kelas 11", "Kelas 12"]),
    ("SMK", &["Kelas 10", "Kelas 11", "Kelas 12"]),
];

pub fn archetypes_for(mode: AppMode) -> &'static [Archetype] {
    match mode {
        AppMode::School => SCHOOL_ARCHETYPES,
        AppMode::Tutoring => TUTORING_ARCHETYPES,
    }
}

pub fn find_archetype(mode: AppMode, id: &str) -> Option<&'static Archetype> {
    archetypes_for(mode).iter().find(|a| a.id == id)
}

/// `None` when the level is not one of the known school levels.
pub fn grades_for(level: &str) -> Option<&'static [&'static str]> {
    GRADE_MAPPING
        .iter()
        .find(|(l, _)| *l == level)
        .map(|(_, grades)| *grades)
}
