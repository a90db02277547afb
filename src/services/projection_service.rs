use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::document::{Element, Node, SCREEN_ONLY};
use crate::models::question::Question;
use crate::models::quiz::{GeneratedQuiz, ImageMap};
use crate::utils::markdown;

pub const ANSWER_KEY_CLASS: &str = "answer-key";
pub const BLUEPRINT_CLASS: &str = "blueprint";
pub const QUESTION_CLASS: &str = "question-block";
pub const OPTION_ITEM_CLASS: &str = "option-item";
pub const OPTION_LABEL_CLASS: &str = "option-label";
pub const OPTION_TEXT_CLASS: &str = "option-text";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// Teacher preview: everything.
    #[default]
    Full,
    Blueprint,
    Student,
}

impl ViewMode {
    pub fn label(&self) -> &'static str {
        match self {
            ViewMode::Full => "Preview Guru",
            ViewMode::Blueprint => "Kisi-Kisi",
            ViewMode::Student => "Mode Siswa",
        }
    }

    fn shows_questions(&self) -> bool {
        matches!(self, ViewMode::Full | ViewMode::Student)
    }

    fn shows_blueprint(&self) -> bool {
        matches!(self, ViewMode::Full | ViewMode::Blueprint)
    }

    fn shows_answer_key(&self) -> bool {
        matches!(self, ViewMode::Full)
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" | "guru" | "teacher" => Ok(ViewMode::Full),
            "blueprint" | "kisi" => Ok(ViewMode::Blueprint),
            "student" | "siswa" => Ok(ViewMode::Student),
            other => Err(format!("unknown view mode: {}", other)),
        }
    }
}

/// Builds the display tree for `view`. Reads only; a question without an
/// entry in `images` simply has no image block.
pub fn project(quiz: &GeneratedQuiz, images: &ImageMap, view: ViewMode) -> Node {
    let mut root = Element::new("div")
        .class("quiz-content")
        .attr("data-view", view_id(view))
        .child(view_banner(view))
        .child(header(quiz));

    if view.shows_questions() {
        root = root.child(questions(quiz, images));
    }
    if view.shows_blueprint() {
        root = root.child(blueprint(quiz));
    }
    if view.shows_answer_key() {
        root = root.child(answer_key(quiz));
    }

    root.child(Element::new("div").class("footer-branding").text("faizin-smp2 kudus"))
        .into()
}

fn view_id(view: ViewMode) -> &'static str {
    match view {
        ViewMode::Full => "full",
        ViewMode::Blueprint => "blueprint",
        ViewMode::Student => "student",
    }
}

fn view_banner(view: ViewMode) -> Element {
    Element::new("div")
        .class(SCREEN_ONLY)
        .class("view-banner")
        .text(view.label())
}

fn header(quiz: &GeneratedQuiz) -> Element {
    let meta = &quiz.metadata;
    let cell = |label: &str, value: String| {
        Node::from(Element::new("td").text(format!("{}: {}", label, value)))
    };
    let title = match meta.assessment_type.trim() {
        "" => "NASKAH SOAL".to_string(),
        kind => format!("NASKAH SOAL {}", kind.to_uppercase()),
    };

    Element::new("div")
        .class("quiz-header")
        .child(Element::new("h2").text(title))
        .child(
            Element::new("table").class("identitas-table").child(
                Element::new("tbody")
                    .child(
                        Element::new("tr")
                            .child(cell("Mapel", meta.subject.clone()))
                            .child(cell("Materi", meta.topic.clone())),
                    )
                    .child(
                        Element::new("tr")
                            .child(cell("Kelas", meta.grade.clone()))
                            .child(cell("Waktu", format!("{} Menit", meta.time_limit))),
                    ),
            ),
        )
}

fn questions(quiz: &GeneratedQuiz, images: &ImageMap) -> Element {
    Element::new("div").class("questions").children(
        quiz.questions
            .iter()
            .enumerate()
            .map(|(idx, q)| question_block(idx + 1, q, images.get(&q.id)).into()),
    )
}

fn question_block(number: usize, q: &Question, image: Option<&str>) -> Element {
    let mut body = Element::new("div").class("question-body");

    if let Some(stimulus) = &q.stimulus {
        body = body.child(
            Element::new("div")
                .class("stimulus-box")
                .children(markdown::to_nodes(stimulus)),
        );
    }
    if let Some(src) = image {
        body = body.child(
            Element::new("div").class("question-image").child(
                Element::new("img")
                    .attr("src", src)
                    .attr("alt", "ilustrasi soal")
                    .attr("width", "360"),
            ),
        );
    }
    body = body.child(
        Element::new("div")
            .class("question-text")
            .children(markdown::to_nodes(&q.question_text)),
    );

    if let Some(options) = q.options.as_ref().filter(|o| !o.is_empty()) {
        body = body.child(Element::new("div").class("options").children(options.iter().map(|opt| {
            Element::new("div")
                .class(OPTION_ITEM_CLASS)
                .child(Element::new("span").class(OPTION_LABEL_CLASS).text(opt.label.clone()))
                .child(
                    Element::new("div")
                        .class(OPTION_TEXT_CLASS)
                        .children(markdown::inline(&opt.text)),
                )
                .into()
        })));
    }

    Element::new("div")
        .class(QUESTION_CLASS)
        .attr("data-question-id", q.id.clone())
        .child(Element::new("span").class("question-number").text(format!("{}.", number)))
        .child(body)
}

fn blueprint(quiz: &GeneratedQuiz) -> Element {
    let head = Element::new("tr").children(
        ["No", "Kompetensi", "Indikator Soal", "Level", "Tipe"]
            .into_iter()
            .map(|h| Element::new("th").text(h).into()),
    );
    let rows = quiz.blueprint.iter().map(|bp| {
        Element::new("tr")
            .child(Element::new("td").text(bp.no.to_string()))
            .child(Element::new("td").text(bp.competency.clone()))
            .child(Element::new("td").text(bp.indicator.clone()))
            .child(Element::new("td").text(bp.level.clone()))
            .child(Element::new("td").text(bp.question_type.to_uppercase()))
            .into()
    });

    Element::new("div")
        .class(BLUEPRINT_CLASS)
        .child(Element::new("h2").text("KISI-KISI ASESMEN"))
        .child(
            Element::new("table")
                .child(Element::new("thead").child(head))
                .child(Element::new("tbody").children(rows)),
        )
}

fn answer_key(quiz: &GeneratedQuiz) -> Element {
    Element::new("div")
        .class(ANSWER_KEY_CLASS)
        .child(Element::new("h2").text("KUNCI & PEMBAHASAN"))
        .children(quiz.questions.iter().enumerate().map(|(idx, q)| {
            Element::new("div")
                .class("answer-entry")
                .child(
                    Element::new("p")
                        .child(Element::new("strong").text(format!("No. {}", idx + 1)))
                        .text(" ")
                        .child(Element::new("span").class("answer-value").text(q.correct_answer.clone())),
                )
                .child(
                    Element::new("div")
                        .class("explanation")
                        .children(markdown::to_nodes(&q.explanation)),
                )
                .into()
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{BlueprintEntry, QuestionOption};
    use crate::models::quiz_config::QuizConfig;
    use chrono::Utc;

    fn sample_quiz() -> GeneratedQuiz {
        let question = |id: &str, stimulus: Option<&str>| Question {
            id: id.to_string(),
            question_type: "pgs".to_string(),
            difficulty: "Sedang".to_string(),
            question_text: "Nilai $x$ jika $2x = 4$ adalah ...".to_string(),
            stimulus: stimulus.map(str::to_string),
            options: Some(vec![
                QuestionOption { label: "A".into(), text: "1".into() },
                QuestionOption { label: "B".into(), text: "2".into() },
            ]),
            correct_answer: "B".to_string(),
            explanation: "Bagi kedua ruas dengan 2.".to_string(),
            image_prompt: None,
            indicator: None,
        };
        GeneratedQuiz {
            questions: vec![question("q1", Some("Perhatikan persamaan berikut.")), question("q2", None)],
            blueprint: vec![BlueprintEntry {
                no: 1,
                competency: "Persamaan linear".into(),
                indicator: "Menentukan nilai variabel".into(),
                level: "C3".into(),
                question_type: "pgs".into(),
            }],
            metadata: QuizConfig {
                topic: "Aljabar Linear".into(),
                ..QuizConfig::default()
            },
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn full_view_has_everything() {
        let node = project(&sample_quiz(), &ImageMap::new(), ViewMode::Full);
        assert_eq!(node.count_class(QUESTION_CLASS), 2);
        assert_eq!(node.count_class(BLUEPRINT_CLASS), 1);
        assert_eq!(node.count_class(ANSWER_KEY_CLASS), 1);
        assert_eq!(node.count_class(OPTION_ITEM_CLASS), 4);
        assert_eq!(node.count_class("stimulus-box"), 1);
        assert!(node.text_content().contains("Materi: Aljabar Linear"));
    }

    #[test]
    fn student_view_hides_key_and_blueprint() {
        let node = project(&sample_quiz(), &ImageMap::new(), ViewMode::Student);
        assert_eq!(node.count_class(QUESTION_CLASS), 2);
        assert_eq!(node.count_class(ANSWER_KEY_CLASS), 0);
        assert_eq!(node.count_class(BLUEPRINT_CLASS), 0);
        assert!(!node.text_content().contains("Bagi kedua ruas"));
    }

    #[test]
    fn blueprint_view_is_header_and_table_only() {
        let node = project(&sample_quiz(), &ImageMap::new(), ViewMode::Blueprint);
        assert_eq!(node.count_class(QUESTION_CLASS), 0);
        assert_eq!(node.count_class(ANSWER_KEY_CLASS), 0);
        assert_eq!(node.count_class(BLUEPRINT_CLASS), 1);
        assert!(node.text_content().contains("Menentukan nilai variabel"));
    }

    #[test]
    fn projection_is_idempotent_and_read_only() {
        let quiz = sample_quiz();
        let images = ImageMap::new();
        let before = quiz.clone();
        let first = project(&quiz, &images, ViewMode::Blueprint);
        let second = project(&quiz, &images, ViewMode::Blueprint);
        assert_eq!(first, second);
        assert_eq!(first.to_html(), second.to_html());
        assert_eq!(quiz, before);
        assert!(images.is_empty());
    }

    #[test]
    fn images_render_only_where_resolved() {
        let mut images = ImageMap::new();
        images.insert("q2", "data:image/png;base64,AAAA");
        let node = project(&sample_quiz(), &images, ViewMode::Student);
        assert_eq!(node.count_tag("img"), 1);
        assert!(node.to_html().contains("data-question-id=\"q2\"><span class=\"question-number\">2.</span><div class=\"question-body\"><div class=\"question-image\"><img src=\"data:image/png;base64,AAAA\""));
    }

    #[test]
    fn parses_view_names() {
        assert_eq!("siswa".parse::<ViewMode>().unwrap(), ViewMode::Student);
        assert_eq!("blueprint".parse::<ViewMode>().unwrap(), ViewMode::Blueprint);
        assert!("print".parse::<ViewMode>().is_err());
    }
}
