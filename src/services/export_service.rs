use crate::models::document::{escape_html, Element, Node, SCREEN_ONLY};
use crate::models::quiz::GeneratedQuiz;
use crate::services::projection_service::{OPTION_ITEM_CLASS, OPTION_LABEL_CLASS, OPTION_TEXT_CLASS};

pub const DOC_CONTENT_TYPE: &str = "application/msword";
const UNTITLED: &str = "Untitled";
const BOM: &str = "\u{feff}";

const WORD_STYLES: &str = r#"
@page WordSection1 { size: 21cm 29.7cm; margin: 2cm 2cm 2cm 2cm; mso-header-margin: 35.4pt; mso-footer-margin: 35.4pt; mso-paper-source: 0; }
div.WordSection1 { page: WordSection1; }
body { font-family: 'Times New Roman', serif; font-size: 11pt; line-height: 1.15; }
h2 { font-size: 13pt; text-align: center; margin: 12pt 0 6pt 0; }
table { width: 100%; border-collapse: collapse; margin-bottom: 10pt; }
td, th { border: 1px solid black; padding: 4pt; vertical-align: top; }
th { background: #eeeeee; font-weight: bold; }
table.identitas-table td { border: none; padding: 2pt; }
.question-block { margin-bottom: 10pt; page-break-inside: avoid; }
.question-number { font-weight: bold; }
p.option-para { margin: 0 0 2pt 18pt; }
.stimulus-box { border: 1px solid #444444; padding: 6pt; margin: 4pt 0; background: #f9f9f9; }
.math-block { text-align: center; margin: 6pt 0; }
.answer-key { page-break-before: always; }
.footer-branding { font-size: 8pt; color: #777777; text-align: right; margin-top: 24pt; }
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedDocument {
    pub filename: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

pub struct ExportService;

impl ExportService {
    /// `Soal-<topic>.doc`, every character outside `[A-Za-z0-9]` mapped to `_`.
    pub fn filename(topic: &str) -> String {
        let topic = topic.trim();
        let stem: String = if topic.is_empty() {
            UNTITLED.to_string()
        } else {
            topic
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .collect()
        };
        format!("Soal-{}.doc", stem)
    }

    /// Rewrites a projection for word processors and wraps it in a standalone
    /// HTML document.
    pub fn export_document(quiz: &GeneratedQuiz, projection: &Node) -> ExportedDocument {
        let content = Self::prepare(projection)
            .map(|node| node.to_html())
            .unwrap_or_default();
        let title = escape_html(&Self::filename(&quiz.metadata.topic));

        let html = format!(
            "{bom}<html xmlns:o=\"urn:schemas-microsoft-com:office:office\" \
             xmlns:w=\"urn:schemas-microsoft-com:office:word\" \
             xmlns=\"http://www.w3.org/TR/REC-html40\">\
             <head><meta charset=\"utf-8\"><title>{title}</title>\
             <!--[if gte mso 9]><xml><w:WordDocument><w:View>Print</w:View><w:Zoom>100</w:Zoom></w:WordDocument></xml><![endif]-->\
             <style>{styles}</style></head>\
             <body><div class=\"WordSection1\">{content}</div></body></html>",
            bom = BOM,
            title = title,
            styles = WORD_STYLES,
            content = content,
        );

        tracing::info!(
            topic = %quiz.metadata.topic,
            bytes = html.len(),
            "Quiz document exported"
        );

        ExportedDocument {
            filename: Self::filename(&quiz.metadata.topic),
            content_type: DOC_CONTENT_TYPE,
            body: html.into_bytes(),
        }
    }

    /// Applies the export rewrite rules. `None` when the node itself is dropped.
    pub fn prepare(node: &Node) -> Option<Node> {
        match node {
            Node::Text { .. } => Some(node.clone()),
            Node::Element(el) => Self::prepare_element(el).map(Node::Element),
        }
    }

    fn prepare_element(el: &Element) -> Option<Element> {
        if el.has_class(SCREEN_ONLY) {
            return None;
        }
        if el.tag == "img" && !el.get_attr("src").is_some_and(|src| src.starts_with("data:")) {
            return None;
        }
        if el.has_class(OPTION_ITEM_CLASS) {
            return Some(Self::flatten_option(el));
        }

        let mut out = Element {
            tag: el.tag.clone(),
            classes: el.classes.clone(),
            attrs: el.attrs.clone(),
            children: el.children.iter().filter_map(Self::prepare).collect(),
        };
        if out.tag == "table" {
            out.set_attr("border", "1");
            out.set_attr("cellpadding", "5");
            let style = match out.get_attr("style") {
                Some(existing) if !existing.trim().is_empty() => {
                    format!("{}; border-collapse: collapse", existing.trim_end_matches(';'))
                }
                _ => "border-collapse: collapse".to_string(),
            };
            out.set_attr("style", style);
        }
        Some(out)
    }

    /// Option label and plain text collapse into a single paragraph, `A. text`;
    /// inline markup is dropped.
    fn flatten_option(el: &Element) -> Element {
        let find = |class: &str| {
            el.children
                .iter()
                .filter_map(Node::as_element)
                .find(|c| c.has_class(class))
        };
        let label = find(OPTION_LABEL_CLASS)
            .map(|l| Node::Element(l.clone()).text_content())
            .unwrap_or_default();

        let text = find(OPTION_TEXT_CLASS)
            .map(|t| Node::Element(t.clone()).text_content())
            .unwrap_or_default();

        Element::new("p")
            .class("option-para")
            .text(format!("{}. {}", label.trim_end_matches('.'), text))
    }
}
