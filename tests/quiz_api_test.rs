use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

use quiz_builder_backend::{
    app,
    error::Result,
    services::{ai_service::QuizProvider, quiz_validator::ValidationPolicy},
    AppState,
};

/// Answers every request with `count` standard multiple-choice questions.
struct FakeProvider {
    count: usize,
    quiz_calls: AtomicUsize,
}

impl FakeProvider {
    fn new(count: usize) -> Arc<Self> {
        Arc::new(Self {
            count,
            quiz_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl QuizProvider for FakeProvider {
    async fn generate_quiz(&self, _instruction: &str, _schema: &JsonValue) -> Result<String> {
        self.quiz_calls.fetch_add(1, Ordering::SeqCst);
        let questions: Vec<_> = (1..=self.count)
            .map(|i| {
                let options: Vec<JsonValue> = ["A", "B", "C", "D", "E"]
                    .iter()
                    .enumerate()
                    .map(|(n, label)| json!({ "label": label, "text": format!("{}", 2 * i + n) }))
                    .collect();
                json!({
                    "id": format!("q{}", i),
                    "type": "pgs",
                    "difficulty": "Sedang",
                    "questionText": format!("Hasil dari $2 \\times {}$ adalah ...", i),
                    "options": options,
                    "correctAnswer": "A",
                    "explanation": "Perkalian dasar."
                })
            })
            .collect();
        let blueprint: Vec<_> = (1..=self.count)
            .map(|i| {
                json!({
                    "no": 10 + i,
                    "competency": "Operasi hitung",
                    "indicator": format!("Indikator {}", i),
                    "level": "C2",
                    "type": "pgs"
                })
            })
            .collect();
        Ok(json!({ "questions": questions, "blueprint": blueprint }).to_string())
    }

    async fn generate_image(&self, _prompt: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

fn test_app(provider: Arc<FakeProvider>) -> Router {
    let state = AppState::new(provider, ValidationPolicy::Strict, 1024);
    app(state, 100)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>, axum::http::HeaderMap) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec(), headers)
}

fn json_request(method: &str, uri: &str, body: JsonValue) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn multipart_request(uri: &str, file_name: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let boundary = "quizboundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: {ct}\r\n\r\n",
            b = boundary,
            f = file_name,
            ct = content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn create_session(app: &Router) -> String {
    let (status, body, _) = send(app, empty_request("POST", "/api/sessions")).await;
    assert_eq!(status, StatusCode::CREATED);
    let v: JsonValue = serde_json::from_slice(&body).unwrap();
    v["id"].as_str().unwrap().to_string()
}

async fn request_pgs(app: &Router, id: &str, count: u32) {
    let (status, body, _) = send(
        app,
        json_request(
            "PATCH",
            &format!("/api/sessions/{}/question-types/pgs", id),
            json!({ "count": count, "active": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let v: JsonValue = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["totalQuestions"], count);
}

#[tokio::test]
async fn five_questions_end_to_end() {
    let provider = FakeProvider::new(5);
    let app = test_app(provider.clone());
    let id = create_session(&app).await;
    request_pgs(&app, &id, 5).await;

    let (status, body, _) = send(&app, empty_request("POST", &format!("/api/sessions/{}/generate", id))).await;
    assert_eq!(status, StatusCode::OK, "{}", String::from_utf8_lossy(&body));
    let v: JsonValue = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["questionCount"], 5);
    assert_eq!(v["imagesPending"], false);
    let numbers: Vec<u64> = v["quiz"]["blueprint"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["no"].as_u64().unwrap())
        .collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5]);

    let (status, body, _) = send(
        &app,
        empty_request("GET", &format!("/api/sessions/{}/view?mode=student", id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert_eq!(html.matches("class=\"question-block\"").count(), 5);
    assert!(!html.contains("answer-key"));
    assert!(!html.contains("<img"));

    let (status, body, _) = send(
        &app,
        empty_request("GET", &format!("/api/sessions/{}/view?mode=full&format=json", id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let tree: JsonValue = serde_json::from_slice(&body).unwrap();
    assert_eq!(tree["kind"], "element");
    assert!(body_contains_class(&tree, "answer-key"));

    let (_, body, _) = send(&app, empty_request("GET", &format!("/api/sessions/{}/images", id))).await;
    let v: JsonValue = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["images"], json!({}));
    assert_eq!(v["pending"], false);
    assert_eq!(provider.quiz_calls.load(Ordering::SeqCst), 1);
}

fn body_contains_class(node: &JsonValue, class: &str) -> bool {
    let own = node["classes"]
        .as_array()
        .is_some_and(|c| c.iter().any(|v| v == class));
    own || node["children"]
        .as_array()
        .is_some_and(|children| children.iter().any(|c| body_contains_class(c, class)))
}

#[tokio::test]
async fn export_names_file_after_topic_and_is_noop_without_quiz() {
    let app = test_app(FakeProvider::new(2));
    let id = create_session(&app).await;

    let (status, body, _) = send(&app, empty_request("GET", &format!("/api/sessions/{}/export", id))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());

    let (_, body, _) = send(&app, empty_request("GET", &format!("/api/sessions/{}", id))).await;
    let mut config = serde_json::from_slice::<JsonValue>(&body).unwrap()["config"].clone();
    config["topic"] = json!("Aljabar Linear");
    let (status, body, _) = send(
        &app,
        json_request("PUT", &format!("/api/sessions/{}/config", id), config),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", String::from_utf8_lossy(&body));

    request_pgs(&app, &id, 2).await;
    let (status, _, _) = send(&app, empty_request("POST", &format!("/api/sessions/{}/generate", id))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body, headers) = send(
        &app,
        empty_request("GET", &format!("/api/sessions/{}/export?mode=student", id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/msword");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Soal-Aljabar_Linear.doc\""
    );
    let doc = String::from_utf8(body).unwrap();
    assert!(doc.contains("<p class=\"option-para\">A. 2</p>"));
    assert!(!doc.contains("screen-only"));
    assert!(!doc.contains("class=\"answer-key\""));
}

#[tokio::test]
async fn zero_questions_is_rejected_before_the_provider() {
    let provider = FakeProvider::new(3);
    let app = test_app(provider.clone());
    let id = create_session(&app).await;

    let (status, body, _) = send(&app, empty_request("POST", &format!("/api/sessions/{}/generate", id))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let v: JsonValue = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["kind"], "configuration_invalid");
    assert_eq!(provider.quiz_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn count_mismatch_keeps_session_without_quiz() {
    let app = test_app(FakeProvider::new(2));
    let id = create_session(&app).await;
    request_pgs(&app, &id, 4).await;

    let (status, body, _) = send(&app, empty_request("POST", &format!("/api/sessions/{}/generate", id))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let v: JsonValue = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["kind"], "response_format");

    let (status, _, _) = send(&app, empty_request("GET", &format!("/api/sessions/{}/quiz", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body, _) = send(&app, empty_request("GET", &format!("/api/sessions/{}", id))).await;
    let v: JsonValue = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["busy"], false);
    assert_eq!(v["hasQuiz"], false);
}

#[tokio::test]
async fn reference_upload_accepts_only_plain_text() {
    let app = test_app(FakeProvider::new(1));
    let id = create_session(&app).await;
    let uri = format!("/api/sessions/{}/reference", id);

    let (status, body, _) = send(
        &app,
        multipart_request(&uri, "materi.pdf", "application/pdf", b"%PDF-1.4"),
    )
    .await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let v: JsonValue = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["kind"], "file_ingestion");

    let (status, _, _) = send(
        &app,
        multipart_request(&uri, "rusak.txt", "text/plain", &[0xff, 0xfe, 0x00, 0xc3]),
    )
    .await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let (status, _, _) = send(
        &app,
        multipart_request(&uri, "besar.txt", "text/plain", &[b'a'; 2048]),
    )
    .await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let (_, body, _) = send(&app, empty_request("GET", &format!("/api/sessions/{}", id))).await;
    let v: JsonValue = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["config"]["summaryText"], "");

    let (status, body, _) = send(
        &app,
        multipart_request(&uri, "ringkasan.txt", "text/plain", "Fotosintesis terjadi di kloroplas.".as_bytes()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let v: JsonValue = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["fileName"], "ringkasan.txt");

    let (_, body, _) = send(&app, empty_request("GET", &format!("/api/sessions/{}", id))).await;
    let v: JsonValue = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["config"]["summaryText"], "Fotosintesis terjadi di kloroplas.");
}

#[tokio::test]
async fn mode_switch_resets_question_types() {
    let app = test_app(FakeProvider::new(1));
    let id = create_session(&app).await;
    request_pgs(&app, &id, 3).await;

    let (status, body, _) = send(
        &app,
        json_request("POST", &format!("/api/sessions/{}/mode", id), json!({ "mode": "tutoring" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let v: JsonValue = serde_json::from_slice(&body).unwrap();
    let types = v["questionTypes"].as_array().unwrap();
    assert_eq!(types[0]["id"], "dg");
    assert!(types.iter().all(|t| t["count"] == 0 && t["active"] == false));

    let (status, _, _) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/api/sessions/{}/question-types/pgs", id),
            json!({ "count": 2 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body, _) = send(
        &app,
        json_request("POST", &format!("/api/sessions/{}/level", id), json!({ "level": "SMP" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let v: JsonValue = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["grade"], "Kelas 7");
}

#[tokio::test]
async fn catalog_and_health_are_served() {
    let app = test_app(FakeProvider::new(1));

    let (status, body, _) = send(&app, empty_request("GET", "/health")).await;
    assert_eq!(status, StatusCode::OK);
    let v: JsonValue = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["status"], "ok");

    let (status, body, _) = send(&app, empty_request("GET", "/api/catalog")).await;
    assert_eq!(status, StatusCode::OK);
    let v: JsonValue = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["schoolQuestionTypes"].as_array().unwrap().len(), 12);
    assert_eq!(v["tutoringQuestionTypes"][0]["id"], "dg");

    let (status, _, _) = send(
        &app,
        empty_request("GET", &format!("/api/sessions/{}", uuid::Uuid::new_v4())),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
