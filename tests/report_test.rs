//! Chat-completion client against a local stub server

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::{NaiveDate, TimeZone, Utc};
use oneframe::config::AnalysisConfig;
use oneframe::report::{build_weekly_prompt_in, AnalysisKind, AnalysisOutcome, ChatCompletionClient};
use oneframe::DiaryEntry;
use serde_json::{json, Value};
use tokio::net::TcpListener;

#[derive(Clone)]
struct Stub {
    status: StatusCode,
    body: String,
    seen: Arc<Mutex<Option<(HeaderMap, Value)>>>,
}

async fn chat_completions(State(stub): State<Stub>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    *stub.seen.lock().unwrap() = Some((headers, body));
    (stub.status, [(header::CONTENT_TYPE, "application/json")], stub.body.clone()).into_response()
}

async fn serve(stub: Stub) -> SocketAddr {
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(stub);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn stub(status: StatusCode, body: Value) -> Stub {
    raw_stub(status, body.to_string())
}

fn raw_stub(status: StatusCode, body: impl Into<String>) -> Stub {
    Stub {
        status,
        body: body.into(),
        seen: Arc::new(Mutex::new(None)),
    }
}

fn client_for(addr: SocketAddr) -> ChatCompletionClient {
    let config = AnalysisConfig {
        api_base: format!("http://{addr}/"),
        model: "test-model".to_string(),
        temperature: 0.7,
        timeout_secs: 5,
        ..AnalysisConfig::default()
    };
    ChatCompletionClient::new(&config, "sk-test").unwrap()
}

fn entry(id: i64, emotion: &str, content: &str, created_at: i64) -> DiaryEntry {
    DiaryEntry {
        id,
        title: String::new(),
        content: content.to_string(),
        selected_emotion: emotion.to_string(),
        image_uri: String::new(),
        created_at,
        updated_at: created_at,
    }
}

fn millis(y: i32, m: u32, d: u32, h: u32) -> i64 {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap().timestamp_millis()
}

#[tokio::test]
async fn test_successful_response_returns_first_choice() {
    let stub = stub(
        StatusCode::OK,
        json!({
            "choices": [
                {"message": {"role": "assistant", "content": "1. 이번 주의 감정: 평온"}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ]
        }),
    );
    let seen = Arc::clone(&stub.seen);
    let client = client_for(serve(stub).await);

    let outcome = client.request_analysis(AnalysisKind::Weekly, "• 평온: 산책").await;
    assert_eq!(outcome, AnalysisOutcome::Text("1. 이번 주의 감정: 평온".to_string()));

    let (headers, body) = seen.lock().unwrap().take().expect("request should reach the stub");
    assert_eq!(headers.get("authorization").unwrap(), "Bearer sk-test");
    assert_eq!(body["model"], "test-model");
    assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-9);

    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages[0]["content"], AnalysisKind::Weekly.system_prompt());
    assert_eq!(messages[1]["role"], "user");
    assert_eq!(messages[1]["content"], "• 평온: 산책");
}

#[tokio::test]
async fn test_empty_choices_is_no_result() {
    let client = client_for(serve(stub(StatusCode::OK, json!({"choices": []}))).await);

    let outcome = client.request_analysis(AnalysisKind::Entry, "prompt").await;
    assert_eq!(outcome, AnalysisOutcome::NoResult);
    assert_eq!(outcome.to_string(), "분석 결과 없음");
}

#[tokio::test]
async fn test_null_content_is_no_result() {
    let client = client_for(
        serve(stub(
            StatusCode::OK,
            json!({"choices": [{"message": {"role": "assistant", "content": null}}]}),
        ))
        .await,
    );

    let outcome = client.request_analysis(AnalysisKind::Weekly, "prompt").await;
    assert_eq!(outcome, AnalysisOutcome::NoResult);
}

#[tokio::test]
async fn test_undecodable_body_is_failed() {
    let client = client_for(serve(raw_stub(StatusCode::OK, "<html>not json</html>")).await);

    let outcome = client.request_analysis(AnalysisKind::Weekly, "prompt").await;
    assert!(matches!(outcome, AnalysisOutcome::Failed(_)));
    assert!(outcome.to_string().starts_with("분석 중 오류 발생: "));
}

#[tokio::test]
async fn test_rate_limited() {
    let client = client_for(serve(stub(StatusCode::TOO_MANY_REQUESTS, json!({}))).await);

    let outcome = client.request_analysis(AnalysisKind::Weekly, "prompt").await;
    assert_eq!(outcome, AnalysisOutcome::RateLimited);
    assert_eq!(outcome.to_string(), "요청이 너무 많습니다. 잠시 후 다시 시도해주세요.");
}

#[tokio::test]
async fn test_server_error_carries_status() {
    let client = client_for(serve(stub(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "boom"}))).await);

    let outcome = client.request_analysis(AnalysisKind::Weekly, "prompt").await;
    assert_eq!(outcome, AnalysisOutcome::ServerError(500));
    assert!(outcome.to_string().contains("500"));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_failed() {
    // Reserve a port, then free it so nothing is listening there
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let client = client_for(addr);

    let outcome = client.request_analysis(AnalysisKind::Entry, "prompt").await;
    assert!(matches!(outcome, AnalysisOutcome::Failed(_)));
    assert!(outcome.to_string().starts_with("분석 중 오류 발생: "));
}

#[test]
fn test_weekly_prompt_keeps_only_current_week() {
    let today = NaiveDate::from_ymd_opt(2025, 5, 14).unwrap(); // Wednesday
    let entries = vec![
        entry(1, "행복", "지난 일요일", millis(2025, 5, 11, 12)),
        entry(2, "슬픔", "친구와 다퉜다", millis(2025, 5, 12, 0)),
        entry(3, "기쁨", "새 프로젝트", millis(2025, 5, 14, 9)),
        entry(4, "평온", "주말 산책", millis(2025, 5, 18, 23)),
        entry(5, "분노", "다음 주", millis(2025, 5, 19, 0)),
    ];

    let prompt = build_weekly_prompt_in(&entries, today, &Utc);
    let (header, body) = prompt.split_once("\n\n").unwrap();

    assert!(header.contains("이번 주"));
    assert_eq!(body, "• 슬픔: 친구와 다퉜다\n\n• 기쁨: 새 프로젝트\n\n• 평온: 주말 산책");
}

#[test]
fn test_weekly_prompt_without_entries_is_header_only() {
    let today = NaiveDate::from_ymd_opt(2025, 5, 14).unwrap();
    let prompt = build_weekly_prompt_in(&[], today, &Utc);

    assert!(prompt.ends_with("\n\n"));
    assert!(!prompt.contains('•'));
}
