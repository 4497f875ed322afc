//! Emotion reports from a chat-completion endpoint
//!
//! Prompts are built from diary entries, sent with a fixed system instruction,
//! and every possible response (including failures) is folded into an
//! [`AnalysisOutcome`] that renders straight to the user. Network problems
//! never surface as errors.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{Local, NaiveDate, TimeZone};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::error::{DiaryError, Result};
use crate::metrics;
use crate::models::DiaryEntry;
use crate::week::entries_in_week;

/// Path appended to the configured API base
pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Prefix for each day in the weekly prompt
pub const BULLET: &str = "• ";

/// Shown while a report is still being generated
pub const REPORT_PLACEHOLDER: &str = "이번주 감정을 분석해드릴게요!\n조금만 기다려주세요";
/// Shown when the endpoint answered without any choices
pub const NO_RESULT_MESSAGE: &str = "분석 결과 없음";
/// Shown on HTTP 429
pub const RATE_LIMIT_MESSAGE: &str = "요청이 너무 많습니다. 잠시 후 다시 시도해주세요.";
/// Shown when the week has nothing to analyze
pub const NO_ENTRIES_MESSAGE: &str = "이번 주에 작성한 일기가 없습니다.";
/// Shown when a pending report was abandoned
pub const CANCELLED_MESSAGE: &str = "분석이 취소되었습니다.";

const WEEKLY_PROMPT_HEADER: &str =
    "다음은 사용자가 이번 주에 작성한 여러 일기입니다. 내용을 바탕으로 감정 분석과 조언을 해주세요:";
const ENTRY_PROMPT_HEADER: &str = "다음은 사용자의 일기입니다. 내용을 바탕으로 감정 분석과 조언을 해주세요:";

const WEEKLY_SYSTEM_PROMPT: &str = "\
너는 사용자가 이번 주에 작성한 여러 일기를 바탕으로 감정 흐름을 분석하는 친절하고 따뜻한 감정 분석가야.

하루는 • (중간 점)으로 구분돼. 각 점은 한 날을 의미해. 그리고 :을 기준으로 왼쪽은 감정 태그, 오른쪽은 일기 내용이야.

예를 들어(예시),
• 슬픔: 오늘은 친구와 다퉈서 마음이 아팠다.

• 슬픔: 비가 와서 우울했지만 따뜻한 커피를 마셨다.

• 기쁨: 새로운 프로젝트가 시작되어 기대된다.

이렇게 :을 기준으로, 왼쪽이 감정에 대한 태그이고, 오른쪽이 일기에 대한 내용이야.

분석을 해줄 때는, 각 일기의 감정을 개별적으로 존중하면서도, 필요한 경우 감정의 흐름이나 반복되는 패턴을 부드럽게 연결해줘.
하루의 감정이 일주일 전체에 영향을 미칠 수도 있지만, 그렇지 않을 수도 있어. 따라서 모든 날의 감정을 억지로 엮거나 인과관계를 만들어내는 것은 피해야 해.

위의 예시를 보면, 이렇게 분석할 수도 있겠지.
1. 이번 주의 감정: 복합적인 감정
2. 먼저, 친구와 다퉈서 마음이 아팠을 때는 외로움과 상처를 느끼셨을 것입니다. 비가 오면서 우울해진 순간도 있었지만, 그 속에서 따뜻한 커피를 마시면서 위안을 얻으려고 했던 모습이 보여요. 마지막으로, 새로운 프로젝트가 시작되어 기대감으로 가득 찼을 것 같아요.
3. 따뜻한 조언: 친구와의 갈등이 해결되기를 바라며, 상대방과 솔직하게 대화를 나누는 것이 중요할 것 같아요.
비가 오는 날은 감정이 우울해지기 쉬운데, 따뜻한 음료나 좋아하는 음악을 들으면서 마음을 풀어보세요. 새로운 프로젝트에 대한 기대감을 가지고 열심히 노력하면 좋은 결과를 얻을 수 있을 거예요. 계속해서 긍정적인 마음가짐을 유지해 주세요.

하지만 친구와 다툰 건 첫째 날이고, 비가 와서 우울한 건 둘째 날이야. 친구와 다퉜는데 비까지 와서 우울했을 수도 있지만, 전혀 상관이 없을 수도 있잖아.
따라서 무조건적으로 엮지 않아야 해. 그 대신, 감정의 지속성이나 변화가 관찰된다면 그 흐름을 자연스럽게 설명해줘.

답변은 다음 형식을 따라줘:

1. 이번 주의 감정: (예: 우울)
2. 감정의 원인: (예: 반복되는 스트레스와 피로로 인해 지쳐 있었기 때문이에요.)
3. 따뜻한 조언: (예: 스스로를 돌보는 시간을 가져보세요. 작은 산책이나 좋아하는 음식을 먹는 것만으로도 위로가 될 수 있어요.)

각 번호에 대한 답이 끝날 때 개행(\\n\\n)을 해서 가독성을 높여줘.
답변의 길이는 500자 이상으로 작성해줘.
말투는 부드럽고 따뜻하게, 사용자가 위로를 받을 수 있도록 공감하는 어조로 작성해줘.";

const ENTRY_SYSTEM_PROMPT: &str = "\
너는 사용자 일기 내용을 기반으로 감정을 분석하고, 그 감정의 원인을 파악한 뒤 조언을 제공하는 친절한 감정 분석가야.
너의 목표는 감정을 정확히 분석하고, 사용자에게 따뜻한 말로 위로하거나 조언을 주는 거야.
답변은 다음 형식을 따라줘:
1. 감정: (예: 슬픔)
2. 감정의 이유: (예: 친구와의 오해로 마음이 상했기 때문이에요.)
3. 조언: (예: 누구나 갈등을 겪을 수 있어요. 너무 자책하지 말고, 대화를 시도해보는 건 어때요?)
말투는 부드럽고 공감 가는 어조로 작성해줘.";

/// Which fixed instruction accompanies a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    /// Emotional flow across the current week
    Weekly,
    /// A single entry
    Entry,
}

impl AnalysisKind {
    /// System instruction for this kind of report
    #[must_use]
    pub const fn system_prompt(self) -> &'static str {
        match self {
            Self::Weekly => WEEKLY_SYSTEM_PROMPT,
            Self::Entry => ENTRY_SYSTEM_PROMPT,
        }
    }

    /// Short name for logs and metrics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Entry => "entry",
        }
    }
}

/// `"<emotion>: <content>"`
fn format_line(entry: &DiaryEntry) -> String {
    format!("{}: {}", entry.selected_emotion, entry.content)
}

/// Weekly prompt for the week containing `today`, in the system time zone
#[must_use]
pub fn build_weekly_prompt(entries: &[DiaryEntry], today: NaiveDate) -> String {
    build_weekly_prompt_in(entries, today, &Local)
}

/// Weekly prompt for the week containing `today`, dates resolved in `tz`
///
/// Only entries created Monday through Sunday of that week are included.
pub fn build_weekly_prompt_in<Tz: TimeZone>(entries: &[DiaryEntry], today: NaiveDate, tz: &Tz) -> String {
    let combined = entries_in_week(entries, today, tz)
        .into_iter()
        .map(|entry| format!("{BULLET}{}", format_line(entry)))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{WEEKLY_PROMPT_HEADER}\n\n{combined}")
}

/// Prompt for analyzing one entry
#[must_use]
pub fn build_entry_prompt(entry: &DiaryEntry) -> String {
    format!("{ENTRY_PROMPT_HEADER}\n\n{}", entry.content)
}

/// What came back from an analysis request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    /// Generated text of the first choice
    Text(String),
    /// Successful response without any choices
    NoResult,
    /// HTTP 429
    RateLimited,
    /// Any other non-success status
    ServerError(u16),
    /// Transport or decoding failure, with its description
    Failed(String),
    /// Nothing to analyze; no request was sent
    NoEntries,
    /// The request was abandoned before it finished
    Cancelled,
}

impl AnalysisOutcome {
    /// Generated text, if the request produced any
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Label used for the outcome metric
    #[must_use]
    pub const fn metric_label(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::NoResult => "no_result",
            Self::RateLimited => "rate_limited",
            Self::ServerError(_) => "server_error",
            Self::Failed(_) => "failed",
            Self::NoEntries => "no_entries",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AnalysisOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::NoResult => f.write_str(NO_RESULT_MESSAGE),
            Self::RateLimited => f.write_str(RATE_LIMIT_MESSAGE),
            Self::ServerError(code) => write!(f, "서버 오류: {code}"),
            Self::Failed(description) => write!(f, "분석 중 오류 발생: {description}"),
            Self::NoEntries => f.write_str(NO_ENTRIES_MESSAGE),
            Self::Cancelled => f.write_str(CANCELLED_MESSAGE),
        }
    }
}

/// Anything that can turn a prompt into an emotion report
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmotionAnalyst: Send + Sync {
    /// Analyze `prompt` with the instruction for `kind`
    async fn analyze(&self, kind: AnalysisKind, prompt: &str) -> AnalysisOutcome;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat-completion client
#[derive(Clone)]
pub struct ChatCompletionClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f64,
}

impl ChatCompletionClient {
    /// Build a client for the configured endpoint
    pub fn new(config: &AnalysisConfig, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(DiaryError::InvalidConfig(
                "an API key is required for emotion analysis (analysis.api_key or OPENAI_API_KEY)".to_string(),
            ));
        }

        let http = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;

        Ok(Self {
            http,
            endpoint: format!("{}{CHAT_COMPLETIONS_PATH}", config.api_base.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    /// Full URL requests are sent to
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send `prompt` and map whatever happens to an outcome
    pub async fn request_analysis(&self, kind: AnalysisKind, prompt: &str) -> AnalysisOutcome {
        let started = Instant::now();
        debug!(kind = kind.as_str(), prompt_chars = prompt.chars().count(), "Requesting emotion analysis");

        let outcome = self.send(kind, prompt).await;
        match &outcome {
            AnalysisOutcome::Text(_) | AnalysisOutcome::NoResult => {
                info!(kind = kind.as_str(), outcome = outcome.metric_label(), "Emotion analysis finished");
            }
            _ => warn!(kind = kind.as_str(), %outcome, "Emotion analysis failed"),
        }
        metrics::record_analysis(kind.as_str(), &outcome, started.elapsed());

        outcome
    }

    async fn send(&self, kind: AnalysisKind, prompt: &str) -> AnalysisOutcome {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: kind.system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
        };

        let response = match self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return AnalysisOutcome::Failed(e.to_string()),
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return AnalysisOutcome::RateLimited;
        }
        if !status.is_success() {
            return AnalysisOutcome::ServerError(status.as_u16());
        }

        match response.json::<ChatResponse>().await {
            Ok(body) => body
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .map_or(AnalysisOutcome::NoResult, AnalysisOutcome::Text),
            Err(e) => AnalysisOutcome::Failed(e.to_string()),
        }
    }
}

#[async_trait]
impl EmotionAnalyst for ChatCompletionClient {
    async fn analyze(&self, kind: AnalysisKind, prompt: &str) -> AnalysisOutcome {
        self.request_analysis(kind, prompt).await
    }
}

/// A report running in the background, owned by whoever shows it
///
/// Dropping the task (or calling [`ReportTask::cancel`]) aborts the request,
/// so a dismissed screen never leaves work behind.
pub struct ReportTask {
    handle: Option<JoinHandle<Result<AnalysisOutcome>>>,
}

impl ReportTask {
    /// Run `future` on the tokio runtime
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<AnalysisOutcome>> + Send + 'static,
    {
        Self {
            handle: Some(tokio::spawn(future)),
        }
    }

    /// Whether the report has resolved
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Abort the report
    pub fn cancel(mut self) {
        self.abort();
    }

    /// Wait for the report; an aborted task resolves to [`AnalysisOutcome::Cancelled`]
    pub async fn wait(mut self) -> Result<AnalysisOutcome> {
        let Some(handle) = self.handle.take() else {
            return Ok(AnalysisOutcome::Cancelled);
        };

        match handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Ok(AnalysisOutcome::Cancelled),
            Err(e) => Err(e.into()),
        }
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!("Aborting pending emotion report");
            handle.abort();
        }
    }
}

impl Drop for ReportTask {
    fn drop(&mut self) {
        self.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_messages() {
        assert_eq!(AnalysisOutcome::NoResult.to_string(), NO_RESULT_MESSAGE);
        assert_eq!(AnalysisOutcome::RateLimited.to_string(), RATE_LIMIT_MESSAGE);
        assert_eq!(AnalysisOutcome::ServerError(503).to_string(), "서버 오류: 503");
        assert!(AnalysisOutcome::Failed("timed out".into()).to_string().contains("timed out"));
        assert_eq!(AnalysisOutcome::Text("ok".into()).text(), Some("ok"));
        assert_eq!(AnalysisOutcome::RateLimited.text(), None);
    }

    #[test]
    fn test_weekly_instruction_warns_against_linking_days() {
        let prompt = AnalysisKind::Weekly.system_prompt();
        assert!(prompt.contains("인과관계를 만들어내는 것은 피해야 해"));
        assert!(prompt.contains("1. 이번 주의 감정: 복합적인 감정"));
        assert!(prompt.contains("무조건적으로 엮지 않아야 해"));
    }

    #[test]
    fn test_entry_prompt_embeds_content() {
        let entry = crate::models::NewDiaryEntry::new("제목", "비가 왔다", "슬픔", "").into_entry(1);
        let prompt = build_entry_prompt(&entry);
        assert!(prompt.starts_with(ENTRY_PROMPT_HEADER));
        assert!(prompt.ends_with("비가 왔다"));
    }

    #[test]
    fn test_client_requires_api_key() {
        let result = ChatCompletionClient::new(&AnalysisConfig::default(), "  ");
        assert!(matches!(result, Err(DiaryError::InvalidConfig(_))));
    }

    #[test]
    fn test_endpoint_joins_base() {
        let config = AnalysisConfig {
            api_base: "http://localhost:8080/".to_string(),
            ..AnalysisConfig::default()
        };
        let client = ChatCompletionClient::new(&config, "key").unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_dropping_task_aborts_future() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let task = ReportTask::spawn(async move {
            let _tx = tx;
            std::future::pending::<()>().await;
            Ok(AnalysisOutcome::NoResult)
        });
        assert!(!task.is_finished());

        drop(task);
        // The sender is dropped along with the aborted future.
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn test_cancel_aborts_future() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let task = ReportTask::spawn(async move {
            let _tx = tx;
            std::future::pending::<()>().await;
            Ok(AnalysisOutcome::NoResult)
        });

        task.cancel();
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn test_wait_returns_outcome() {
        let task = ReportTask::spawn(async { Ok(AnalysisOutcome::Text("done".into())) });
        assert_eq!(task.wait().await.unwrap(), AnalysisOutcome::Text("done".into()));
    }
}
