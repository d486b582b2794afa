use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Cleaned responses that are heuristically indistinguishable from a
/// refusal; never written into a form.
const REFUSAL_SENTINELS: &[&str] = &[
    "0",
    "no",
    "none",
    "not sure",
    "n/a",
    "na",
    "i don't know",
    "unknown",
];

/// Transport to the external answer-generation collaborator. Returns
/// the raw response text; errors are converted to "no answer" by
/// [`AnswerSource`].
#[async_trait]
pub trait AnswerBackend: Send + Sync {
    async fn ask(&self, question: &str) -> Result<String>;
}

/// Strip leading list markers ("1.", "-", "•") and surrounding
/// whitespace from a raw response.
pub fn clean_response(raw: &str) -> String {
    let mut text = raw.trim();

    let digits = text.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 && text[digits..].starts_with('.') {
        text = text[digits + 1..].trim_start();
    }
    if let Some(rest) = text.strip_prefix('-').or_else(|| text.strip_prefix('•')) {
        text = rest.trim_start();
    }

    text.trim().to_string()
}

fn is_refusal(cleaned: &str) -> bool {
    let lower = cleaned.to_lowercase();
    let lower = lower.trim_end_matches(['.', '!']).trim_end();
    REFUSAL_SENTINELS.contains(&lower)
}

/// Abstraction over the answer-generation collaborator: returns a
/// cleaned, usable answer or nothing, and never lets a transport
/// failure escape its boundary.
pub struct AnswerSource {
    backend: Box<dyn AnswerBackend>,
}

impl AnswerSource {
    pub fn new(backend: Box<dyn AnswerBackend>) -> Self {
        Self { backend }
    }

    pub async fn answer(&self, question: &str) -> Option<String> {
        let raw = match self.backend.ask(question).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(question, error = %e, "answer service failed, treating as no answer");
                return None;
            }
        };
        let cleaned = clean_response(&raw);
        if cleaned.is_empty() || is_refusal(&cleaned) {
            debug!(question, raw = %raw, "response filtered as no answer");
            return None;
        }
        info!(question, answer = %cleaned, "answer produced");
        Some(cleaned)
    }
}

// ── OpenWebUI transport ─────────────────────────────────────────────

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct FileRef {
    r#type: &'static str,
    id: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    files: Vec<FileRef>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    id: String,
}

/// OpenWebUI-backed answer transport. Sends each question together with
/// the full candidate profile text and a reference to the previously
/// uploaded profile document.
pub struct OpenWebUiBackend {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    profile_text: String,
    file_id: Option<String>,
}

impl OpenWebUiBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        profile_text: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            profile_text: profile_text.into(),
            file_id: None,
        }
    }

    /// Upload the profile document and remember its file id for
    /// subsequent questions.
    pub async fn upload_profile_document(&mut self, path: &std::path::Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "profile".to_string());
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(format!("{}/api/v1/files/", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        let upload: UploadResponse = response.json().await?;
        info!(file_id = %upload.id, "uploaded profile document");
        self.file_id = Some(upload.id.clone());
        Ok(upload.id)
    }

    fn prompt(&self, question: &str) -> String {
        format!(
            "You are a helpful assistant. Answer the following job application question \
             based only on the profile content in the uploaded file.\n\n\
             If the question asks about years of experience with a specific skill or \
             technology, extract that number from the profile if clearly present. \
             If not mentioned or unclear, leave the answer completely blank.\n\n\
             If the question is about eligibility (Yes/No), answer only 'Yes' or 'No'. \
             If you're unsure, leave the answer blank.\n\n\
             If it's a multiple-choice question (radio or checkbox), pick the most \
             relevant option exactly as shown. If not enough information is available, \
             leave it blank.\n\n\
             Do not include explanations. If there's no clear answer from the profile, \
             return nothing.\n\n\
             Profile:\n{}\n\nQuestion: {}",
            self.profile_text, question
        )
    }
}

#[async_trait]
impl AnswerBackend for OpenWebUiBackend {
    async fn ask(&self, question: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: self.prompt(question),
            }],
            files: self
                .file_id
                .iter()
                .map(|id| FileRef {
                    r#type: "file",
                    id: id.clone(),
                })
                .collect(),
        };

        let response = self
            .http
            .post(format!("{}/api/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::AnswerService("empty choices in response".into()))
    }
}
