use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use crate::core::config::Settings;
use crate::grading::resolvers::{Feedback, FeedbackRequest, FeedbackResolver, ResolverError};

const FEEDBACK_SYSTEM_PROMPT: &str =
    "You are an expert educational evaluator providing constructive feedback to students.";
const MAX_ITEMS: usize = 3;
const MAX_RETRIES: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Strengths,
    Weaknesses,
    Suggestions,
}

fn section_header(line: &str) -> Option<Section> {
    let upper = line.to_uppercase();
    if upper.contains("STRENGTH") {
        Some(Section::Strengths)
    } else if upper.contains("WEAKNESS") {
        Some(Section::Weaknesses)
    } else if upper.contains("SUGGESTION") {
        Some(Section::Suggestions)
    } else {
        None
    }
}

/// Splits a `STRENGTHS:` / `WEAKNESSES:` / `SUGGESTIONS:` bullet list into
/// feedback. Empty sections get a default line; each keeps at most three.
pub(crate) fn parse_feedback_response(text: &str) -> Feedback {
    let mut feedback = Feedback::default();
    let mut current = None;

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let bullet = line.strip_prefix(['-', '•', '*']).map(str::trim);
        let Some(content) = bullet else {
            if let Some(section) = section_header(line) {
                current = Some(section);
            }
            continue;
        };
        if content.is_empty() {
            continue;
        }
        let target = match current {
            Some(Section::Strengths) => &mut feedback.strengths,
            Some(Section::Weaknesses) => &mut feedback.weaknesses,
            Some(Section::Suggestions) => &mut feedback.suggestions,
            None => continue,
        };
        target.push(content.to_string());
    }

    if feedback.strengths.is_empty() {
        feedback.strengths.push("The answer demonstrates understanding of the topic.".to_string());
    }
    if feedback.weaknesses.is_empty() {
        feedback
            .weaknesses
            .push("Some key concepts could be explained in more detail.".to_string());
    }
    if feedback.suggestions.is_empty() {
        feedback
            .suggestions
            .push("Review the model answer to identify missing concepts.".to_string());
    }
    truncate(&mut feedback);
    feedback
}

fn truncate(feedback: &mut Feedback) {
    feedback.strengths.truncate(MAX_ITEMS);
    feedback.weaknesses.truncate(MAX_ITEMS);
    feedback.suggestions.truncate(MAX_ITEMS);
}

/// Template feedback driven only by the awarded percentage and missing
/// concepts.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RuleBasedFeedback;

impl RuleBasedFeedback {
    pub(crate) fn build(request: &FeedbackRequest) -> Feedback {
        let percentage =
            if request.max_marks > 0.0 { request.marks / request.max_marks * 100.0 } else { 0.0 };
        let mut feedback = Feedback::default();

        if percentage >= 70.0 {
            feedback
                .strengths
                .push("The answer demonstrates good understanding of the topic.".into());
            feedback.strengths.push("Key concepts are generally well explained.".into());
        } else if percentage >= 50.0 {
            feedback.strengths.push("The answer shows some understanding of the topic.".into());
            feedback.weaknesses.push("Some important concepts are missing or unclear.".into());
        } else {
            feedback.weaknesses.push("The answer lacks depth and key concepts.".into());
            feedback.weaknesses.push("Important details are missing.".into());
        }

        if !request.missing_concepts.is_empty() {
            let listed = |count: usize| {
                request.missing_concepts.iter().take(count).cloned().collect::<Vec<_>>().join(", ")
            };
            feedback.weaknesses.push(format!("Missing key concepts: {}", listed(3)));
            feedback.suggestions.push(format!("Focus on including: {}", listed(2)));
        }
        feedback
            .suggestions
            .push("Compare your answer with the model answer to identify gaps.".into());
        feedback.suggestions.push("Provide more detailed explanations for better scores.".into());

        if feedback.strengths.is_empty() {
            feedback.strengths.push("The answer addresses the question.".into());
        }
        if feedback.weaknesses.is_empty() {
            feedback.weaknesses.push("Consider adding more detail to improve your score.".into());
        }
        truncate(&mut feedback);
        feedback
    }
}

#[async_trait]
impl FeedbackResolver for RuleBasedFeedback {
    async fn feedback(&self, request: &FeedbackRequest) -> Result<Feedback, ResolverError> {
        Ok(Self::build(request))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct LlmFeedbackService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl LlmFeedbackService {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let ai = settings.ai();
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(ai.ai_request_timeout))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: ai.openai_api_key.clone(),
            base_url: ai.openai_base_url.trim_end_matches('/').to_string(),
            model: ai.feedback_model.clone(),
            max_tokens: ai.ai_max_tokens,
            temperature: ai.ai_temperature,
        })
    }

    pub(crate) fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.base_url.is_empty()
    }

    fn prompt(request: &FeedbackRequest) -> String {
        let missing = if request.missing_concepts.is_empty() {
            "None".to_string()
        } else {
            request.missing_concepts.join(", ")
        };
        format!(
            "You are an expert educational evaluator. Analyze the following student answer and provide constructive feedback.\n\n\
             Question: {}\n\nModel Answer (Expected Answer):\n{}\n\nStudent Answer:\n{}\n\n\
             Marks Awarded: {}/{}\nMissing Key Concepts: {}\n\n\
             Please provide feedback in the following format:\n\
             STRENGTHS:\n- [strength 1]\n- [strength 2]\n\n\
             WEAKNESSES:\n- [weakness 1]\n- [weakness 2]\n\n\
             SUGGESTIONS:\n- [suggestion 1]\n- [suggestion 2]\n",
            request.question,
            request.model_answer,
            request.student_answer,
            request.marks,
            request.max_marks,
            missing
        )
    }

    pub(crate) async fn generate(&self, request: &FeedbackRequest) -> Result<Feedback> {
        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": FEEDBACK_SYSTEM_PROMPT},
                {"role": "user", "content": Self::prompt(request)}
            ],
            "max_completion_tokens": self.max_tokens,
            "temperature": self.temperature,
        });

        let url = format!("{}/chat/completions", self.base_url);
        let mut last_error = None;
        let mut body = Value::Null;

        for attempt in 0..=MAX_RETRIES {
            let response =
                self.client.post(&url).bearer_auth(&self.api_key).json(&payload).send().await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    body = resp.json().await.unwrap_or(Value::Null);
                    if status.is_success() {
                        last_error = None;
                        break;
                    }
                    last_error = Some(anyhow::anyhow!("Feedback API error {status}: {body}"));
                    if !is_retryable(status) {
                        break;
                    }
                }
                Err(err) => {
                    last_error = Some(anyhow::anyhow!(err).context("Failed to call feedback API"));
                }
            }

            if attempt < MAX_RETRIES {
                tokio::time::sleep(Duration::from_secs(2_u64.pow(attempt))).await;
            }
        }

        if let Some(err) = last_error {
            return Err(err);
        }

        let content = body
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|value| value.as_str())
            .context("Missing feedback response content")?;

        Ok(parse_feedback_response(content))
    }
}

/// Rate limits and server-side failures; other client errors will not
/// succeed on a second try.
fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// LLM feedback when configured, rule-based feedback otherwise or on error.
#[derive(Debug, Clone)]
pub(crate) struct FeedbackService {
    llm: Option<LlmFeedbackService>,
}

impl FeedbackService {
    pub(crate) fn new(llm: Option<LlmFeedbackService>) -> Self {
        Self { llm: llm.filter(LlmFeedbackService::is_configured) }
    }

    pub(crate) fn uses_llm(&self) -> bool {
        self.llm.is_some()
    }
}

#[async_trait]
impl FeedbackResolver for FeedbackService {
    async fn feedback(&self, request: &FeedbackRequest) -> Result<Feedback, ResolverError> {
        let Some(llm) = &self.llm else {
            return Ok(RuleBasedFeedback::build(request));
        };

        match llm.generate(request).await {
            Ok(feedback) => Ok(feedback),
            Err(err) => {
                tracing::warn!(error = %err, "LLM feedback failed; using rule-based feedback");
                metrics::counter!("resolver_fallbacks_total", "resolver" => "feedback")
                    .increment(1);
                Ok(RuleBasedFeedback::build(request))
            }
        }
    }
}
