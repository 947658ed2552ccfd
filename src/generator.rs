//! Best-effort exercise generation through an OpenAI-style chat API.
//!
//! The response contract is a strict JSON object `{"exercises": [...]}`
//! reusing the bank entry schema. Anything that goes wrong — transport
//! error, malformed JSON, failed validation — degrades to a deterministic
//! per-subject fallback template and is logged, never fatal.
//!
//! NOTE: the API key is never logged.

use std::time::Duration;

use anyhow::Context;
use log::{info, warn};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::content_bank::{self, ChoiceEntry, ContentBank, ExerciseEntry, PointsPolicy, QuestionEntry};
use crate::db;
use crate::exercises::{Difficulty, QuestionType};
use crate::lessons::Lesson;
use crate::outcome::SeedSummary;
use crate::rewards::RewardPolicy;
use crate::seeder::{self, SeedOptions};

pub struct GenerateOptions {
    pub api_key: Option<String>,
    pub model: String,
    pub batch_size: i64,
    pub start_id: i64,
    pub end_id: i64,
    pub subject: Option<String>,
    pub grade: Option<i64>,
    pub dry_run: bool,
    pub verbose: bool,
    /// Fixed pause between requests, in seconds. No backoff.
    pub delay: f64,
    pub created_by: i64,
    pub rewards: RewardPolicy,
}

#[derive(Debug, Default)]
pub struct GenerateReport {
    pub lessons: usize,
    pub generated: usize,
    pub fallbacks: usize,
    pub summary: SeedSummary,
}

/// Scans the id range for lessons without exercises and fills each one,
/// from the model when possible and from the fallback template otherwise.
pub async fn run_generate(pool: &SqlitePool, opts: &GenerateOptions) -> anyhow::Result<GenerateReport> {
    let api_key = opts
        .api_key
        .clone()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok());
    let client = match api_key {
        Some(key) => Some(GeneratorClient::new(key, opts.model.clone())?),
        None => {
            warn!("No API key configured; every lesson will use the fallback template");
            None
        }
    };

    let lessons = db::lessons_missing_exercises(
        pool,
        opts.start_id,
        opts.end_id,
        opts.subject.as_deref(),
        opts.grade,
        opts.batch_size,
    )
    .await?;

    let mut report = GenerateReport::default();
    report.lessons = lessons.len();

    if lessons.is_empty() {
        println!("No lessons in range are missing exercises.");
        return Ok(report);
    }

    for (i, lesson) in lessons.iter().enumerate() {
        if i > 0 && opts.delay > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(opts.delay)).await;
        }

        let (entries, mut from_fallback) = match &client {
            Some(client) => match client.generate_exercises(lesson).await {
                Ok(entries) => (entries, false),
                Err(e) => {
                    warn!(
                        "Generation for lesson {} failed ({}); using the fallback template",
                        lesson.id, e
                    );
                    (vec![fallback_exercise(lesson)], true)
                }
            },
            None => (vec![fallback_exercise(lesson)], true),
        };

        let mut bank = ContentBank {
            lesson_id: lesson.id,
            exercises: entries,
        };
        let problems = content_bank::validate(&bank, PointsPolicy::Difficulty);
        if !problems.is_empty() {
            warn!(
                "Generated content for lesson {} failed validation ({}); using the fallback template",
                lesson.id,
                problems.join("; ")
            );
            bank.exercises = vec![fallback_exercise(lesson)];
            from_fallback = true;
        }

        if from_fallback {
            report.fallbacks += 1;
        } else {
            report.generated += 1;
        }

        let question_count: usize = bank.exercises.iter().map(|e| e.questions.len()).sum();
        if opts.verbose || opts.dry_run {
            println!(
                "  {} {}: {} exercise(s), {} question(s){}",
                if opts.dry_run { "[dry-run]" } else { "-" },
                lesson.label(),
                bank.exercises.len(),
                question_count,
                if from_fallback { " (fallback)" } else { "" }
            );
        }
        if opts.dry_run {
            continue;
        }

        let seed_opts = SeedOptions {
            delete_existing: false,
            points: PointsPolicy::Difficulty,
            rewards: opts.rewards,
            atomic: true,
            created_by: opts.created_by,
        };
        let summary = seeder::seed_lesson(pool, lesson, &bank, &seed_opts).await?;
        report.summary.exercises += summary.exercises;
        report.summary.questions += summary.questions;
        report.summary.choices += summary.choices;
        report.summary.rewards += summary.rewards;
    }

    Ok(report)
}

pub struct GeneratorClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeneratorClient {
    pub fn new(api_key: String, model: String) -> anyhow::Result<Self> {
        let base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url,
            model,
        })
    }

    /// One chat-completions call returning the lesson's exercise entries.
    pub async fn generate_exercises(&self, lesson: &Lesson) -> Result<Vec<ExerciseEntry>, String> {
        let url = format!("{}/chat/completions", self.base_url);
        let req = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessageReq {
                    role: "system".into(),
                    content: SYSTEM_PROMPT.into(),
                },
                ChatMessageReq {
                    role: "user".into(),
                    content: user_prompt(lesson),
                },
            ],
            temperature: 0.7,
            response_format: Some(ResponseFormat {
                r#type: "json_object".into(),
            }),
        };

        let res = self
            .client
            .post(&url)
            .header(USER_AGENT, "seedbank/0.1")
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&req)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            let msg = extract_api_error(&body).unwrap_or(body);
            return Err(format!("API HTTP {}: {}", status, msg));
        }

        let body: ChatCompletionResponse = res.json().await.map_err(|e| e.to_string())?;
        if let Some(usage) = &body.usage {
            info!(
                "API usage for lesson {}: prompt={:?} completion={:?}",
                lesson.id, usage.prompt_tokens, usage.completion_tokens
            );
        }
        let content = body
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        parse_generated(&content)
    }
}

const SYSTEM_PROMPT: &str = "You write quiz content for a school e-learning platform. \
Respond ONLY with a strict JSON object, no prose and no markdown fences.";

fn user_prompt(lesson: &Lesson) -> String {
    format!(
        "Create one exercise with 3 to 5 questions for the lesson '{}' \
         (subject: {}, grade: {}). Return a JSON object \
         {{\"exercises\": [...]}}. Each exercise has: title, title_arabic, \
         instructions, instructions_arabic, difficulty (one of beginner, \
         intermediate, advanced), questions. Each question has: text, \
         text_arabic, question_type (one of qcm_single, qcm_multiple, \
         true_false, open_short, open_long, fill_blank), and for choice \
         types a choices list of {{text, text_arabic, is_correct}}. \
         true_false questions carry correct_answer (\"True\" or \"False\") \
         and no choices; open questions may carry explanation and \
         explanation_arabic.",
        lesson.title,
        lesson.subject.as_deref().unwrap_or("general"),
        lesson
            .grade
            .map(|g| g.to_string())
            .unwrap_or_else(|| "unspecified".into()),
    )
}

/// Parses the model's JSON payload into exercise entries.
pub fn parse_generated(content: &str) -> Result<Vec<ExerciseEntry>, String> {
    #[derive(Deserialize)]
    struct GeneratedPayload {
        exercises: Vec<ExerciseEntry>,
    }

    let payload: GeneratedPayload =
        serde_json::from_str(content).map_err(|e| format!("JSON parse error: {}", e))?;
    if payload.exercises.is_empty() {
        return Err("payload declares no exercises".into());
    }
    Ok(payload.exercises)
}

/// Deterministic per-subject template used whenever generation fails.
/// Always exactly one exercise, valid under the difficulty points policy.
pub fn fallback_exercise(lesson: &Lesson) -> ExerciseEntry {
    let subject = lesson.subject.as_deref().unwrap_or("").to_lowercase();
    let focus = match subject.as_str() {
        "biology" => "living systems and how they interact",
        "chemistry" => "substances and how they react",
        "geology" => "Earth structures and the processes shaping them",
        "math" | "mathematics" => "mathematical reasoning and problem solving",
        "physics" => "physical phenomena and the laws behind them",
        _ => "the key ideas of this lesson",
    };

    ExerciseEntry {
        title: format!("Review: {}", lesson.title),
        title_arabic: lesson
            .title_arabic
            .as_ref()
            .map(|t| format!("مراجعة: {}", t)),
        instructions: Some(format!(
            "Check your understanding of {} as covered in this lesson.",
            focus
        )),
        instructions_arabic: None,
        difficulty: Difficulty::Beginner,
        questions: vec![
            QuestionEntry {
                text: format!("Which statement best describes what '{}' is about?", lesson.title),
                text_arabic: None,
                question_type: QuestionType::QcmSingle,
                points: None,
                explanation: None,
                explanation_arabic: None,
                correct_answer: None,
                choices: vec![
                    ChoiceEntry {
                        text: format!("It explores {}.", focus),
                        text_arabic: None,
                        is_correct: true,
                    },
                    ChoiceEntry {
                        text: "It only lists historical dates.".into(),
                        text_arabic: None,
                        is_correct: false,
                    },
                    ChoiceEntry {
                        text: "It is a language exercise.".into(),
                        text_arabic: None,
                        is_correct: false,
                    },
                    ChoiceEntry {
                        text: "None of the above.".into(),
                        text_arabic: None,
                        is_correct: false,
                    },
                ],
            },
            QuestionEntry {
                text: format!(
                    "'{}' belongs to the {} curriculum.",
                    lesson.title,
                    lesson.subject.as_deref().unwrap_or("school")
                ),
                text_arabic: None,
                question_type: QuestionType::TrueFalse,
                points: None,
                explanation: None,
                explanation_arabic: None,
                correct_answer: Some("True".into()),
                choices: Vec::new(),
            },
            QuestionEntry {
                text: format!(
                    "In your own words, summarise the most important idea of '{}'.",
                    lesson.title
                ),
                text_arabic: None,
                question_type: QuestionType::OpenShort,
                points: None,
                explanation: Some(format!(
                    "Any answer connecting the lesson to {} is acceptable.",
                    focus
                )),
                explanation_arabic: None,
                correct_answer: None,
                choices: Vec::new(),
            },
        ],
    }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessageReq>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq {
    role: String,
    content: String,
}
#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    r#type: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResp,
}
#[derive(Deserialize)]
struct ChatMessageResp {
    content: Option<String>,
}
#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: Option<u32>,
    #[serde(default)]
    completion_tokens: Option<u32>,
}

/// Try to extract a clean error message from an API error body.
fn extract_api_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct EWrap {
        error: EObj,
    }
    #[derive(Deserialize)]
    struct EObj {
        message: String,
    }
    match serde_json::from_str::<EWrap>(body) {
        Ok(w) => Some(w.error.message),
        Err(_) => None,
    }
}
