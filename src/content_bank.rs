/// A pre-authored content bank: one lesson's exercises, questions, and
/// choices as plain data. Banks live as JSON files under ./banks/.
#[derive(Debug, serde::Deserialize)]
pub struct ContentBank {
    pub lesson_id: i64,
    pub exercises: Vec<ExerciseEntry>,
}

#[derive(Debug, serde::Deserialize)]
pub struct ExerciseEntry {
    pub title: String,
    #[serde(default)]
    pub title_arabic: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub instructions_arabic: Option<String>,
    pub difficulty: Difficulty,
    pub questions: Vec<QuestionEntry>,
}

#[derive(Debug, serde::Deserialize)]
pub struct QuestionEntry {
    pub text: String,
    #[serde(default)]
    pub text_arabic: Option<String>,
    pub question_type: QuestionType,
    #[serde(default)]
    pub points: Option<i64>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub explanation_arabic: Option<String>,
    /// "True" or "False"; only meaningful for true_false questions.
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChoiceEntry>,
}

#[derive(Debug, serde::Deserialize)]
pub struct ChoiceEntry {
    pub text: String,
    #[serde(default)]
    pub text_arabic: Option<String>,
    #[serde(default)]
    pub is_correct: bool,
}

/// How per-question point values are decided during seeding. The two
/// policies coexist; a run picks exactly one, they are never merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PointsPolicy {
    /// 10 / 15 / 20 points per question for beginner / intermediate / advanced.
    Difficulty,
    /// The literal `points` value authored on each question, unchanged.
    Literal,
}

pub fn resolve_points(
    difficulty: Difficulty,
    question: &QuestionEntry,
    policy: PointsPolicy,
) -> Option<i64> {
    match policy {
        PointsPolicy::Difficulty => Some(difficulty.question_points()),
        PointsPolicy::Literal => question.points,
    }
}

pub fn load_bank(name: &str) -> anyhow::Result<ContentBank> {
    let mut path = PathBuf::from(".");
    path.push("banks");
    path.push(name);

    let file = File::open(&path)
        .with_context(|| format!("Could not open bank file {}", path.display()))?;

    let reader = BufReader::new(file);

    let bank = serde_json::from_reader(reader)
        .with_context(|| format!("Bank file {} is not valid JSON", path.display()))?;

    Ok(bank)
}

/// Checks the structural invariants of a bank before anything is written.
/// Returns every problem found, not just the first.
pub fn validate(bank: &ContentBank, policy: PointsPolicy) -> Vec<String> {
    let mut problems = Vec::new();

    if bank.exercises.is_empty() {
        problems.push("bank declares no exercises".to_string());
    }

    for (ei, exercise) in bank.exercises.iter().enumerate() {
        let at = |detail: String| format!("exercise {} ({}): {}", ei + 1, exercise.title, detail);

        if exercise.questions.is_empty() {
            problems.push(at("has no questions".to_string()));
        }

        for (qi, question) in exercise.questions.iter().enumerate() {
            let correct = question.choices.iter().filter(|c| c.is_correct).count();

            match question.question_type {
                QuestionType::QcmSingle => {
                    if question.choices.is_empty() {
                        problems.push(at(format!("question {} has no choices", qi + 1)));
                    } else if correct != 1 {
                        problems.push(at(format!(
                            "question {} must have exactly one correct choice, found {}",
                            qi + 1,
                            correct
                        )));
                    }
                }
                QuestionType::QcmMultiple => {
                    if question.choices.is_empty() {
                        problems.push(at(format!("question {} has no choices", qi + 1)));
                    } else if correct == 0 {
                        problems.push(at(format!(
                            "question {} must have at least one correct choice",
                            qi + 1
                        )));
                    }
                }
                QuestionType::TrueFalse => {
                    // The two rows are always engine-generated; an authored
                    // list would let the variants disagree.
                    if !question.choices.is_empty() {
                        problems.push(at(format!(
                            "true/false question {} must not author its own choices",
                            qi + 1
                        )));
                    }
                    match question.correct_answer.as_deref() {
                        Some("True") | Some("False") => {}
                        Some(other) => problems.push(at(format!(
                            "true/false question {} has correct_answer '{}', expected 'True' or 'False'",
                            qi + 1,
                            other
                        ))),
                        None => problems.push(at(format!(
                            "true/false question {} is missing correct_answer",
                            qi + 1
                        ))),
                    }
                }
                QuestionType::OpenShort | QuestionType::OpenLong | QuestionType::FillBlank => {
                    if !question.choices.is_empty() {
                        problems.push(at(format!(
                            "open question {} must not carry choices",
                            qi + 1
                        )));
                    }
                }
            }

            if policy == PointsPolicy::Literal && question.points.is_none() {
                problems.push(at(format!(
                    "question {} has no points value under the literal points policy",
                    qi + 1
                )));
            }
        }
    }

    problems
}

use crate::exercises::{Difficulty, QuestionType};
use anyhow::Context;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
