#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, serde::Deserialize)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    /// Per-question points under the difficulty-derived policy.
    pub fn question_points(&self) -> i64 {
        match self {
            Difficulty::Beginner => 10,
            Difficulty::Intermediate => 15,
            Difficulty::Advanced => 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, serde::Deserialize)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    QcmSingle,
    QcmMultiple,
    TrueFalse,
    OpenShort,
    OpenLong,
    FillBlank,
}

impl QuestionType {
    /// Whether this type carries its own authored choice list.
    pub fn has_authored_choices(&self) -> bool {
        matches!(self, QuestionType::QcmSingle | QuestionType::QcmMultiple)
    }
}

/// The two fixed rows every true/false question gets, in order.
pub const TRUE_FALSE_CHOICES: [(&str, &str); 2] = [("True", "صواب"), ("False", "خطأ")];

/// Inserts one exercise row and returns its generated id.
pub async fn insert_exercise(
    conn: &mut SqliteConnection,
    lesson_id: i64,
    entry: &ExerciseEntry,
    order: i64,
    created_by: i64,
) -> anyhow::Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO exercises
            (lesson_id, title, title_arabic, instructions, instructions_arabic,
             difficulty_level, "order", is_active, is_published, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, 1, 1, ?, ?)
        "#,
    )
    .bind(lesson_id)
    .bind(&entry.title)
    .bind(&entry.title_arabic)
    .bind(&entry.instructions)
    .bind(&entry.instructions_arabic)
    .bind(entry.difficulty)
    .bind(order)
    .bind(created_by)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await
    .with_context(|| format!("Failed to insert exercise: {}", entry.title))?;

    Ok(result.last_insert_rowid())
}

/// Inserts one question row and returns its generated id.
pub async fn insert_question(
    conn: &mut SqliteConnection,
    exercise_id: i64,
    entry: &QuestionEntry,
    order: i64,
    points: i64,
) -> anyhow::Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO questions
            (exercise_id, text, text_arabic, question_type, points, "order",
             explanation, explanation_arabic, correct_answer)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(exercise_id)
    .bind(&entry.text)
    .bind(&entry.text_arabic)
    .bind(entry.question_type)
    .bind(points)
    .bind(order)
    .bind(&entry.explanation)
    .bind(&entry.explanation_arabic)
    .bind(&entry.correct_answer)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("Failed to insert question {} of exercise {}", order, exercise_id))?;

    Ok(result.last_insert_rowid())
}

pub async fn insert_choice(
    conn: &mut SqliteConnection,
    question_id: i64,
    text: &str,
    text_arabic: Option<&str>,
    is_correct: bool,
    order: i64,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO question_choices (question_id, text, text_arabic, is_correct, "order")
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(question_id)
    .bind(text)
    .bind(text_arabic)
    .bind(is_correct)
    .bind(order)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("Failed to insert choice {} of question {}", order, question_id))?;

    Ok(())
}

/// Gamification values attached one-to-one to an exercise. Write-once; the
/// values are decided by the reward policy before insertion.
#[derive(Debug, Clone, Copy, PartialEq, sqlx::FromRow)]
pub struct ExerciseReward {
    pub completion_points: i64,
    pub completion_coins: i64,
    pub perfect_score_bonus: i64,
    pub high_score_bonus: i64,
    pub difficulty_multiplier: f64,
    pub attempt_points: i64,
    pub improvement_bonus: i64,
    pub streak_bonus: i64,
    pub base_xp: i64,
    pub bonus_xp: i64,
}

impl ExerciseReward {
    pub async fn insert(&self, conn: &mut SqliteConnection, exercise_id: i64) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO exercise_rewards
                (exercise_id, completion_points, completion_coins, perfect_score_bonus,
                 high_score_bonus, difficulty_multiplier, attempt_points,
                 improvement_bonus, streak_bonus, base_xp, bonus_xp)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(exercise_id)
        .bind(self.completion_points)
        .bind(self.completion_coins)
        .bind(self.perfect_score_bonus)
        .bind(self.high_score_bonus)
        .bind(self.difficulty_multiplier)
        .bind(self.attempt_points)
        .bind(self.improvement_bonus)
        .bind(self.streak_bonus)
        .bind(self.base_xp)
        .bind(self.bonus_xp)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to insert reward for exercise {}", exercise_id))?;

        Ok(())
    }
}

use crate::content_bank::{ExerciseEntry, QuestionEntry};
use anyhow::Context;
use chrono::Utc;
use sqlx::SqliteConnection;
