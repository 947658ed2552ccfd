// src/seeder.rs

use crate::content_bank::{self, ContentBank, PointsPolicy};
use crate::db::{self, LessonLookup, LessonTarget};
use crate::exercises::{self, QuestionType, TRUE_FALSE_CHOICES};
use crate::lessons::Lesson;
use crate::outcome::{SeedOutcome, SeedSummary};
use crate::rewards::{self, RewardPolicy};
use anyhow::Context;
use log::debug;
use sqlx::{SqliteConnection, SqlitePool};

pub struct SeedOptions {
    pub delete_existing: bool,
    pub points: PointsPolicy,
    pub rewards: RewardPolicy,
    /// One transaction around reset + seed + rewards. Turning this off
    /// reproduces the unwrapped write-per-statement behavior, where a
    /// mid-seed failure leaves partial state behind.
    pub atomic: bool,
    /// Author id recorded on every created exercise.
    pub created_by: i64,
}

/// Runs the whole pipeline: locate, optionally reset, seed, reward.
/// Never panics and never swallows; everything comes back as a typed
/// outcome for the caller to report and map to an exit code.
pub async fn run(
    pool: &SqlitePool,
    target: &LessonTarget,
    bank: &ContentBank,
    opts: &SeedOptions,
) -> SeedOutcome {
    let lesson = match db::locate_lesson(pool, target).await {
        Ok(LessonLookup::Found(lesson)) => lesson,
        Ok(LessonLookup::NotFound(msg)) => return SeedOutcome::LessonNotFound(msg),
        Err(e) => return SeedOutcome::Failed(format!("{:#}", e)),
    };

    let problems = content_bank::validate(bank, opts.points);
    if !problems.is_empty() {
        return SeedOutcome::InvalidContent(problems.join("; "));
    }

    match seed_lesson(pool, &lesson, bank, opts).await {
        Ok(summary) => SeedOutcome::Seeded(summary),
        Err(e) => SeedOutcome::Failed(format!("{:#}", e)),
    }
}

/// Seeds one resolved lesson from an already-validated bank.
pub async fn seed_lesson(
    pool: &SqlitePool,
    lesson: &Lesson,
    bank: &ContentBank,
    opts: &SeedOptions,
) -> anyhow::Result<SeedSummary> {
    println!("Seeding lesson {}...", lesson.label());

    let mut summary = SeedSummary::default();

    if opts.atomic {
        let mut tx = pool
            .begin()
            .await
            .context("Failed to open seeding transaction")?;
        if opts.delete_existing {
            summary.deleted = db::delete_lesson_exercises(&mut *tx, lesson.id).await?;
        }
        seed_into(&mut *tx, lesson, bank, opts, &mut summary).await?;
        tx.commit().await.context("Failed to commit seeded content")?;
    } else {
        let mut conn = pool
            .acquire()
            .await
            .context("Failed to acquire a database connection")?;
        if opts.delete_existing {
            summary.deleted = db::delete_lesson_exercises(&mut *conn, lesson.id).await?;
        }
        seed_into(&mut *conn, lesson, bank, opts, &mut summary).await?;
    }

    Ok(summary)
}

/// Walks the bank and writes rows in parent -> child order, assigning
/// 1-indexed `order` values from declaration order.
async fn seed_into(
    conn: &mut SqliteConnection,
    lesson: &Lesson,
    bank: &ContentBank,
    opts: &SeedOptions,
    summary: &mut SeedSummary,
) -> anyhow::Result<()> {
    for (ei, entry) in bank.exercises.iter().enumerate() {
        let exercise_id =
            exercises::insert_exercise(conn, lesson.id, entry, (ei + 1) as i64, opts.created_by)
                .await?;
        debug!(
            "exercise {} -> id {} ({})",
            entry.title,
            exercise_id,
            entry.difficulty.as_str()
        );
        summary.exercises += 1;

        let mut exercise_points = 0i64;

        for (qi, question) in entry.questions.iter().enumerate() {
            let points = content_bank::resolve_points(entry.difficulty, question, opts.points)
                .with_context(|| format!("Question {} has no points value", qi + 1))?;
            exercise_points += points;

            let question_id =
                exercises::insert_question(conn, exercise_id, question, (qi + 1) as i64, points)
                    .await?;
            summary.questions += 1;

            if question.question_type.has_authored_choices() {
                for (ci, choice) in question.choices.iter().enumerate() {
                    exercises::insert_choice(
                        conn,
                        question_id,
                        &choice.text,
                        choice.text_arabic.as_deref(),
                        choice.is_correct,
                        (ci + 1) as i64,
                    )
                    .await?;
                    summary.choices += 1;
                }
            } else if question.question_type == QuestionType::TrueFalse {
                // Always the two fixed rows; correctness comes from the
                // stored answer key.
                let key = question.correct_answer.as_deref().unwrap_or_default();
                for (ci, (label, label_arabic)) in TRUE_FALSE_CHOICES.into_iter().enumerate() {
                    exercises::insert_choice(
                        conn,
                        question_id,
                        label,
                        Some(label_arabic),
                        label == key,
                        (ci + 1) as i64,
                    )
                    .await?;
                    summary.choices += 1;
                }
            }
        }

        let reward = rewards::reward_for(opts.rewards, entry.difficulty, exercise_points);
        reward.insert(conn, exercise_id).await?;
        summary.rewards += 1;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{insert_lesson, memory_pool};

    fn trophic_bank() -> ContentBank {
        serde_json::from_str(include_str!("../banks/biology_trophic_levels.json"))
            .expect("sample bank should parse")
    }

    fn opts() -> SeedOptions {
        SeedOptions {
            delete_existing: false,
            points: PointsPolicy::Difficulty,
            rewards: RewardPolicy::Simple,
            atomic: true,
            created_by: 1,
        }
    }

    #[tokio::test]
    async fn trophic_levels_scenario_creates_the_expected_rows() {
        let pool = memory_pool().await;
        insert_lesson(&pool, 100, "Trophic Levels", "biology", 8).await;

        let outcome = run(&pool, &LessonTarget::ById(100), &trophic_bank(), &opts()).await;
        let summary = match outcome {
            SeedOutcome::Seeded(summary) => summary,
            other => panic!("expected a seeded outcome, got {:?}", other),
        };
        assert_eq!(summary.exercises, 1);
        assert_eq!(summary.questions, 6);
        assert_eq!(summary.choices, 16);
        assert_eq!(summary.rewards, 1);

        let counts = db::lesson_content_counts(&pool, 100).await.unwrap();
        assert_eq!(counts, (1, 6, 16, 1));

        // Beginner difficulty: every question is worth 10 under the
        // difficulty policy, and the simple reward pays 5.
        let distinct_points: Vec<i64> =
            sqlx::query_scalar("SELECT DISTINCT points FROM questions")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(distinct_points, vec![10]);

        let completion_points: i64 =
            sqlx::query_scalar("SELECT completion_points FROM exercise_rewards")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(completion_points, 5);

        // Declaration order became the `order` columns.
        let question_orders: Vec<i64> =
            sqlx::query_scalar(r#"SELECT "order" FROM questions ORDER BY id ASC"#)
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(question_orders, vec![1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn true_false_questions_expand_to_two_rows_with_one_correct() {
        let pool = memory_pool().await;
        insert_lesson(&pool, 100, "Trophic Levels", "biology", 8).await;
        run(&pool, &LessonTarget::ById(100), &trophic_bank(), &opts()).await;

        let rows: Vec<(String, bool)> = sqlx::query_as(
            r#"
            SELECT c.text, c.is_correct FROM question_choices c
            JOIN questions q ON c.question_id = q.id
            WHERE q.question_type = 'true_false' AND q."order" = 2
            ORDER BY c."order" ASC
            "#,
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        // Question 2's answer key is "False".
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], ("True".to_string(), false));
        assert_eq!(rows[1], ("False".to_string(), true));

        // Every true/false question in the lesson got exactly one correct row.
        let per_question: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT SUM(c.is_correct) FROM question_choices c
            JOIN questions q ON c.question_id = q.id
            WHERE q.question_type = 'true_false'
            GROUP BY q.id
            "#,
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(per_question, vec![1, 1]);
    }

    #[tokio::test]
    async fn reseeding_with_reset_reaches_the_same_final_state() {
        let pool = memory_pool().await;
        insert_lesson(&pool, 100, "Trophic Levels", "biology", 8).await;
        let bank = trophic_bank();

        run(&pool, &LessonTarget::ById(100), &bank, &opts()).await;

        let reset_opts = SeedOptions {
            delete_existing: true,
            ..opts()
        };
        for _ in 0..2 {
            let outcome = run(&pool, &LessonTarget::ById(100), &bank, &reset_opts).await;
            match outcome {
                SeedOutcome::Seeded(summary) => assert_eq!(summary.deleted, 1),
                other => panic!("expected a seeded outcome, got {:?}", other),
            }
            let counts = db::lesson_content_counts(&pool, 100).await.unwrap();
            assert_eq!(counts, (1, 6, 16, 1));
        }
    }

    #[tokio::test]
    async fn reseeding_without_reset_duplicates_every_row() {
        let pool = memory_pool().await;
        insert_lesson(&pool, 100, "Trophic Levels", "biology", 8).await;
        let bank = trophic_bank();

        run(&pool, &LessonTarget::ById(100), &bank, &opts()).await;
        run(&pool, &LessonTarget::ById(100), &bank, &opts()).await;

        let counts = db::lesson_content_counts(&pool, 100).await.unwrap();
        assert_eq!(counts, (2, 12, 32, 2));
    }

    #[tokio::test]
    async fn a_missing_lesson_writes_nothing() {
        let pool = memory_pool().await;

        let outcome = run(&pool, &LessonTarget::ById(999999), &trophic_bank(), &opts()).await;
        match outcome {
            SeedOutcome::LessonNotFound(msg) => assert!(msg.contains("999999")),
            other => panic!("expected not-found, got {:?}", other),
        }

        let total: i64 = sqlx::query_scalar(
            "SELECT (SELECT COUNT(*) FROM exercises) + (SELECT COUNT(*) FROM questions)
                  + (SELECT COUNT(*) FROM question_choices) + (SELECT COUNT(*) FROM exercise_rewards)",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn invalid_content_is_rejected_before_any_write() {
        let pool = memory_pool().await;
        insert_lesson(&pool, 5, "Acids and Bases", "chemistry", 9).await;

        let bank: ContentBank = serde_json::from_str(
            r#"{
                "lesson_id": 5,
                "exercises": [{
                    "title": "Acids",
                    "difficulty": "beginner",
                    "questions": [{
                        "text": "Which is an acid?",
                        "question_type": "qcm_single",
                        "choices": [
                            {"text": "HCl", "is_correct": true},
                            {"text": "H2SO4", "is_correct": true}
                        ]
                    }]
                }]
            }"#,
        )
        .unwrap();

        let outcome = run(&pool, &LessonTarget::ById(5), &bank, &opts()).await;
        match outcome {
            SeedOutcome::InvalidContent(msg) => assert!(msg.contains("exactly one correct")),
            other => panic!("expected invalid-content, got {:?}", other),
        }

        let counts = db::lesson_content_counts(&pool, 5).await.unwrap();
        assert_eq!(counts, (0, 0, 0, 0));
    }

    #[tokio::test]
    async fn best_effort_policy_seeds_the_same_rows() {
        let pool = memory_pool().await;
        insert_lesson(&pool, 100, "Trophic Levels", "biology", 8).await;

        let best_effort = SeedOptions {
            atomic: false,
            ..opts()
        };
        let outcome = run(&pool, &LessonTarget::ById(100), &trophic_bank(), &best_effort).await;
        assert!(matches!(outcome, SeedOutcome::Seeded(_)));

        let counts = db::lesson_content_counts(&pool, 100).await.unwrap();
        assert_eq!(counts, (1, 6, 16, 1));
    }

    #[tokio::test]
    async fn literal_points_flow_into_questions_and_multiplier_rewards() {
        let pool = memory_pool().await;
        insert_lesson(&pool, 42, "Optics", "physics", 9).await;

        let bank: ContentBank = serde_json::from_str(
            r#"{
                "lesson_id": 42,
                "exercises": [{
                    "title": "Refraction",
                    "difficulty": "intermediate",
                    "questions": [
                        {
                            "text": "Light slows down in glass.",
                            "question_type": "true_false",
                            "correct_answer": "True",
                            "points": 7
                        },
                        {
                            "text": "State Snell's law.",
                            "question_type": "open_short",
                            "points": 13
                        }
                    ]
                }]
            }"#,
        )
        .unwrap();

        let literal_opts = SeedOptions {
            points: PointsPolicy::Literal,
            rewards: RewardPolicy::Multiplier,
            ..opts()
        };
        let outcome = run(&pool, &LessonTarget::ById(42), &bank, &literal_opts).await;
        assert!(matches!(outcome, SeedOutcome::Seeded(_)));

        let points: Vec<i64> =
            sqlx::query_scalar(r#"SELECT points FROM questions ORDER BY "order" ASC"#)
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(points, vec![7, 13]);

        // 7 + 13 = 20 exercise points: multiplier variant carries them over.
        let reward: (i64, i64, i64, f64) = sqlx::query_as(
            "SELECT completion_points, perfect_score_bonus, high_score_bonus,
                    difficulty_multiplier
             FROM exercise_rewards",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(reward, (20, 10, 6, 1.5));
    }

    #[tokio::test]
    async fn fuzzy_target_seeds_the_single_matching_lesson() {
        let pool = memory_pool().await;
        insert_lesson(&pool, 100, "Trophic Levels", "biology", 8).await;
        insert_lesson(&pool, 101, "Water Cycle", "geology", 8).await;

        let target = LessonTarget::ByTitle {
            fragments: vec!["Trophic".to_string()],
            grade: Some(8),
            cycle: None,
        };
        let outcome = run(&pool, &target, &trophic_bank(), &opts()).await;
        assert!(matches!(outcome, SeedOutcome::Seeded(_)));

        let counts = db::lesson_content_counts(&pool, 100).await.unwrap();
        assert_eq!(counts.0, 1);
        let other = db::lesson_content_counts(&pool, 101).await.unwrap();
        assert_eq!(other.0, 0);
    }
}
