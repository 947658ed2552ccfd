use crate::exercises::Difficulty;
use crate::lessons::Lesson;
use anyhow::Context;
use sqlx::{FromRow, SqliteConnection, SqlitePool};

/// How the seeding pipeline names the lesson it should act on.
#[derive(Debug, Clone)]
pub enum LessonTarget {
    ById(i64),
    /// Fuzzy variant: title substrings, optionally narrowed by grade/cycle.
    ByTitle {
        fragments: Vec<String>,
        grade: Option<i64>,
        cycle: Option<String>,
    },
}

/// Outcome of a lesson lookup. A miss carries the message the reporter
/// prints; the pipeline never guesses between ambiguous fuzzy matches.
#[derive(Debug)]
pub enum LessonLookup {
    Found(Lesson),
    NotFound(String),
}

pub async fn locate_lesson(pool: &SqlitePool, target: &LessonTarget) -> anyhow::Result<LessonLookup> {
    match target {
        LessonTarget::ById(id) => locate_lesson_by_id(pool, *id).await,
        LessonTarget::ByTitle {
            fragments,
            grade,
            cycle,
        } => locate_lesson_by_title(pool, fragments, *grade, cycle.as_deref()).await,
    }
}

/// Fetches a lesson by its exact id.
pub async fn locate_lesson_by_id(pool: &SqlitePool, lesson_id: i64) -> anyhow::Result<LessonLookup> {
    let lesson = sqlx::query_as::<_, Lesson>(
        "SELECT id, title, title_arabic, subject, grade, cycle FROM lessons WHERE id = ?",
    )
    .bind(lesson_id)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("Failed to fetch lesson {}", lesson_id))?;

    Ok(match lesson {
        Some(lesson) => LessonLookup::Found(lesson),
        None => LessonLookup::NotFound(format!("No lesson with id {}", lesson_id)),
    })
}

/// Fuzzy lookup by title substring(s), optionally narrowed by grade and
/// cycle. Succeeds only on exactly one match.
pub async fn locate_lesson_by_title(
    pool: &SqlitePool,
    fragments: &[String],
    grade: Option<i64>,
    cycle: Option<&str>,
) -> anyhow::Result<LessonLookup> {
    if fragments.is_empty() {
        return Ok(LessonLookup::NotFound(
            "No title fragments given for lesson lookup".to_string(),
        ));
    }

    // One (title LIKE ? OR title_arabic LIKE ?) group per fragment.
    let like_groups = fragments
        .iter()
        .map(|_| "(title LIKE ? OR title_arabic LIKE ?)")
        .collect::<Vec<_>>()
        .join(" OR ");

    let mut sql = format!(
        "SELECT id, title, title_arabic, subject, grade, cycle FROM lessons WHERE ({})",
        like_groups
    );
    if grade.is_some() {
        sql.push_str(" AND grade = ?");
    }
    if cycle.is_some() {
        sql.push_str(" AND cycle = ?");
    }
    sql.push_str(" ORDER BY id ASC");

    let mut query = sqlx::query_as::<_, Lesson>(&sql);
    for fragment in fragments {
        let pattern = format!("%{}%", fragment);
        query = query.bind(pattern.clone()).bind(pattern);
    }
    if let Some(grade) = grade {
        query = query.bind(grade);
    }
    if let Some(cycle) = cycle {
        query = query.bind(cycle.to_string());
    }

    let matches = query
        .fetch_all(pool)
        .await
        .context("Failed to search lessons by title")?;

    Ok(match matches.len() {
        1 => LessonLookup::Found(matches.into_iter().next().unwrap()),
        0 => LessonLookup::NotFound(format!(
            "No lesson matches title fragments {:?}",
            fragments
        )),
        n => LessonLookup::NotFound(format!(
            "{} lessons match title fragments {:?}; refusing to guess",
            n, fragments
        )),
    })
}

/// Deletes every exercise of a lesson. Questions, choices, and rewards go
/// with them via cascade. Returns the number of exercises removed.
pub async fn delete_lesson_exercises(
    conn: &mut SqliteConnection,
    lesson_id: i64,
) -> anyhow::Result<u64> {
    let result = sqlx::query("DELETE FROM exercises WHERE lesson_id = ?")
        .bind(lesson_id)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to delete existing exercises of lesson {}", lesson_id))?;

    Ok(result.rows_affected())
}

/// Row counts (exercises, questions, choices, rewards) for one lesson.
pub async fn lesson_content_counts(
    pool: &SqlitePool,
    lesson_id: i64,
) -> anyhow::Result<(i64, i64, i64, i64)> {
    let counts = sqlx::query_as::<_, (i64, i64, i64, i64)>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM exercises e WHERE e.lesson_id = ?),
            (SELECT COUNT(*) FROM questions q
                JOIN exercises e ON q.exercise_id = e.id WHERE e.lesson_id = ?),
            (SELECT COUNT(*) FROM question_choices c
                JOIN questions q ON c.question_id = q.id
                JOIN exercises e ON q.exercise_id = e.id WHERE e.lesson_id = ?),
            (SELECT COUNT(*) FROM exercise_rewards r
                JOIN exercises e ON r.exercise_id = e.id WHERE e.lesson_id = ?)
        "#,
    )
    .bind(lesson_id)
    .bind(lesson_id)
    .bind(lesson_id)
    .bind(lesson_id)
    .fetch_one(pool)
    .await
    .with_context(|| format!("Failed to count content of lesson {}", lesson_id))?;

    Ok(counts)
}

#[derive(Debug, FromRow)]
pub struct ExerciseReportRow {
    pub id: i64,
    pub title: String,
    pub difficulty_level: Difficulty,
    pub order: i64,
    pub question_count: i64,
    pub choice_count: i64,
    pub completion_points: i64,
}

/// Per-exercise breakdown of a lesson's seeded content, in seed order.
pub async fn exercise_report(
    pool: &SqlitePool,
    lesson_id: i64,
) -> anyhow::Result<Vec<ExerciseReportRow>> {
    let rows = sqlx::query_as::<_, ExerciseReportRow>(
        r#"
        SELECT
            e.id, e.title, e.difficulty_level, e."order",
            (SELECT COUNT(*) FROM questions q WHERE q.exercise_id = e.id) AS question_count,
            (SELECT COUNT(*) FROM question_choices c
                JOIN questions q ON c.question_id = q.id
                WHERE q.exercise_id = e.id) AS choice_count,
            COALESCE((SELECT r.completion_points FROM exercise_rewards r
                WHERE r.exercise_id = e.id), 0) AS completion_points
        FROM exercises e
        WHERE e.lesson_id = ?
        ORDER BY e."order" ASC
        "#,
    )
    .bind(lesson_id)
    .fetch_all(pool)
    .await
    .with_context(|| format!("Failed to build exercise report for lesson {}", lesson_id))?;

    Ok(rows)
}

/// Lessons in the id range that have no exercises yet, for the generator.
/// Optional subject/grade filters narrow the scan; `limit` caps the batch.
pub async fn lessons_missing_exercises(
    pool: &SqlitePool,
    start_id: i64,
    end_id: i64,
    subject: Option<&str>,
    grade: Option<i64>,
    limit: i64,
) -> anyhow::Result<Vec<Lesson>> {
    let mut sql = String::from(
        "SELECT l.id, l.title, l.title_arabic, l.subject, l.grade, l.cycle
         FROM lessons l
         LEFT JOIN exercises e ON e.lesson_id = l.id
         WHERE e.id IS NULL AND l.id BETWEEN ? AND ?",
    );
    if subject.is_some() {
        sql.push_str(" AND l.subject = ?");
    }
    if grade.is_some() {
        sql.push_str(" AND l.grade = ?");
    }
    sql.push_str(" GROUP BY l.id ORDER BY l.id ASC LIMIT ?");

    let mut query = sqlx::query_as::<_, Lesson>(&sql).bind(start_id).bind(end_id);
    if let Some(subject) = subject {
        query = query.bind(subject.to_string());
    }
    if let Some(grade) = grade {
        query = query.bind(grade);
    }
    query = query.bind(limit);

    let lessons = query
        .fetch_all(pool)
        .await
        .context("Failed to scan for lessons missing exercises")?;

    Ok(lessons)
}

#[cfg(test)]
pub mod testing {
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    /// One-connection in-memory pool with the real migrations applied.
    /// A single never-recycled connection keeps the database alive for the
    /// whole test.
    pub async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .expect("open in-memory database");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("run migrations");
        pool
    }

    pub async fn insert_lesson(
        pool: &SqlitePool,
        id: i64,
        title: &str,
        subject: &str,
        grade: i64,
    ) {
        sqlx::query(
            "INSERT INTO lessons (id, title, title_arabic, subject, grade, cycle)
             VALUES (?, ?, NULL, ?, ?, 'middle')",
        )
        .bind(id)
        .bind(title)
        .bind(subject)
        .bind(grade)
        .execute(pool)
        .await
        .expect("insert lesson");
    }
}
