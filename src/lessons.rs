#[derive(Debug, Clone, FromRow)]
pub struct Lesson {
    pub id: i64,
    pub title: String,
    pub title_arabic: Option<String>,
    pub subject: Option<String>,
    pub grade: Option<i64>,
    pub cycle: Option<String>,
}

impl Lesson {
    /// Human-readable label for progress output.
    pub fn label(&self) -> String {
        match self.grade {
            Some(grade) => format!("#{} {} (grade {})", self.id, self.title, grade),
            None => format!("#{} {}", self.id, self.title),
        }
    }
}

use sqlx::FromRow;
