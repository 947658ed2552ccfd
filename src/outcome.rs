/// Row counts produced by one seeding run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub exercises: u64,
    pub questions: u64,
    pub choices: u64,
    pub rewards: u64,
    /// Exercises removed by the reset step, if it ran.
    pub deleted: u64,
}

/// What a pipeline run came to. Callers map this to a process exit code so
/// orchestration tooling can tell "nothing to do" from "something broke".
#[derive(Debug)]
pub enum SeedOutcome {
    Seeded(SeedSummary),
    LessonNotFound(String),
    InvalidContent(String),
    Failed(String),
}

impl SeedOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            SeedOutcome::Seeded(_) => 0,
            SeedOutcome::Failed(_) => 1,
            SeedOutcome::LessonNotFound(_) => 2,
            SeedOutcome::InvalidContent(_) => 3,
        }
    }

    /// One human-readable success or error message; this is everything the
    /// operator sees.
    pub fn report(&self) {
        match self {
            SeedOutcome::Seeded(summary) => {
                if summary.deleted > 0 {
                    println!("Removed {} pre-existing exercises.", summary.deleted);
                }
                println!(
                    "Created {} exercises, {} questions, {} choices, {} rewards.",
                    summary.exercises, summary.questions, summary.choices, summary.rewards
                );
            }
            SeedOutcome::LessonNotFound(msg) => eprintln!("Error: {}", msg),
            SeedOutcome::InvalidContent(msg) => eprintln!("Error: invalid content: {}", msg),
            SeedOutcome::Failed(msg) => eprintln!("Error: seeding failed: {}", msg),
        }
    }
}
