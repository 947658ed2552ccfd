/// The reward schedule applied to every exercise of a run. Three variants
/// exist in production content; a run picks exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RewardPolicy {
    /// Flat completion points with a small perfect-score bonus.
    Simple,
    /// Larger per-tier points, coins, and the extended attempt/XP fields.
    Tiered,
    /// Difficulty multiplier; points carried over from the exercise itself.
    Multiplier,
}

/// Derives the reward record for one exercise. Pure: the same policy,
/// difficulty, and exercise points always produce identical values.
/// `exercise_points` is the sum of the exercise's resolved question points
/// and only feeds the multiplier variant.
pub fn reward_for(
    policy: RewardPolicy,
    difficulty: Difficulty,
    exercise_points: i64,
) -> ExerciseReward {
    let zero = ExerciseReward {
        completion_points: 0,
        completion_coins: 0,
        perfect_score_bonus: 0,
        high_score_bonus: 0,
        difficulty_multiplier: 1.0,
        attempt_points: 0,
        improvement_bonus: 0,
        streak_bonus: 0,
        base_xp: 0,
        bonus_xp: 0,
    };

    match policy {
        RewardPolicy::Simple => {
            let completion_points = match difficulty {
                Difficulty::Beginner => 5,
                Difficulty::Intermediate => 10,
                Difficulty::Advanced => 15,
            };
            ExerciseReward {
                completion_points,
                perfect_score_bonus: completion_points + 5,
                ..zero
            }
        }
        RewardPolicy::Tiered => {
            let (completion_points, perfect_score_bonus) = match difficulty {
                Difficulty::Beginner => (30, 20),
                Difficulty::Intermediate => (50, 30),
                Difficulty::Advanced => (70, 50),
            };
            ExerciseReward {
                completion_points,
                completion_coins: 1,
                perfect_score_bonus,
                attempt_points: completion_points / 10,
                improvement_bonus: 5,
                streak_bonus: 5,
                base_xp: completion_points,
                bonus_xp: perfect_score_bonus,
                ..zero
            }
        }
        RewardPolicy::Multiplier => {
            let difficulty_multiplier = match difficulty {
                Difficulty::Beginner => 1.0,
                Difficulty::Intermediate => 1.5,
                Difficulty::Advanced => 2.0,
            };
            ExerciseReward {
                completion_points: exercise_points,
                perfect_score_bonus: exercise_points / 2,
                high_score_bonus: exercise_points / 3,
                difficulty_multiplier,
                ..zero
            }
        }
    }
}

use crate::exercises::{Difficulty, ExerciseReward};
