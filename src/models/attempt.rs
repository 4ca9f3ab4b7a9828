// src/models/attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Lifecycle of a quiz attempt.
///
/// `in_progress -> completed` is the only transition the grading flow performs.
/// `abandoned` and `expired` are terminal states owned by an external sweep
/// job; nothing transitions out of a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "attempt_status", rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
    Abandoned,
    Expired,
}

/// Represents the 'quiz_attempts' table in the database.
/// One row per submission event; a student may hold several completed rows for
/// the same quiz, up to `max_attempts`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: i64,
    pub quiz_id: i64,
    pub student_id: i64,
    pub status: AttemptStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,

    /// Percentage score, set when the attempt reaches `completed`.
    pub score: Option<f64>,
}

/// Represents the 'answers' table in the database.
/// Immutable once the owning attempt is `completed`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Answer {
    pub id: i64,
    pub attempt_id: i64,
    pub question_id: i64,
    pub selected_option_id: Option<i64>,
    pub is_correct: bool,
    pub points_earned: f64,
}

/// One submitted (question, option) pairing. The pairing is never trusted:
/// grading re-checks that the option actually belongs to the question.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubmittedAnswer {
    pub question_id: i64,
    pub option_id: i64,
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitQuizRequest {
    /// Unanswered questions may simply be omitted; they score zero.
    #[validate(length(max = 500))]
    pub answers: Vec<SubmittedAnswer>,
}

/// Result of a graded submission, returned to the student.
#[derive(Debug, Serialize, Deserialize)]
pub struct AttemptOutcome {
    pub attempt_id: i64,
    /// Percentage score of this attempt.
    pub score: f64,
    pub questions_total: usize,
    pub questions_correct: usize,
    pub attempts_remaining: i64,
    pub passed: bool,
}

/// Condensed attempt for result listings.
#[derive(Debug, Serialize)]
pub struct AttemptSummary {
    pub id: i64,
    pub status: AttemptStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub score: Option<f64>,
}

impl From<&QuizAttempt> for AttemptSummary {
    fn from(a: &QuizAttempt) -> Self {
        AttemptSummary {
            id: a.id,
            status: a.status,
            start_time: a.start_time,
            end_time: a.end_time,
            score: a.score,
        }
    }
}

/// DTO for `GET /api/quizzes/{id}/student-results`.
#[derive(Debug, Serialize)]
pub struct StudentResults {
    pub quiz_id: i64,
    pub best_attempt: Option<AttemptSummary>,
    pub attempts_used: i64,
    pub attempts_remaining: i64,
    pub passing_score: f64,
    pub passed: bool,
}

/// Aggregate metrics for the instructor-facing statistics endpoint.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct QuizStatistics {
    /// Mean percentage score over completed attempts; 0 when none completed.
    pub average_score: f64,
    /// completed / total attempts ever created; 0 when no attempts exist.
    pub completion_rate: f64,
    pub attempt_count: i64,
    pub completed_count: i64,
}

/// Per-question difficulty: fraction of graded answers that were correct.
#[derive(Debug, Serialize, PartialEq)]
pub struct QuestionDifficulty {
    pub question_id: i64,
    pub text: String,
    pub total_answers: i64,
    pub correct_answers: i64,
    /// correct / total; 0 when the question has no graded answers yet.
    pub correct_rate: f64,
}

/// DTO for `GET /api/quizzes/{id}/statistics`.
#[derive(Debug, Serialize)]
pub struct QuizStatisticsResponse {
    pub quiz_id: i64,
    #[serde(flatten)]
    pub statistics: QuizStatistics,
    pub question_difficulty: Vec<QuestionDifficulty>,
}
