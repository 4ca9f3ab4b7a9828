// src/ledger.rs
//
// The attempt ledger: creates attempt rows, enforces the completed-attempt
// ceiling, and drives the in_progress -> completed transition around the
// scoring engine. All writes for one submission happen in a single
// transaction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    catalog,
    error::AppError,
    models::attempt::{AttemptOutcome, AttemptStatus, SubmittedAnswer},
    notify::{Notifier, QuizCompleted},
    scoring::{self, GradableOption, GradableQuestion},
};

/// Advisory-lock key for one (quiz, student) pair. Submissions for the same
/// pair serialize on this key; different pairs run fully in parallel.
fn pair_lock_key(quiz_id: i64, student_id: i64) -> i64 {
    (quiz_id.wrapping_mul(0x51_7C_C1_B7_27_22_0A_95_u64 as i64)) ^ student_id.rotate_left(31)
}

/// Counts this student's completed attempts on the quiz.
pub async fn completed_attempts(
    exec: impl sqlx::PgExecutor<'_>,
    quiz_id: i64,
    student_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM quiz_attempts
         WHERE quiz_id = $1 AND student_id = $2 AND status = $3",
    )
    .bind(quiz_id)
    .bind(student_id)
    .bind(AttemptStatus::Completed)
    .fetch_one(exec)
    .await
}

/// Grades one submission end to end.
///
/// Single-step flow: the attempt is created `in_progress` and completed inside
/// the same transaction; there is no separate start call. Preconditions are
/// checked in order, short-circuiting on the first failure:
///
/// 1. the quiz exists and is attemptable at `now`;
/// 2. the student's completed-attempt count is below `max_attempts`.
///
/// The count check, attempt creation, answer persistence, and the `completed`
/// transition run under a per-(quiz, student) transaction-scoped advisory
/// lock, so two racing submissions cannot both pass the count check. Questions
/// and options are read inside the same transaction: the attempt grades
/// against the question set as it exists at submission time.
pub async fn submit(
    pool: &PgPool,
    notifier: &dyn Notifier,
    quiz_id: i64,
    student_id: i64,
    submitted: &[SubmittedAnswer],
    now: DateTime<Utc>,
) -> Result<AttemptOutcome, AppError> {
    let quiz = catalog::get_quiz(pool, quiz_id).await?;
    if !catalog::is_attemptable(&quiz, now) {
        return Err(AppError::QuizUnavailable);
    }

    let mut tx = pool.begin().await?;

    // Serialize the check-create-score-persist sequence per (quiz, student).
    // The lock is released automatically at commit/rollback.
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(pair_lock_key(quiz_id, student_id))
        .execute(&mut *tx)
        .await?;

    let used = completed_attempts(&mut *tx, quiz_id, student_id).await?;
    if used >= quiz.max_attempts as i64 {
        return Err(AppError::MaxAttemptsReached);
    }

    // Question/option snapshot for this attempt.
    let questions = catalog::questions_ordered(&mut *tx, quiz_id).await?;
    let options = catalog::options_for_quiz(&mut *tx, quiz_id).await?;

    let gradable: Vec<GradableQuestion> = questions
        .iter()
        .map(|q| GradableQuestion {
            id: q.id,
            points: q.points,
            options: options
                .iter()
                .filter(|o| o.question_id == q.id)
                .map(|o| GradableOption {
                    id: o.id,
                    is_correct: o.is_correct,
                })
                .collect(),
        })
        .collect();

    // Last write wins when the same question appears twice in the payload.
    let submitted_map: HashMap<i64, i64> = submitted
        .iter()
        .map(|a| (a.question_id, a.option_id))
        .collect();

    let sheet = scoring::grade(&gradable, &submitted_map);
    let score = sheet.percentage();

    let attempt_id: i64 = sqlx::query_scalar(
        "INSERT INTO quiz_attempts (quiz_id, student_id, status, start_time)
         VALUES ($1, $2, $3, $4)
         RETURNING id",
    )
    .bind(quiz_id)
    .bind(student_id)
    .bind(AttemptStatus::InProgress)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    if !sheet.answers.is_empty() {
        let mut builder = sqlx::QueryBuilder::<sqlx::Postgres>::new(
            "INSERT INTO answers (attempt_id, question_id, selected_option_id, is_correct, points_earned) ",
        );
        builder.push_values(&sheet.answers, |mut row, answer| {
            row.push_bind(attempt_id)
                .push_bind(answer.question_id)
                .push_bind(answer.selected_option_id)
                .push_bind(answer.is_correct)
                .push_bind(answer.points_earned);
        });
        builder.build().execute(&mut *tx).await?;
    }

    sqlx::query(
        "UPDATE quiz_attempts SET status = $1, end_time = $2, score = $3 WHERE id = $4",
    )
    .bind(AttemptStatus::Completed)
    .bind(now)
    .bind(score)
    .bind(attempt_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        quiz_id,
        student_id,
        attempt_id,
        score,
        "Attempt completed"
    );

    let passed = score >= quiz.passing_score;

    if let Err(e) = notifier
        .quiz_completed(QuizCompleted {
            quiz_id,
            quiz_title: quiz.title.clone(),
            student_id,
            attempt_id,
            score,
            passed,
        })
        .await
    {
        tracing::warn!("Completion notification failed: {}", e);
    }

    Ok(AttemptOutcome {
        attempt_id,
        score,
        questions_total: sheet.answers.len(),
        questions_correct: sheet.correct_count(),
        attempts_remaining: (quiz.max_attempts as i64 - used - 1).max(0),
        passed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_key_distinguishes_pairs() {
        let base = pair_lock_key(1, 1);
        assert_ne!(base, pair_lock_key(1, 2));
        assert_ne!(base, pair_lock_key(2, 1));
        // Swapping quiz and student must not collide.
        assert_ne!(pair_lock_key(3, 7), pair_lock_key(7, 3));
    }

    #[test]
    fn lock_key_is_stable() {
        assert_eq!(pair_lock_key(42, 99), pair_lock_key(42, 99));
    }
}
