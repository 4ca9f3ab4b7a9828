// src/reporter.rs
//
// Results and analytics. Read-only: selection and aggregation are pure
// functions over fetched rows, with thin query wrappers below them.

use std::collections::HashMap;

use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        attempt::{
            AttemptStatus, AttemptSummary, QuestionDifficulty, QuizAttempt, QuizStatistics,
            QuizStatisticsResponse, StudentResults,
        },
        quiz::{Question, Quiz},
    },
};

/// Picks the best completed attempt: highest score, ties broken by earliest
/// start time. Re-running this over the same rows yields the same pick.
pub fn best_attempt(attempts: &[QuizAttempt]) -> Option<&QuizAttempt> {
    attempts
        .iter()
        .filter(|a| a.status == AttemptStatus::Completed)
        .fold(None, |best: Option<&QuizAttempt>, candidate| match best {
            None => Some(candidate),
            Some(current) => {
                let cs = candidate.score.unwrap_or(0.0);
                let bs = current.score.unwrap_or(0.0);
                if cs > bs || (cs == bs && candidate.start_time < current.start_time) {
                    Some(candidate)
                } else {
                    Some(current)
                }
            }
        })
}

/// Attempts left before the ceiling; clamped at zero.
pub fn attempts_remaining(max_attempts: i32, completed_count: i64) -> i64 {
    (max_attempts as i64 - completed_count).max(0)
}

/// Aggregates over every attempt ever created for the quiz. Attempts that
/// never completed stay in the completion-rate denominator.
pub fn quiz_statistics(attempts: &[QuizAttempt]) -> QuizStatistics {
    let attempt_count = attempts.len() as i64;
    let completed: Vec<f64> = attempts
        .iter()
        .filter(|a| a.status == AttemptStatus::Completed)
        .map(|a| a.score.unwrap_or(0.0))
        .collect();
    let completed_count = completed.len() as i64;

    let average_score = if completed.is_empty() {
        0.0
    } else {
        completed.iter().sum::<f64>() / completed.len() as f64
    };
    let completion_rate = if attempt_count > 0 {
        completed_count as f64 / attempt_count as f64
    } else {
        0.0
    };

    QuizStatistics {
        average_score,
        completion_rate,
        attempt_count,
        completed_count,
    }
}

/// Per-question share of correct answers, in presentation order. `graded` is
/// (question_id, is_correct) for every answer belonging to a completed
/// attempt.
pub fn question_difficulty(
    questions: &[Question],
    graded: &[(i64, bool)],
) -> Vec<QuestionDifficulty> {
    let mut totals: HashMap<i64, (i64, i64)> = HashMap::new();
    for &(question_id, is_correct) in graded {
        let entry = totals.entry(question_id).or_insert((0, 0));
        entry.0 += 1;
        if is_correct {
            entry.1 += 1;
        }
    }

    questions
        .iter()
        .map(|q| {
            let (total, correct) = totals.get(&q.id).copied().unwrap_or((0, 0));
            QuestionDifficulty {
                question_id: q.id,
                text: q.text.clone(),
                total_answers: total,
                correct_answers: correct,
                correct_rate: if total > 0 {
                    correct as f64 / total as f64
                } else {
                    0.0
                },
            }
        })
        .collect()
}

/// Fetches every attempt of one student on one quiz, oldest first.
pub async fn student_attempts(
    pool: &PgPool,
    quiz_id: i64,
    student_id: i64,
) -> Result<Vec<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(
        "SELECT id, quiz_id, student_id, status, start_time, end_time, score
         FROM quiz_attempts
         WHERE quiz_id = $1 AND student_id = $2
         ORDER BY start_time",
    )
    .bind(quiz_id)
    .bind(student_id)
    .fetch_all(pool)
    .await
}

/// Best attempt plus attempts-used/remaining for one student.
pub async fn student_results(
    pool: &PgPool,
    quiz: &Quiz,
    student_id: i64,
) -> Result<StudentResults, AppError> {
    let attempts = student_attempts(pool, quiz.id, student_id).await?;
    let completed_count = attempts
        .iter()
        .filter(|a| a.status == AttemptStatus::Completed)
        .count() as i64;

    let best = best_attempt(&attempts);
    let passed = best
        .and_then(|a| a.score)
        .map(|s| s >= quiz.passing_score)
        .unwrap_or(false);

    Ok(StudentResults {
        quiz_id: quiz.id,
        best_attempt: best.map(AttemptSummary::from),
        attempts_used: completed_count,
        attempts_remaining: attempts_remaining(quiz.max_attempts, completed_count),
        passing_score: quiz.passing_score,
        passed,
    })
}

/// Instructor-facing aggregate metrics for one quiz.
pub async fn statistics(pool: &PgPool, quiz: &Quiz) -> Result<QuizStatisticsResponse, AppError> {
    let attempts = sqlx::query_as::<_, QuizAttempt>(
        "SELECT id, quiz_id, student_id, status, start_time, end_time, score
         FROM quiz_attempts
         WHERE quiz_id = $1",
    )
    .bind(quiz.id)
    .fetch_all(pool)
    .await?;

    let questions = crate::catalog::questions_ordered(pool, quiz.id).await?;

    let graded: Vec<(i64, bool)> = sqlx::query_as::<_, (i64, bool)>(
        "SELECT a.question_id, a.is_correct
         FROM answers a
         JOIN quiz_attempts t ON t.id = a.attempt_id
         WHERE t.quiz_id = $1 AND t.status = $2",
    )
    .bind(quiz.id)
    .bind(AttemptStatus::Completed)
    .fetch_all(pool)
    .await?;

    Ok(QuizStatisticsResponse {
        quiz_id: quiz.id,
        statistics: quiz_statistics(&attempts),
        question_difficulty: question_difficulty(&questions, &graded),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz::QuestionType;
    use chrono::{TimeZone, Utc};

    fn attempt(id: i64, status: AttemptStatus, score: Option<f64>, start_hour: u32) -> QuizAttempt {
        QuizAttempt {
            id,
            quiz_id: 1,
            student_id: 10,
            status,
            start_time: Utc.with_ymd_and_hms(2025, 6, 1, start_hour, 0, 0).unwrap(),
            end_time: None,
            score,
        }
    }

    #[test]
    fn best_attempt_prefers_highest_score() {
        let attempts = vec![
            attempt(1, AttemptStatus::Completed, Some(40.0), 9),
            attempt(2, AttemptStatus::Completed, Some(80.0), 10),
            attempt(3, AttemptStatus::Completed, Some(60.0), 11),
        ];
        assert_eq!(best_attempt(&attempts).map(|a| a.id), Some(2));
    }

    #[test]
    fn best_attempt_tie_breaks_by_earliest_start() {
        let attempts = vec![
            attempt(1, AttemptStatus::Completed, Some(75.0), 12),
            attempt(2, AttemptStatus::Completed, Some(75.0), 9),
        ];
        assert_eq!(best_attempt(&attempts).map(|a| a.id), Some(2));
    }

    #[test]
    fn best_attempt_ignores_non_completed() {
        let attempts = vec![
            attempt(1, AttemptStatus::InProgress, None, 9),
            attempt(2, AttemptStatus::Abandoned, None, 10),
        ];
        assert!(best_attempt(&attempts).is_none());
    }

    #[test]
    fn best_attempt_is_idempotent() {
        let attempts = vec![
            attempt(1, AttemptStatus::Completed, Some(50.0), 9),
            attempt(2, AttemptStatus::Completed, Some(90.0), 10),
        ];
        let first = best_attempt(&attempts).map(|a| a.id);
        let second = best_attempt(&attempts).map(|a| a.id);
        assert_eq!(first, second);
    }

    #[test]
    fn attempts_remaining_never_negative() {
        assert_eq!(attempts_remaining(3, 0), 3);
        assert_eq!(attempts_remaining(3, 2), 1);
        assert_eq!(attempts_remaining(3, 3), 0);
        assert_eq!(attempts_remaining(3, 5), 0);
    }

    #[test]
    fn statistics_counts_unfinished_in_denominator() {
        let attempts = vec![
            attempt(1, AttemptStatus::Completed, Some(80.0), 9),
            attempt(2, AttemptStatus::Completed, Some(60.0), 10),
            attempt(3, AttemptStatus::Abandoned, None, 11),
            attempt(4, AttemptStatus::Expired, None, 12),
        ];
        let stats = quiz_statistics(&attempts);
        assert_eq!(stats.attempt_count, 4);
        assert_eq!(stats.completed_count, 2);
        assert_eq!(stats.average_score, 70.0);
        assert_eq!(stats.completion_rate, 0.5);
    }

    #[test]
    fn statistics_of_empty_quiz_are_zero() {
        let stats = quiz_statistics(&[]);
        assert_eq!(stats.attempt_count, 0);
        assert_eq!(stats.average_score, 0.0);
        assert_eq!(stats.completion_rate, 0.0);
    }

    #[test]
    fn difficulty_per_question() {
        let questions = vec![
            Question {
                id: 1,
                quiz_id: 1,
                text: "Q1".to_string(),
                question_type: QuestionType::MultipleChoice,
                points: 1.0,
                position: 0,
            },
            Question {
                id: 2,
                quiz_id: 1,
                text: "Q2".to_string(),
                question_type: QuestionType::TrueFalse,
                points: 1.0,
                position: 1,
            },
        ];
        let graded = vec![(1, true), (1, true), (1, false), (2, false)];

        let difficulty = question_difficulty(&questions, &graded);
        assert_eq!(difficulty.len(), 2);
        assert_eq!(difficulty[0].total_answers, 3);
        assert_eq!(difficulty[0].correct_answers, 2);
        assert!((difficulty[0].correct_rate - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(difficulty[1].correct_rate, 0.0);
    }

    #[test]
    fn difficulty_handles_question_without_answers() {
        let questions = vec![Question {
            id: 1,
            quiz_id: 1,
            text: "Q1".to_string(),
            question_type: QuestionType::MultipleChoice,
            points: 1.0,
            position: 0,
        }];
        let difficulty = question_difficulty(&questions, &[]);
        assert_eq!(difficulty[0].total_answers, 0);
        assert_eq!(difficulty[0].correct_rate, 0.0);
    }
}
