// src/catalog.rs
//
// Read-only access to quiz definitions: quizzes, ordered questions, ordered
// options, the activity-window check, and the deterministic per-attempt
// shuffle. Nothing in here mutates state.

use chrono::{DateTime, Utc};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use sqlx::{PgExecutor, PgPool};

use crate::{
    error::AppError,
    models::quiz::{PublicOption, PublicQuestion, Question, QuestionOption, Quiz},
};

/// Fetches a quiz by id. Missing quizzes are reported, never defaulted.
pub async fn get_quiz(pool: &PgPool, id: i64) -> Result<Quiz, AppError> {
    sqlx::query_as::<_, Quiz>("SELECT * FROM quizzes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Quiz {} not found", id)))
}

/// Fetches the quiz's questions in stable presentation order.
/// Callable inside an open transaction so the ledger grades against a
/// consistent snapshot.
pub async fn questions_ordered(
    exec: impl PgExecutor<'_>,
    quiz_id: i64,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(
        "SELECT id, quiz_id, text, question_type, points, position
         FROM questions
         WHERE quiz_id = $1
         ORDER BY position",
    )
    .bind(quiz_id)
    .fetch_all(exec)
    .await
}

/// Fetches every option of every question of the quiz in one round trip,
/// ordered by (question, position). Internal read: correctness present.
pub async fn options_for_quiz(
    exec: impl PgExecutor<'_>,
    quiz_id: i64,
) -> Result<Vec<QuestionOption>, sqlx::Error> {
    sqlx::query_as::<_, QuestionOption>(
        "SELECT o.id, o.question_id, o.text, o.is_correct, o.position
         FROM options o
         JOIN questions q ON q.id = o.question_id
         WHERE q.quiz_id = $1
         ORDER BY o.question_id, o.position",
    )
    .bind(quiz_id)
    .fetch_all(exec)
    .await
}

/// True iff the quiz is active and `now` falls inside its activity window.
pub fn is_attemptable(quiz: &Quiz, now: DateTime<Utc>) -> bool {
    if !quiz.is_active {
        return false;
    }
    if let Some(start) = quiz.start_datetime {
        if now < start {
            return false;
        }
    }
    if let Some(end) = quiz.end_datetime {
        if now > end {
            return false;
        }
    }
    true
}

/// Seed for the per-attempt shuffle. Stable for a given (quiz, student,
/// attempt ordinal) so repeated fetches within one attempt see the same order,
/// while the next attempt gets a fresh permutation.
pub fn shuffle_seed(quiz_id: i64, student_id: i64, attempts_used: i64) -> u64 {
    (quiz_id as u64)
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (student_id as u64).rotate_left(17)
        ^ (attempts_used as u64).rotate_left(41)
}

/// Deterministic Fisher-Yates permutation of `items` under `seed`.
pub fn shuffled<T>(mut items: Vec<T>, seed: u64) -> Vec<T> {
    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);
    items
}

/// Builds the student-facing question list: correctness stripped, questions
/// and options shuffled per the quiz's flags under a per-attempt seed.
pub fn public_questions(
    quiz: &Quiz,
    questions: Vec<Question>,
    options: Vec<QuestionOption>,
    seed: u64,
) -> Vec<PublicQuestion> {
    let mut result: Vec<PublicQuestion> = questions
        .into_iter()
        .map(|q| {
            let own: Vec<PublicOption> = options
                .iter()
                .filter(|o| o.question_id == q.id)
                .cloned()
                .map(PublicOption::from)
                .collect();
            let own = if quiz.shuffle_options {
                // Offset by the question id so sibling questions with the same
                // option count do not share a permutation.
                shuffled(own, seed ^ q.id as u64)
            } else {
                own
            };
            PublicQuestion {
                id: q.id,
                text: q.text,
                question_type: q.question_type,
                points: q.points,
                options: own,
            }
        })
        .collect();

    if quiz.shuffle_questions {
        result = shuffled(result, seed);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz::Difficulty;
    use chrono::TimeZone;

    fn quiz(is_active: bool, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Quiz {
        Quiz {
            id: 1,
            title: "Sample".to_string(),
            description: None,
            room_id: None,
            creator_id: 7,
            is_public: true,
            is_active,
            difficulty: Difficulty::Medium,
            max_attempts: 3,
            time_limit_minutes: None,
            start_datetime: start,
            end_datetime: end,
            shuffle_questions: false,
            shuffle_options: false,
            passing_score: 60.0,
            created_at: None,
            updated_at: None,
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn inactive_quiz_not_attemptable() {
        assert!(!is_attemptable(&quiz(false, None, None), at(12)));
    }

    #[test]
    fn open_window_attemptable() {
        assert!(is_attemptable(&quiz(true, None, None), at(12)));
    }

    #[test]
    fn before_start_not_attemptable() {
        let q = quiz(true, Some(at(13)), None);
        assert!(!is_attemptable(&q, at(12)));
        assert!(is_attemptable(&q, at(14)));
    }

    #[test]
    fn after_end_not_attemptable() {
        let q = quiz(true, None, Some(at(11)));
        assert!(!is_attemptable(&q, at(12)));
        assert!(is_attemptable(&q, at(10)));
    }

    #[test]
    fn bounds_are_inclusive() {
        let q = quiz(true, Some(at(10)), Some(at(12)));
        assert!(is_attemptable(&q, at(10)));
        assert!(is_attemptable(&q, at(12)));
    }

    #[test]
    fn shuffle_is_deterministic_per_seed() {
        let items: Vec<i64> = (0..32).collect();
        let a = shuffled(items.clone(), 42);
        let b = shuffled(items.clone(), 42);
        assert_eq!(a, b);

        let c = shuffled(items.clone(), 43);
        assert_ne!(a, c);

        let mut sorted = a.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, items);
    }

    #[test]
    fn seed_varies_attempt_to_attempt() {
        let first = shuffle_seed(10, 20, 0);
        let second = shuffle_seed(10, 20, 1);
        assert_ne!(first, second);
        assert_eq!(first, shuffle_seed(10, 20, 0));
    }
}
