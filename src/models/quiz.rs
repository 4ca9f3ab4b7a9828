// src/models/quiz.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::{Validate, ValidationError};

/// Question type: single correct option out of many, or a true/false pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "question_type", rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "quiz_difficulty", rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,

    /// Owning room, if the quiz is scoped to one. Room membership itself is
    /// resolved by an external service; this is an opaque reference.
    pub room_id: Option<i64>,
    pub creator_id: i64,
    pub is_public: bool,
    pub is_active: bool,
    pub difficulty: Difficulty,

    /// Completed-attempt ceiling per student. Always >= 1 (DB CHECK).
    pub max_attempts: i32,
    pub time_limit_minutes: Option<i32>,

    /// Activity window: submissions outside `[start_datetime, end_datetime]`
    /// are rejected. Either bound may be open.
    pub start_datetime: Option<DateTime<Utc>>,
    pub end_datetime: Option<DateTime<Utc>>,

    pub shuffle_questions: bool,
    pub shuffle_options: bool,

    /// Passing threshold as a percentage.
    pub passing_score: f64,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,
    pub text: String,
    pub question_type: QuestionType,

    /// Weight of this question: contributes fully or not at all to the score.
    pub points: f64,

    /// Presentation and tie-break order, unique within the quiz.
    pub position: i32,
}

/// Represents the 'options' table in the database.
/// Internal representation only: `is_correct` never reaches the student-facing
/// read path (see [`PublicOption`]).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub is_correct: bool,
    pub position: i32,
}

/// DTO for sending an option to a student (excludes `is_correct`).
#[derive(Debug, Serialize)]
pub struct PublicOption {
    pub id: i64,
    pub text: String,
}

impl From<QuestionOption> for PublicOption {
    fn from(o: QuestionOption) -> Self {
        PublicOption {
            id: o.id,
            text: o.text,
        }
    }
}

/// DTO for sending a question with its options to a student.
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub points: f64,
    pub options: Vec<PublicOption>,
}

/// Student-facing quiz detail: metadata plus the (possibly shuffled) questions.
#[derive(Debug, Serialize)]
pub struct QuizView {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub difficulty: Difficulty,
    pub max_attempts: i32,
    pub time_limit_minutes: Option<i32>,
    pub start_datetime: Option<DateTime<Utc>>,
    pub end_datetime: Option<DateTime<Utc>>,
    pub passing_score: f64,
    pub is_active: bool,
    pub attempts_used: i64,
    pub attempts_remaining: i64,
    pub questions: Vec<PublicQuestion>,
}

/// DTO for creating a new quiz with nested questions and options.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub room_id: Option<i64>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub difficulty: Option<Difficulty>,
    #[validate(range(min = 1, max = 100))]
    pub max_attempts: i32,
    #[validate(range(min = 1))]
    pub time_limit_minutes: Option<i32>,
    pub start_datetime: Option<DateTime<Utc>>,
    pub end_datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub shuffle_questions: bool,
    #[serde(default)]
    pub shuffle_options: bool,
    #[validate(range(min = 0.0, max = 100.0))]
    pub passing_score: Option<f64>,
    #[validate(length(min = 1, max = 200), nested)]
    pub questions: Vec<CreateQuestionRequest>,
}

fn default_true() -> bool {
    true
}

/// DTO for a question inside [`CreateQuizRequest`].
#[derive(Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = validate_question_integrity))]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
    pub question_type: QuestionType,
    #[validate(range(min = 0.001))]
    pub points: f64,
    pub options: Vec<CreateOptionRequest>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateOptionRequest {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// Data-integrity rule for authored questions: every question carries at least
/// one option and exactly one correct option; true/false questions carry
/// exactly two options.
fn validate_question_integrity(q: &CreateQuestionRequest) -> Result<(), ValidationError> {
    if q.options.is_empty() {
        return Err(ValidationError::new("question_without_options"));
    }
    if q.options.len() > 20 {
        return Err(ValidationError::new("too_many_options"));
    }
    if q.question_type == QuestionType::TrueFalse && q.options.len() != 2 {
        return Err(ValidationError::new("true_false_requires_two_options"));
    }
    let correct = q.options.iter().filter(|o| o.is_correct).count();
    if correct != 1 {
        return Err(ValidationError::new("exactly_one_correct_option_required"));
    }
    for opt in &q.options {
        if opt.text.is_empty() || opt.text.len() > 500 {
            return Err(ValidationError::new("option_text_length"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(text: &str, is_correct: bool) -> CreateOptionRequest {
        CreateOptionRequest {
            text: text.to_string(),
            is_correct,
        }
    }

    fn question(question_type: QuestionType, options: Vec<CreateOptionRequest>) -> CreateQuestionRequest {
        CreateQuestionRequest {
            text: "What is the answer?".to_string(),
            question_type,
            points: 1.0,
            options,
        }
    }

    #[test]
    fn accepts_single_correct_option() {
        let q = question(
            QuestionType::MultipleChoice,
            vec![option("a", true), option("b", false), option("c", false)],
        );
        assert!(q.validate().is_ok());
    }

    #[test]
    fn rejects_question_without_correct_option() {
        let q = question(
            QuestionType::MultipleChoice,
            vec![option("a", false), option("b", false)],
        );
        assert!(q.validate().is_err());
    }

    #[test]
    fn rejects_question_with_two_correct_options() {
        let q = question(
            QuestionType::MultipleChoice,
            vec![option("a", true), option("b", true)],
        );
        assert!(q.validate().is_err());
    }

    #[test]
    fn rejects_true_false_with_three_options() {
        let q = question(
            QuestionType::TrueFalse,
            vec![option("true", true), option("false", false), option("maybe", false)],
        );
        assert!(q.validate().is_err());
    }

    #[test]
    fn rejects_question_without_options() {
        let q = question(QuestionType::MultipleChoice, vec![]);
        assert!(q.validate().is_err());
    }
}
