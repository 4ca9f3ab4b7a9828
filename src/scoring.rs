// src/scoring.rs
//
// Pure grading logic. No I/O: the attempt ledger feeds it the question
// snapshot and the submitted pairings, and persists whatever comes back.

use std::collections::HashMap;

/// Option truth as needed for grading.
#[derive(Debug, Clone)]
pub struct GradableOption {
    pub id: i64,
    pub is_correct: bool,
}

/// Question snapshot as needed for grading.
#[derive(Debug, Clone)]
pub struct GradableQuestion {
    pub id: i64,
    pub points: f64,
    pub options: Vec<GradableOption>,
}

/// One graded answer, ready to be persisted by the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct GradedAnswer {
    pub question_id: i64,
    pub selected_option_id: Option<i64>,
    pub is_correct: bool,
    pub points_earned: f64,
}

/// Outcome of grading one submission.
#[derive(Debug, Clone)]
pub struct GradeSheet {
    pub earned_points: f64,
    pub total_points: f64,
    pub answers: Vec<GradedAnswer>,
}

impl GradeSheet {
    /// Percentage score. A zero-question quiz scores 0, not a division error.
    pub fn percentage(&self) -> f64 {
        if self.total_points > 0.0 {
            (self.earned_points / self.total_points) * 100.0
        } else {
            0.0
        }
    }

    pub fn correct_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_correct).count()
    }
}

/// Grades a submission against the quiz's question snapshot.
///
/// `submitted` maps question id to the selected option id. A missing entry is
/// an unanswered question (incorrect, zero points). A submitted option id that
/// does not belong to the question is treated the same way: the client-supplied
/// pairing is never trusted. Submitted ids for questions outside the quiz are
/// ignored entirely.
///
/// Each question contributes its full `points` weight or nothing; there is no
/// partial credit or negative marking.
pub fn grade(questions: &[GradableQuestion], submitted: &HashMap<i64, i64>) -> GradeSheet {
    let mut total_points = 0.0;
    let mut earned_points = 0.0;
    let mut answers = Vec::with_capacity(questions.len());

    for question in questions {
        total_points += question.points;

        let selected = submitted.get(&question.id).and_then(|option_id| {
            question.options.iter().find(|o| o.id == *option_id)
        });

        let (selected_option_id, is_correct) = match selected {
            Some(option) => (Some(option.id), option.is_correct),
            None => (None, false),
        };

        let points_earned = if is_correct { question.points } else { 0.0 };
        earned_points += points_earned;

        answers.push(GradedAnswer {
            question_id: question.id,
            selected_option_id,
            is_correct,
            points_earned,
        });
    }

    GradeSheet {
        earned_points,
        total_points,
        answers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: i64, points: f64, correct_option: i64, wrong_options: &[i64]) -> GradableQuestion {
        let mut options = vec![GradableOption {
            id: correct_option,
            is_correct: true,
        }];
        options.extend(wrong_options.iter().map(|&id| GradableOption {
            id,
            is_correct: false,
        }));
        GradableQuestion { id, points, options }
    }

    #[test]
    fn weighted_partial_score() {
        // Q1 worth 1 point answered correctly, Q2 worth 3 answered incorrectly:
        // 1 of 4 points earned, 25%.
        let questions = vec![
            question(1, 1.0, 11, &[12, 13]),
            question(2, 3.0, 21, &[22, 23]),
        ];
        let mut submitted = HashMap::new();
        submitted.insert(1, 11);
        submitted.insert(2, 22);

        let sheet = grade(&questions, &submitted);
        assert_eq!(sheet.earned_points, 1.0);
        assert_eq!(sheet.total_points, 4.0);
        assert_eq!(sheet.percentage(), 25.0);
        assert_eq!(sheet.correct_count(), 1);
    }

    #[test]
    fn perfect_score() {
        let questions = vec![
            question(1, 2.0, 11, &[12]),
            question(2, 2.0, 21, &[22]),
        ];
        let mut submitted = HashMap::new();
        submitted.insert(1, 11);
        submitted.insert(2, 21);

        let sheet = grade(&questions, &submitted);
        assert_eq!(sheet.percentage(), 100.0);
        assert_eq!(sheet.correct_count(), 2);
    }

    #[test]
    fn unanswered_question_scores_zero_without_error() {
        let questions = vec![question(1, 5.0, 11, &[12])];
        let submitted = HashMap::new();

        let sheet = grade(&questions, &submitted);
        assert_eq!(sheet.earned_points, 0.0);
        assert_eq!(sheet.percentage(), 0.0);
        assert_eq!(sheet.answers.len(), 1);
        assert_eq!(sheet.answers[0].selected_option_id, None);
        assert!(!sheet.answers[0].is_correct);
    }

    #[test]
    fn option_from_another_question_treated_as_unanswered() {
        let questions = vec![
            question(1, 1.0, 11, &[12]),
            question(2, 1.0, 21, &[22]),
        ];
        // Option 21 is correct for question 2, but paired with question 1.
        let mut submitted = HashMap::new();
        submitted.insert(1, 21);

        let sheet = grade(&questions, &submitted);
        assert_eq!(sheet.earned_points, 0.0);
        assert_eq!(sheet.answers[0].selected_option_id, None);
    }

    #[test]
    fn unknown_question_id_ignored() {
        let questions = vec![question(1, 1.0, 11, &[12])];
        let mut submitted = HashMap::new();
        submitted.insert(1, 11);
        submitted.insert(999, 11);

        let sheet = grade(&questions, &submitted);
        assert_eq!(sheet.answers.len(), 1);
        assert_eq!(sheet.percentage(), 100.0);
    }

    #[test]
    fn zero_question_quiz_scores_zero() {
        let sheet = grade(&[], &HashMap::new());
        assert_eq!(sheet.total_points, 0.0);
        assert_eq!(sheet.percentage(), 0.0);
        assert!(sheet.answers.is_empty());
    }

    #[test]
    fn one_answer_record_per_question() {
        let questions = vec![
            question(1, 1.0, 11, &[12]),
            question(2, 1.0, 21, &[22]),
            question(3, 1.0, 31, &[32]),
        ];
        let mut submitted = HashMap::new();
        submitted.insert(2, 21);

        let sheet = grade(&questions, &submitted);
        assert_eq!(sheet.answers.len(), 3);
        let ids: Vec<i64> = sheet.answers.iter().map(|a| a.question_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
