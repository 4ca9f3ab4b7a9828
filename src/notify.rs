// src/notify.rs

use async_trait::async_trait;

/// Payload handed to the notification service after a graded submission.
#[derive(Debug, Clone)]
pub struct QuizCompleted {
    pub quiz_id: i64,
    pub quiz_title: String,
    pub student_id: i64,
    pub attempt_id: i64,
    pub score: f64,
    pub passed: bool,
}

/// Fire-and-forget notification seam. The ledger calls this after the grading
/// transaction commits; a failure is logged and never rolls back grading.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn quiz_completed(
        &self,
        event: QuizCompleted,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Default notifier: records the completion in the log stream. A deployment
/// wanting real delivery swaps this for a client of the notification service.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn quiz_completed(
        &self,
        event: QuizCompleted,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!(
            quiz_id = event.quiz_id,
            student_id = event.student_id,
            attempt_id = event.attempt_id,
            score = event.score,
            passed = event.passed,
            "Quiz completed: {}",
            event.quiz_title
        );
        Ok(())
    }
}
