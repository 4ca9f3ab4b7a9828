// src/handlers/quiz.rs
//
// HTTP adapters over the catalog, ledger, and reporter modules.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    catalog,
    error::AppError,
    ledger,
    models::{
        attempt::SubmitQuizRequest,
        quiz::{CreateQuizRequest, QuizView},
    },
    reporter,
    state::AppState,
    utils::jwt::Claims,
};

/// Creates a quiz with its nested questions and options.
///
/// Teacher/admin only. The per-question integrity rule (exactly one correct
/// option, true/false pairs) is enforced by request validation before any row
/// is written; the whole insert is transactional.
pub async fn create_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !claims.role.can_author_quizzes() {
        return Err(AppError::Forbidden(
            "Only instructors may create quizzes".to_string(),
        ));
    }
    req.validate()?;
    if let (Some(start), Some(end)) = (req.start_datetime, req.end_datetime) {
        if start >= end {
            return Err(AppError::Validation(
                "start_datetime must precede end_datetime".to_string(),
            ));
        }
    }
    let creator_id = claims.user_id()?;

    let mut tx = state.pool.begin().await?;

    let quiz_id: i64 = sqlx::query_scalar(
        "INSERT INTO quizzes (
            title, description, room_id, creator_id, is_public, is_active,
            difficulty, max_attempts, time_limit_minutes, start_datetime,
            end_datetime, shuffle_questions, shuffle_options, passing_score
         ) VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, 'medium'), $8, $9, $10, $11, $12, $13, COALESCE($14, 60))
         RETURNING id",
    )
    .bind(&req.title)
    .bind(&req.description)
    .bind(req.room_id)
    .bind(creator_id)
    .bind(req.is_public)
    .bind(req.is_active)
    .bind(req.difficulty)
    .bind(req.max_attempts)
    .bind(req.time_limit_minutes)
    .bind(req.start_datetime)
    .bind(req.end_datetime)
    .bind(req.shuffle_questions)
    .bind(req.shuffle_options)
    .bind(req.passing_score)
    .fetch_one(&mut *tx)
    .await?;

    let mut question_count = 0;
    for (position, question) in req.questions.iter().enumerate() {
        let question_id: i64 = sqlx::query_scalar(
            "INSERT INTO questions (quiz_id, text, question_type, points, position)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(quiz_id)
        .bind(&question.text)
        .bind(question.question_type)
        .bind(question.points)
        .bind(position as i32)
        .fetch_one(&mut *tx)
        .await?;

        let mut builder = sqlx::QueryBuilder::<sqlx::Postgres>::new(
            "INSERT INTO options (question_id, text, is_correct, position) ",
        );
        builder.push_values(question.options.iter().enumerate(), |mut row, (i, option)| {
            row.push_bind(question_id)
                .push_bind(&option.text)
                .push_bind(option.is_correct)
                .push_bind(i as i32);
        });
        builder.build().execute(&mut *tx).await?;

        question_count += 1;
    }

    tx.commit().await?;

    tracing::info!(quiz_id, creator_id, question_count, "Quiz created");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": quiz_id,
            "questions_count": question_count,
        })),
    ))
}

/// Student-facing quiz detail.
///
/// Options arrive without the correctness flag. When the quiz's shuffle flags
/// are set, question and option order is a deterministic permutation seeded by
/// (quiz, student, attempt ordinal): re-fetching within one attempt is stable,
/// the next attempt reshuffles.
pub async fn get_quiz_view(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = catalog::get_quiz(&state.pool, id).await?;
    let student_id = claims.user_id()?;

    let attempts_used = ledger::completed_attempts(&state.pool, id, student_id).await?;
    let questions = catalog::questions_ordered(&state.pool, id).await?;
    let options = catalog::options_for_quiz(&state.pool, id).await?;

    let seed = catalog::shuffle_seed(id, student_id, attempts_used);
    let public = catalog::public_questions(&quiz, questions, options, seed);

    Ok(Json(QuizView {
        id: quiz.id,
        title: quiz.title,
        description: quiz.description,
        difficulty: quiz.difficulty,
        max_attempts: quiz.max_attempts,
        time_limit_minutes: quiz.time_limit_minutes,
        start_datetime: quiz.start_datetime,
        end_datetime: quiz.end_datetime,
        passing_score: quiz.passing_score,
        is_active: quiz.is_active,
        attempts_used,
        attempts_remaining: reporter::attempts_remaining(quiz.max_attempts, attempts_used),
        questions: public,
    }))
}

/// Submits a student's answers for grading.
///
/// Rejections carry stable reason codes: `quiz_unavailable` when the quiz is
/// inactive or outside its activity window, `max_attempts_reached` when the
/// completed-attempt ceiling is hit.
pub async fn submit_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !claims.role.can_submit_attempts() {
        return Err(AppError::Forbidden(
            "Only students may submit quiz attempts".to_string(),
        ));
    }
    req.validate()?;
    let student_id = claims.user_id()?;

    let outcome = ledger::submit(
        &state.pool,
        state.notifier.as_ref(),
        id,
        student_id,
        &req.answers,
        Utc::now(),
    )
    .await?;

    Ok(Json(outcome))
}

/// The caller's best attempt plus attempts-used/remaining.
pub async fn student_results(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = catalog::get_quiz(&state.pool, id).await?;
    let student_id = claims.user_id()?;

    let results = reporter::student_results(&state.pool, &quiz, student_id).await?;
    Ok(Json(results))
}

/// Aggregate metrics for instructors: average score, completion rate, and
/// per-question difficulty. Restricted to the quiz owner or admins.
pub async fn quiz_statistics(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = catalog::get_quiz(&state.pool, id).await?;
    let is_owner = quiz.creator_id == claims.user_id()?;
    if !claims.role.can_view_statistics(is_owner) {
        return Err(AppError::Forbidden(
            "Only the quiz owner or admins may view statistics".to_string(),
        ));
    }

    let response = reporter::statistics(&state.pool, &quiz).await?;
    Ok(Json(response))
}
