pub mod actor;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, put},
};

use crate::error::AppError;
use crate::models::{
    Attendance, Course, DropRequest, EnrollRequest, Enrollment, EnrollmentKind, NewSectionRequest,
    NewSpacetime, OverrideRequest, RecordAttendanceRequest, Section, SectionDetail, SectionsByDay,
    SpacetimeView, UpdateSectionRequest,
};
use crate::services::{
    AccessService, AttendanceService, EnrollmentService, OverrideService, SectionService,
};
use crate::state::AppState;

pub use actor::{ACTOR_HEADER, Actor};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/courses", get(list_courses))
        .route("/courses/{id}/sections", get(course_sections).post(create_section))
        .route("/sections", get(list_sections))
        .route("/sections/{id}", get(get_section).patch(update_section))
        .route("/sections/{id}/students", put(enroll))
        .route("/students/{id}/drop", patch(drop_student))
        .route(
            "/students/{id}/attendances",
            get(list_attendances).put(record_attendance),
        )
        .route("/spacetimes/{id}", put(modify_spacetime))
        .route("/spacetimes/{id}/override", put(upsert_override))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn list_courses(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<Course>>, AppError> {
    let courses = AccessService::from_state(&state)
        .visible_courses(&actor.user_id)
        .await?;
    Ok(Json(courses))
}

async fn course_sections(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<SectionsByDay>, AppError> {
    let sections = SectionService::new(&state)
        .sections_by_day(&actor.user_id, &id)
        .await?;
    Ok(Json(sections))
}

async fn create_section(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(req): Json<NewSectionRequest>,
) -> Result<(StatusCode, Json<SectionDetail>), AppError> {
    let section = SectionService::new(&state)
        .create_section(&actor.user_id, &id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(section)))
}

async fn list_sections(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<Section>>, AppError> {
    let sections = AccessService::from_state(&state)
        .visible_sections(&actor.user_id)
        .await?;
    Ok(Json(sections))
}

async fn get_section(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<SectionDetail>, AppError> {
    let section = SectionService::new(&state)
        .section_detail(&actor.user_id, &id)
        .await?;
    Ok(Json(section))
}

async fn update_section(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(req): Json<UpdateSectionRequest>,
) -> Result<(StatusCode, Json<Section>), AppError> {
    let section = SectionService::new(&state)
        .update_section(&actor.user_id, &id, req)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(section)))
}

async fn enroll(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(req): Json<EnrollRequest>,
) -> Result<(StatusCode, Json<Enrollment>), AppError> {
    let enrollment = EnrollmentService::new(&state)
        .enroll(&actor.user_id, &id, req.email.as_deref())
        .await?;
    let status = match enrollment.kind {
        EnrollmentKind::Created => StatusCode::CREATED,
        EnrollmentKind::Swapped => StatusCode::OK,
    };
    Ok((status, Json(enrollment)))
}

async fn drop_student(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(req): Json<DropRequest>,
) -> Result<StatusCode, AppError> {
    EnrollmentService::new(&state)
        .drop_student(&actor.user_id, &id, req.banned)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_attendances(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<Vec<Attendance>>, AppError> {
    let rows = AttendanceService::new(&state)
        .list(&actor.user_id, &id)
        .await?;
    Ok(Json(rows))
}

async fn record_attendance(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(req): Json<RecordAttendanceRequest>,
) -> Result<StatusCode, AppError> {
    let target = req.target()?;
    AttendanceService::new(&state)
        .record(&actor.user_id, &id, target, req.presence)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn modify_spacetime(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(req): Json<NewSpacetime>,
) -> Result<(StatusCode, Json<SpacetimeView>), AppError> {
    let view = SectionService::new(&state)
        .modify_spacetime(&actor.user_id, &id, req)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(view)))
}

async fn upsert_override(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(req): Json<OverrideRequest>,
) -> Result<(StatusCode, Json<SpacetimeView>), AppError> {
    let outcome = OverrideService::new(&state)
        .upsert(&actor.user_id, &id, req)
        .await?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::ACCEPTED
    };
    Ok((status, Json(outcome.spacetime)))
}
