use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::services::access::Capability;

/// Why an actor was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// The object exists but lies outside the actor's visible set.
    Forbidden,
    Banned,
    NotPermitted(Capability),
    SelfAttendance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    AlreadyEnrolled,
    SectionFull,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Permission denied: {0:?}")]
    PermissionDenied(Denial),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Conflict: {0:?}")]
    Conflict(ConflictKind),

    #[error("Missing actor identity")]
    Unauthenticated,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error")]
    InternalServerError,
}

impl AppError {
    /// Stable machine-readable code for clients to branch on.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::PermissionDenied(Denial::Forbidden) => "forbidden",
            AppError::PermissionDenied(Denial::Banned) => "banned",
            AppError::PermissionDenied(Denial::NotPermitted(_)) => "not_permitted",
            AppError::PermissionDenied(Denial::SelfAttendance) => "self_attendance",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(ConflictKind::AlreadyEnrolled) => "already_enrolled",
            AppError::Conflict(ConflictKind::SectionFull) => "section_full",
            AppError::Unauthenticated => "unauthenticated",
            AppError::Database(_)
            | AppError::Migration(_)
            | AppError::Config(_)
            | AppError::InternalServerError => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::PermissionDenied(Denial::SelfAttendance) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(ConflictKind::AlreadyEnrolled) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(ConflictKind::SectionFull) => StatusCode::LOCKED,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Database(_)
            | AppError::Migration(_)
            | AppError::Config(_)
            | AppError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for failures the caller did not cause.
    pub fn is_internal(&self) -> bool {
        self.status() == StatusCode::INTERNAL_SERVER_ERROR
    }

    /// Maps a `(user, course)` uniqueness violation to a duplicate enrollment.
    pub(crate) fn from_enroll_insert(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(ConflictKind::AlreadyEnrolled)
            }
            _ => AppError::Database(err),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Database(e) => {
                error!("database error: {}", e);
                "Database error occurred".to_string()
            }
            AppError::Migration(e) => {
                error!("migration error: {}", e);
                "Internal server error".to_string()
            }
            AppError::Config(msg) => {
                error!("configuration error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::InternalServerError => "Internal server error".to_string(),
            AppError::Validation(msg) => msg.clone(),
            AppError::NotFound(entity) => format!("{} not found", entity),
            AppError::PermissionDenied(Denial::Banned) => {
                "You are banned from this course".to_string()
            }
            AppError::PermissionDenied(Denial::SelfAttendance) => {
                "Students cannot record their own attendance".to_string()
            }
            AppError::PermissionDenied(_) => "Forbidden".to_string(),
            AppError::Conflict(ConflictKind::AlreadyEnrolled) => {
                "Already enrolled in or mentoring this course".to_string()
            }
            AppError::Conflict(ConflictKind::SectionFull) => "Section is full".to_string(),
            AppError::Unauthenticated => "Missing X-User-Id header".to_string(),
        };

        let body = Json(ErrorResponse {
            error: self.code().to_string(),
            message,
        });

        (status, body).into_response()
    }
}
