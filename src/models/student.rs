use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Enrollment record of a user in one course. Reused across drop and re-enroll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub section_id: Option<String>,
    pub active: bool,
    pub banned: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrollRequest {
    /// Required when a coordinator enrolls someone else.
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DropRequest {
    #[serde(default)]
    pub banned: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentKind {
    Created,
    Swapped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub kind: EnrollmentKind,
    pub student: Student,
}
