#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use section_scheduler::clock::FixedClock;
use section_scheduler::db;
use section_scheduler::models::{
    Course, DayOfWeek, NewCourseRequest, NewSectionRequest, NewSpacetime, SectionDetail, User,
};
use section_scheduler::services::SectionService;
use section_scheduler::services::courses::{create_course, grant_coordinator};
use section_scheduler::state::AppState;
use sqlx::sqlite::SqliteConnectOptions;
use tempfile::TempDir;

/// Monday 2026-10-19, noon UTC.
pub fn monday_noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub struct Harness {
    pub state: AppState,
    pub clock: Arc<FixedClock>,
    _dir: TempDir,
}

/// A fresh file-backed database so every pooled connection sees the same data.
pub async fn harness() -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let options = SqliteConnectOptions::new()
        .filename(dir.path().join("scheduler.db"))
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(10));
    let pool = db::connect_with(options, 8).await.expect("connect");

    let clock = Arc::new(FixedClock::new(monday_noon()));
    let state = AppState::new(pool, clock.clone());
    Harness {
        state,
        clock,
        _dir: dir,
    }
}

pub struct Seeded {
    pub course: Course,
    pub coordinator: String,
}

impl Harness {
    /// Course open for enrollment on `monday_noon`, sections meeting from
    /// 2026-10-05 through 2026-12-11.
    pub async fn course(&self, name: &str) -> Seeded {
        let course = create_course(
            &self.state.db,
            NewCourseRequest {
                name: name.to_string(),
                title: format!("{} sections", name),
                enrollment_start: Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap(),
                enrollment_end: Utc.with_ymd_and_hms(2026, 11, 1, 0, 0, 0).unwrap(),
                section_start: date(2026, 10, 5),
                valid_until: date(2026, 12, 11),
                permitted_absences: 2,
            },
        )
        .await
        .expect("create course");

        let grant = grant_coordinator(
            &self.state.db,
            &course.id,
            &format!("coord-{}@example.edu", name.to_lowercase()),
        )
        .await
        .expect("grant coordinator");

        Seeded {
            course,
            coordinator: grant.user_id,
        }
    }

    pub async fn section(
        &self,
        seeded: &Seeded,
        mentor_email: &str,
        capacity: i64,
        slots: Vec<NewSpacetime>,
    ) -> SectionDetail {
        SectionService::new(&self.state)
            .create_section(
                &seeded.coordinator,
                &seeded.course.id,
                NewSectionRequest {
                    mentor_email: mentor_email.to_string(),
                    capacity,
                    description: String::new(),
                    spacetimes: slots,
                },
            )
            .await
            .expect("create section")
    }

    pub async fn user(&self, email: &str) -> User {
        db::users::insert_user(&self.state.db, email, "Test", "User")
            .await
            .expect("insert user")
    }

    pub async fn user_by_email(&self, email: &str) -> User {
        db::users::find_user_by_email(&self.state.db, email)
            .await
            .expect("query user")
            .expect("user exists")
    }
}

pub fn slot(day: DayOfWeek, start: NaiveTime) -> NewSpacetime {
    NewSpacetime {
        location: "Soda 310".to_string(),
        day_of_week: day,
        start_time: start,
        duration_minutes: 60,
    }
}

/// Buffer that collects formatted log lines written by a test subscriber.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Routes this thread's tracing output into the returned buffer until the
/// guard is dropped.
pub fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(move || writer.clone())
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (buffer, guard)
}
