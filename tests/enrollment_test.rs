mod common;

use common::{capture_logs, harness, slot, time};
use section_scheduler::db;
use section_scheduler::error::{AppError, ConflictKind, Denial};
use section_scheduler::models::{DayOfWeek, EnrollmentKind};
use section_scheduler::services::EnrollmentService;

#[tokio::test]
async fn concurrent_enrollment_never_exceeds_capacity() {
    let h = harness().await;
    let seeded = h.course("CS61A").await;
    let section = h
        .section(&seeded, "mentor@example.edu", 3, vec![slot(DayOfWeek::Tuesday, time(10, 0))])
        .await;

    let mut users = Vec::new();
    for i in 0..10 {
        users.push(h.user(&format!("student{}@example.edu", i)).await);
    }

    let mut handles = Vec::new();
    for user in users {
        let state = h.state.clone();
        let section_id = section.section.id.clone();
        handles.push(tokio::spawn(async move {
            EnrollmentService::new(&state)
                .enroll(&user.id, &section_id, None)
                .await
        }));
    }

    let mut enrolled = 0;
    let mut full = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            Ok(_) => enrolled += 1,
            Err(AppError::Conflict(ConflictKind::SectionFull)) => full += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(enrolled, 3);
    assert_eq!(full, 7);
    let count = db::students::active_student_count(&h.state.db, &section.section.id)
        .await
        .unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn enrolling_twice_is_rejected() {
    let h = harness().await;
    let seeded = h.course("CS61B").await;
    let first = h
        .section(&seeded, "m1@example.edu", 5, vec![slot(DayOfWeek::Monday, time(9, 0))])
        .await;
    let second = h
        .section(&seeded, "m2@example.edu", 5, vec![slot(DayOfWeek::Friday, time(9, 0))])
        .await;
    let alice = h.user("alice@example.edu").await;
    let service = EnrollmentService::new(&h.state);

    service.enroll(&alice.id, &first.section.id, None).await.unwrap();

    for section_id in [&first.section.id, &second.section.id] {
        let err = service.enroll(&alice.id, section_id, None).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(ConflictKind::AlreadyEnrolled)));
    }
}

#[tokio::test]
async fn re_enrolling_after_a_drop_swaps_the_same_record() {
    let h = harness().await;
    let seeded = h.course("EECS16A").await;
    let first = h
        .section(&seeded, "m1@example.edu", 5, vec![slot(DayOfWeek::Monday, time(9, 0))])
        .await;
    let second = h
        .section(&seeded, "m2@example.edu", 5, vec![slot(DayOfWeek::Wednesday, time(9, 0))])
        .await;
    let alice = h.user("alice@example.edu").await;
    let service = EnrollmentService::new(&h.state);

    let created = service.enroll(&alice.id, &first.section.id, None).await.unwrap();
    assert_eq!(created.kind, EnrollmentKind::Created);

    let dropped = service
        .drop_student(&alice.id, &created.student.id, false)
        .await
        .unwrap();
    assert!(!dropped.active);

    let swapped = service.enroll(&alice.id, &second.section.id, None).await.unwrap();
    assert_eq!(swapped.kind, EnrollmentKind::Swapped);
    assert_eq!(swapped.student.id, created.student.id);
    assert_eq!(swapped.student.section_id.as_deref(), Some(second.section.id.as_str()));
    assert_eq!(
        db::students::active_student_count(&h.state.db, &first.section.id).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn freed_seat_goes_to_the_next_student() {
    let h = harness().await;
    let seeded = h.course("DATA8").await;
    let section = h
        .section(&seeded, "mentor@example.edu", 1, vec![slot(DayOfWeek::Thursday, time(14, 0))])
        .await;
    let a = h.user("a@example.edu").await;
    let b = h.user("b@example.edu").await;
    let service = EnrollmentService::new(&h.state);

    let held = service.enroll(&a.id, &section.section.id, None).await.unwrap();
    let err = service.enroll(&b.id, &section.section.id, None).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(ConflictKind::SectionFull)));

    service.drop_student(&a.id, &held.student.id, false).await.unwrap();
    let taken = service.enroll(&b.id, &section.section.id, None).await.unwrap();
    assert_eq!(taken.kind, EnrollmentKind::Created);
}

#[tokio::test]
async fn banned_student_cannot_enroll_anywhere_in_the_course() {
    let h = harness().await;
    let seeded = h.course("CS70").await;
    let first = h
        .section(&seeded, "m1@example.edu", 5, vec![slot(DayOfWeek::Monday, time(9, 0))])
        .await;
    let second = h
        .section(&seeded, "m2@example.edu", 5, vec![slot(DayOfWeek::Tuesday, time(9, 0))])
        .await;
    let eve = h.user("eve@example.edu").await;
    let service = EnrollmentService::new(&h.state);

    let enrolled = service.enroll(&eve.id, &first.section.id, None).await.unwrap();
    let dropped = service
        .drop_student(&seeded.coordinator, &enrolled.student.id, true)
        .await
        .unwrap();
    assert!(dropped.banned);

    let err = service.enroll(&eve.id, &second.section.id, None).await.unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied(Denial::Banned)));
}

#[tokio::test]
async fn self_drop_ignores_the_ban_flag() {
    let h = harness().await;
    let seeded = h.course("CS61C").await;
    let section = h
        .section(&seeded, "m1@example.edu", 5, vec![slot(DayOfWeek::Monday, time(9, 0))])
        .await;
    let bob = h.user("bob@example.edu").await;
    let service = EnrollmentService::new(&h.state);

    let enrolled = service.enroll(&bob.id, &section.section.id, None).await.unwrap();
    let dropped = service.drop_student(&bob.id, &enrolled.student.id, true).await.unwrap();
    assert!(!dropped.banned);

    let again = service.enroll(&bob.id, &section.section.id, None).await.unwrap();
    assert_eq!(again.kind, EnrollmentKind::Swapped);
}

#[tokio::test]
async fn mentors_cannot_drop_or_enroll_as_students() {
    let h = harness().await;
    let seeded = h.course("CS162").await;
    let first = h
        .section(&seeded, "m1@example.edu", 5, vec![slot(DayOfWeek::Monday, time(9, 0))])
        .await;
    let second = h
        .section(&seeded, "m2@example.edu", 5, vec![slot(DayOfWeek::Tuesday, time(9, 0))])
        .await;
    let mentor = h.user_by_email("m1@example.edu").await;
    let carol = h.user("carol@example.edu").await;
    let service = EnrollmentService::new(&h.state);

    let enrolled = service.enroll(&carol.id, &first.section.id, None).await.unwrap();
    let err = service
        .drop_student(&mentor.id, &enrolled.student.id, false)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::PermissionDenied(Denial::NotPermitted(_))
    ));

    let err = service.enroll(&mentor.id, &second.section.id, None).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(ConflictKind::AlreadyEnrolled)));
}

#[tokio::test]
async fn coordinator_enrolls_by_email() {
    let h = harness().await;
    let seeded = h.course("CS188").await;
    let section = h
        .section(&seeded, "m1@example.edu", 5, vec![slot(DayOfWeek::Monday, time(9, 0))])
        .await;
    let service = EnrollmentService::new(&h.state);

    let err = service
        .enroll(&seeded.coordinator, &section.section.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let enrollment = service
        .enroll(&seeded.coordinator, &section.section.id, Some("new@example.edu"))
        .await
        .unwrap();
    let user = h.user_by_email("new@example.edu").await;
    assert_eq!(enrollment.student.user_id, user.id);
    assert_eq!(enrollment.kind, EnrollmentKind::Created);
}

#[tokio::test]
async fn failed_enrollment_leaves_no_partial_writes() {
    let h = harness().await;
    let seeded = h.course("CS168").await;
    let section = h
        .section(&seeded, "mentor@example.edu", 1, vec![slot(DayOfWeek::Monday, time(9, 0))])
        .await;
    let first = h.user("first@example.edu").await;
    let service = EnrollmentService::new(&h.state);
    service.enroll(&first.id, &section.section.id, None).await.unwrap();

    let err = service
        .enroll(&seeded.coordinator, &section.section.id, Some("ghost@example.edu"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(ConflictKind::SectionFull)));

    let ghost = db::users::find_user_by_email(&h.state.db, "ghost@example.edu")
        .await
        .unwrap();
    assert!(ghost.is_none());
}

#[tokio::test]
async fn dropping_an_inactive_record_is_refused() {
    let h = harness().await;
    let seeded = h.course("CS169").await;
    let section = h
        .section(&seeded, "mentor@example.edu", 3, vec![slot(DayOfWeek::Monday, time(9, 0))])
        .await;
    let dana = h.user("dana@example.edu").await;
    let service = EnrollmentService::new(&h.state);

    let enrolled = service.enroll(&dana.id, &section.section.id, None).await.unwrap();
    service.drop_student(&dana.id, &enrolled.student.id, false).await.unwrap();

    let err = service
        .drop_student(&dana.id, &enrolled.student.id, false)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied(Denial::Forbidden)));
}

#[tokio::test]
async fn failed_drop_is_logged_with_the_student() {
    let h = harness().await;
    let seeded = h.course("CS184").await;
    let section = h
        .section(&seeded, "mentor@example.edu", 3, vec![slot(DayOfWeek::Monday, time(9, 0))])
        .await;
    let erin = h.user("erin@example.edu").await;
    let service = EnrollmentService::new(&h.state);
    let enrolled = service.enroll(&erin.id, &section.section.id, None).await.unwrap();

    sqlx::query(
        r#"
        CREATE TRIGGER freeze_students BEFORE UPDATE OF active ON students
        BEGIN
            SELECT RAISE(ABORT, 'students are frozen');
        END
        "#,
    )
    .execute(&h.state.db)
    .await
    .unwrap();

    let (logs, _guard) = capture_logs();
    let err = service
        .drop_student(&erin.id, &enrolled.student.id, false)
        .await
        .unwrap_err();
    assert!(err.is_internal());

    let out = logs.contents();
    assert!(out.contains("drop failed"));
    assert!(out.contains(&enrolled.student.id));
    assert!(out.contains(&seeded.course.id));

    let student = db::students::find_student(&h.state.db, &enrolled.student.id)
        .await
        .unwrap()
        .unwrap();
    assert!(student.active);
}
