//! Repository tests for students, attendance, and notifications against a
//! real database.

use chrono::NaiveDate;
use sqlx::PgPool;
use schoolhub_core::attendance::{AttendanceMethod, AttendanceStatus};
use schoolhub_db::models::attendance::UpsertAttendance;
use schoolhub_db::models::class::{Class, CreateClass};
use schoolhub_db::models::notification::CreateNotification;
use schoolhub_db::models::school::CreateSchool;
use schoolhub_db::models::student::{CreateStudent, Student};
use schoolhub_db::models::user::{CreateUser, User};
use schoolhub_db::repositories::{
    AttendanceRepo, ClassRepo, NotificationRepo, RoleRepo, SchoolRepo, StudentRepo, UserRepo,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Fixture {
    school_id: i64,
    teacher: User,
    class: Class,
    students: Vec<Student>,
}

async fn create_user(pool: &PgPool, school_id: i64, username: &str, role: &str) -> User {
    let role_id = RoleRepo::find_id_by_name(pool, role)
        .await
        .unwrap()
        .expect("role is seeded by migrations");
    UserRepo::create(
        pool,
        &CreateUser {
            school_id,
            username: username.to_string(),
            email: format!("{username}@school.test"),
            full_name: username.to_string(),
            password_hash: "not-a-real-hash".to_string(),
            role_id,
        },
    )
    .await
    .unwrap()
}

async fn fixture(pool: &PgPool) -> Fixture {
    let school = SchoolRepo::create(pool, &CreateSchool { name: "Hillside".into() })
        .await
        .unwrap();
    let teacher = create_user(pool, school.id, "mrs_khan", "teacher").await;
    let class = ClassRepo::create(
        pool,
        &CreateClass {
            school_id: school.id,
            name: "Grade 5".into(),
            section: Some("A".into()),
            teacher_id: Some(teacher.id),
        },
    )
    .await
    .unwrap();

    let mut students = Vec::new();
    for (roll, first) in [("1", "Asha"), ("2", "Bilal"), ("3", "Chen")] {
        let student = StudentRepo::create(
            pool,
            &CreateStudent {
                school_id: school.id,
                class_id: class.id,
                roll_number: roll.into(),
                first_name: first.into(),
                last_name: "Test".into(),
                parent_email: None,
            },
        )
        .await
        .unwrap();
        students.push(student);
    }

    Fixture {
        school_id: school.id,
        teacher,
        class,
        students,
    }
}

fn row(fx: &Fixture, student_id: i64, date: NaiveDate, status: AttendanceStatus, confidence: Option<f64>) -> UpsertAttendance {
    UpsertAttendance {
        student_id,
        class_id: fx.class.id,
        teacher_id: Some(fx.teacher.id),
        date,
        status_id: status.id(),
        method_id: AttendanceMethod::for_confidence(confidence).id(),
        confidence,
        remarks: None,
    }
}

// ---------------------------------------------------------------------------
// Attendance
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn reconfirming_a_day_overwrites_the_row(pool: PgPool) {
    let fx = fixture(&pool).await;
    let date = NaiveDate::from_ymd_opt(2026, 1, 14).unwrap();
    let s1 = fx.students[0].id;

    let first = AttendanceRepo::upsert_many(&pool, &[row(&fx, s1, date, AttendanceStatus::Present, Some(0.91))])
        .await
        .unwrap();
    let second = AttendanceRepo::upsert_many(&pool, &[row(&fx, s1, date, AttendanceStatus::Absent, None)])
        .await
        .unwrap();

    assert_eq!(first[0].id, second[0].id, "upsert must keep a single row");
    let stored = AttendanceRepo::find_by_student_and_date(&pool, s1, date)
        .await
        .unwrap()
        .expect("row exists");
    assert_eq!(stored.status_id, AttendanceStatus::Absent.id());
    assert_eq!(stored.method_id, AttendanceMethod::Manual.id());
    assert_eq!(stored.confidence, None);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance WHERE student_id = $1")
        .bind(s1)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn batch_upsert_returns_rows_in_input_order(pool: PgPool) {
    let fx = fixture(&pool).await;
    let date = NaiveDate::from_ymd_opt(2026, 1, 14).unwrap();
    let rows = vec![
        row(&fx, fx.students[2].id, date, AttendanceStatus::Late, None),
        row(&fx, fx.students[0].id, date, AttendanceStatus::Present, Some(0.88)),
    ];

    let stored = AttendanceRepo::upsert_many(&pool, &rows).await.unwrap();

    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].student_id, fx.students[2].id);
    assert_eq!(stored[1].student_id, fx.students[0].id);
    assert_eq!(stored[1].method_id, AttendanceMethod::FaceRecognition.id());

    let listed = AttendanceRepo::list_by_class_and_date(&pool, fx.class.id, date)
        .await
        .unwrap();
    let rolls: Vec<&str> = listed.iter().map(|r| r.roll_number.as_str()).collect();
    assert_eq!(rolls, ["1", "3"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn student_history_is_bounded_by_the_range(pool: PgPool) {
    let fx = fixture(&pool).await;
    let s1 = fx.students[0].id;
    for day in [10, 12, 14] {
        let date = NaiveDate::from_ymd_opt(2026, 1, day).unwrap();
        AttendanceRepo::upsert(&pool, &row(&fx, s1, date, AttendanceStatus::Present, None))
            .await
            .unwrap();
    }

    let history = AttendanceRepo::list_by_student(
        &pool,
        s1,
        NaiveDate::from_ymd_opt(2026, 1, 11).unwrap(),
        NaiveDate::from_ymd_opt(2026, 1, 14).unwrap(),
    )
    .await
    .unwrap();

    let days: Vec<u32> = history.iter().map(|r| chrono::Datelike::day(&r.date)).collect();
    assert_eq!(days, [14, 12], "newest first, 10th excluded");
}

// ---------------------------------------------------------------------------
// Students
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn face_encoding_set_and_clear(pool: PgPool) {
    let fx = fixture(&pool).await;
    let s1 = fx.students[0].id;

    assert!(!StudentRepo::clear_face_encoding(&pool, s1).await.unwrap());

    assert!(StudentRepo::set_face_encoding(&pool, s1, &[1, 2, 3], "/tmp/ref.jpg")
        .await
        .unwrap());
    let student = StudentRepo::find_in_school(&pool, fx.school_id, s1)
        .await
        .unwrap()
        .unwrap();
    assert!(student.has_face_encoding);
    assert_eq!(student.reference_photo_path.as_deref(), Some("/tmp/ref.jpg"));
    assert!(student.face_registered_at.is_some());
    assert_eq!(
        StudentRepo::find_face_encoding(&pool, s1).await.unwrap(),
        Some(vec![1, 2, 3])
    );

    let records = StudentRepo::list_face_records(&pool, fx.class.id).await.unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records.iter().filter(|r| r.face_encoding.is_some()).count(), 1);

    assert!(StudentRepo::clear_face_encoding(&pool, s1).await.unwrap());
    let student = StudentRepo::find_in_school(&pool, fx.school_id, s1)
        .await
        .unwrap()
        .unwrap();
    assert!(!student.has_face_encoding);
    assert!(student.reference_photo_path.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn member_ids_are_scoped_to_the_class(pool: PgPool) {
    let fx = fixture(&pool).await;
    let other_class = ClassRepo::create(
        &pool,
        &CreateClass {
            school_id: fx.school_id,
            name: "Grade 6".into(),
            section: None,
            teacher_id: None,
        },
    )
    .await
    .unwrap();

    let requested = [fx.students[0].id, fx.students[1].id, 999_999];
    let members = StudentRepo::find_active_member_ids(&pool, fx.class.id, &requested)
        .await
        .unwrap();
    assert_eq!(members.len(), 2);
    assert!(!members.contains(&999_999));

    let none = StudentRepo::find_active_member_ids(&pool, other_class.id, &requested)
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn lookups_do_not_cross_schools(pool: PgPool) {
    let fx = fixture(&pool).await;
    let other = SchoolRepo::create(&pool, &CreateSchool { name: "Riverside".into() })
        .await
        .unwrap();

    assert!(StudentRepo::find_in_school(&pool, other.id, fx.students[0].id)
        .await
        .unwrap()
        .is_none());
    assert!(ClassRepo::find_in_school(&pool, other.id, fx.class.id)
        .await
        .unwrap()
        .is_none());
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn notifications_are_per_user_and_mark_read_is_idempotent(pool: PgPool) {
    let fx = fixture(&pool).await;
    let principal = create_user(&pool, fx.school_id, "principal", "principal").await;

    let id = NotificationRepo::create(
        &pool,
        &CreateNotification {
            user_id: fx.teacher.id,
            kind: "attendance.class_summary".into(),
            title: "Attendance recorded".into(),
            body: "1 present, 2 absent".into(),
            payload: serde_json::json!({ "present": 1 }),
        },
    )
    .await
    .unwrap();

    assert_eq!(NotificationRepo::count_unread(&pool, fx.teacher.id).await.unwrap(), 1);
    assert!(!NotificationRepo::mark_read(&pool, id, principal.id).await.unwrap());

    assert!(NotificationRepo::mark_read(&pool, id, fx.teacher.id).await.unwrap());
    assert!(NotificationRepo::mark_read(&pool, id, fx.teacher.id).await.unwrap());
    assert_eq!(NotificationRepo::count_unread(&pool, fx.teacher.id).await.unwrap(), 0);

    let unread = NotificationRepo::list_for_user(&pool, fx.teacher.id, true, 50, 0)
        .await
        .unwrap();
    assert!(unread.is_empty());
    let all = NotificationRepo::list_for_user(&pool, fx.teacher.id, false, 50, 0)
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].is_read);
    assert!(all[0].read_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn recipients_by_role_and_email(pool: PgPool) {
    let fx = fixture(&pool).await;
    let principal = create_user(&pool, fx.school_id, "principal", "principal").await;
    let parent = create_user(&pool, fx.school_id, "asha_parent", "parent").await;

    let principals = UserRepo::list_active_by_role(&pool, fx.school_id, "principal")
        .await
        .unwrap();
    assert_eq!(principals.len(), 1);
    assert_eq!(principals[0].id, principal.id);

    let found = UserRepo::find_active_by_email(&pool, fx.school_id, "parent", "ASHA_PARENT@school.test")
        .await
        .unwrap();
    assert_eq!(found.map(|r| r.id), Some(parent.id));

    let wrong_role = UserRepo::find_active_by_email(&pool, fx.school_id, "teacher", "asha_parent@school.test")
        .await
        .unwrap();
    assert!(wrong_role.is_none());
}
