pub mod attendance;
pub mod auth;
pub mod face_recognition;
pub mod notification;

use schoolhub_core::error::CoreError;
use schoolhub_core::types::DbId;
use schoolhub_db::models::class::Class;
use schoolhub_db::models::student::Student;
use schoolhub_db::repositories::{ClassRepo, StudentRepo};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Load a class of the caller's school; other schools' classes are 404.
pub(crate) async fn class_in_school(
    state: &AppState,
    school_id: DbId,
    class_id: DbId,
) -> AppResult<Class> {
    ClassRepo::find_in_school(&state.pool, school_id, class_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Class",
            id: class_id,
        }))
}

/// Load a student of the caller's school; other schools' students are 404.
pub(crate) async fn student_in_school(
    state: &AppState,
    school_id: DbId,
    student_id: DbId,
) -> AppResult<Student> {
    StudentRepo::find_in_school(&state.pool, school_id, student_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Student",
            id: student_id,
        }))
}
