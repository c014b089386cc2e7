//! Task handlers: dashboard bucketing, create, edit, delete.
//!
//! Every route here requires a session; anonymous requests are redirected to
//! the dashboard. Edit and delete additionally require ownership, enforced by
//! the owner-scoped lookups in [`crate::db::Database`] — a foreign task and a
//! nonexistent id produce the same redirect.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use chrono::{Local, NaiveDate};

use crate::forms::TaskForm;
use crate::models::Task;

use super::auth::CurrentUser;
use super::routes::AppState;
use super::{internal_error, views};

/// A user's tasks partitioned by deadline against a reference date.
#[derive(Debug, Default)]
pub struct TaskBuckets {
    /// Deadline strictly before today and not yet done with.
    pub overdue: Vec<Task>,
    /// Deadline is today.
    pub current: Vec<Task>,
    /// Deadline strictly after today.
    pub future: Vec<Task>,
}

/// Partition tasks by deadline. Input order (deadline ascending) is
/// preserved within each bucket.
pub fn bucket_by_deadline(tasks: Vec<Task>, today: NaiveDate) -> TaskBuckets {
    let mut buckets = TaskBuckets::default();
    for task in tasks {
        match task.deadline_date.cmp(&today) {
            std::cmp::Ordering::Less => buckets.overdue.push(task),
            std::cmp::Ordering::Equal => buckets.current.push(task),
            std::cmp::Ordering::Greater => buckets.future.push(task),
        }
    }
    buckets
}

/// GET /
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, (StatusCode, String)> {
    let Some(user) = user else {
        return Ok(views::landing_page().into_response());
    };
    let tasks = state
        .db
        .tasks_for_user(user.id)
        .await
        .map_err(internal_error)?;
    let buckets = bucket_by_deadline(tasks, Local::now().date_naive());
    Ok(views::dashboard_page(&user, &buckets).into_response())
}

/// GET /task
pub async fn new_task_form(CurrentUser(user): CurrentUser) -> Response {
    if user.is_none() {
        return Redirect::to("/").into_response();
    }
    views::task_page("New task", "/task", &TaskForm::default(), &[]).into_response()
}

/// POST /task
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<TaskForm>,
) -> Result<Response, (StatusCode, String)> {
    let Some(user) = user else {
        return Ok(Redirect::to("/").into_response());
    };
    match form.validate() {
        Ok(input) => {
            state
                .db
                .create_task(user.id, &input.text, input.deadline_date)
                .await
                .map_err(internal_error)?;
            tracing::debug!(user = %user.username, "task created");
            Ok(Redirect::to("/").into_response())
        }
        Err(errors) => Ok(views::task_page("New task", "/task", &form, &errors).into_response()),
    }
}

/// GET /edit/task/:id
pub async fn edit_task_form(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Response, (StatusCode, String)> {
    let Some(user) = user else {
        return Ok(Redirect::to("/").into_response());
    };
    let Some(task) = state
        .db
        .task_for_user(id, user.id)
        .await
        .map_err(internal_error)?
    else {
        return Ok(Redirect::to("/").into_response());
    };
    let form = TaskForm::from_task(&task);
    let action = format!("/edit/task/{}", task.id);
    Ok(views::task_page("Edit task", &action, &form, &[]).into_response())
}

/// POST /edit/task/:id
pub async fn edit_task(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Form(form): Form<TaskForm>,
) -> Result<Response, (StatusCode, String)> {
    let Some(user) = user else {
        return Ok(Redirect::to("/").into_response());
    };
    match form.validate() {
        Ok(input) => {
            let updated = state
                .db
                .update_task(id, user.id, &input.text, input.deadline_date, input.done)
                .await
                .map_err(internal_error)?;
            if !updated {
                tracing::debug!(user = %user.username, id, "edit of missing or foreign task");
            }
            Ok(Redirect::to("/").into_response())
        }
        Err(errors) => {
            // Re-render only for tasks the user actually owns.
            if state
                .db
                .task_for_user(id, user.id)
                .await
                .map_err(internal_error)?
                .is_none()
            {
                return Ok(Redirect::to("/").into_response());
            }
            let action = format!("/edit/task/{}", id);
            Ok(views::task_page("Edit task", &action, &form, &errors).into_response())
        }
    }
}

/// GET /delete/task/:id
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Response, (StatusCode, String)> {
    let Some(user) = user else {
        return Ok(Redirect::to("/").into_response());
    };
    let deleted = state
        .db
        .delete_task(id, user.id)
        .await
        .map_err(internal_error)?;
    if deleted {
        tracing::info!(user = %user.username, id, "task deleted");
    }
    Ok(Redirect::to("/").into_response())
}
