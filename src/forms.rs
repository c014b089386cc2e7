//! Form schemas and validation.
//!
//! Raw form structs keep every field optional so a submission with missing
//! fields still deserializes and reaches validation, producing field-level
//! errors instead of a framework rejection. `validate()` returns either the
//! typed, parsed input or the full list of field errors for redisplay.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::models::Task;

/// Date format accepted by task forms (and `<input type="date">`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A validation failure tied to a single form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    fn required(field: &'static str) -> Self {
        Self::new(field, "This field is required")
    }
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

// ── Registration ─────────────────────────────────────────────────────────

/// Raw registration submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationForm {
    pub username: Option<String>,
    pub password: Option<String>,
    pub confirm: Option<String>,
}

/// A validated registration.
#[derive(Debug)]
pub struct Registration {
    pub username: String,
    pub password: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<Registration, Vec<FieldError>> {
        let mut errors = Vec::new();

        let username = trimmed(&self.username);
        if username.is_none() {
            errors.push(FieldError::required("username"));
        }
        // Passwords are taken verbatim; only presence is checked.
        let password = self.password.as_deref().filter(|p| !p.is_empty());
        if password.is_none() {
            errors.push(FieldError::required("password"));
        }
        let confirm = self.confirm.as_deref().filter(|p| !p.is_empty());
        if confirm.is_none() {
            errors.push(FieldError::required("confirm"));
        }
        if let (Some(password), Some(confirm)) = (password, confirm) {
            if password != confirm {
                errors.push(FieldError::new("confirm", "Passwords must match"));
            }
        }

        if errors.is_empty() {
            Ok(Registration {
                username: username.unwrap_or_default().to_string(),
                password: password.unwrap_or_default().to_string(),
            })
        } else {
            Err(errors)
        }
    }
}

// ── Login ────────────────────────────────────────────────────────────────

/// Raw login submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl LoginForm {
    /// Both fields, or `None` when either is missing or blank. Login never
    /// shows field errors; an incomplete submission gets the same redirect
    /// as bad credentials.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let username = trimmed(&self.username)?;
        let password = self.password.as_deref().filter(|p| !p.is_empty())?;
        Some((username, password))
    }
}

// ── Tasks ────────────────────────────────────────────────────────────────

/// Raw task submission (shared by create and edit).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskForm {
    pub text: Option<String>,
    pub date: Option<String>,
    /// Checkbox: present (any value) when checked, absent otherwise.
    pub done: Option<String>,
}

/// A validated task submission.
#[derive(Debug, PartialEq, Eq)]
pub struct TaskInput {
    pub text: String,
    pub deadline_date: NaiveDate,
    pub done: bool,
}

impl TaskForm {
    pub fn validate(&self) -> Result<TaskInput, Vec<FieldError>> {
        let mut errors = Vec::new();

        let text = trimmed(&self.text);
        if text.is_none() {
            errors.push(FieldError::required("text"));
        }

        let deadline_date = match trimmed(&self.date) {
            None => {
                errors.push(FieldError::required("date"));
                None
            }
            Some(raw) => match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
                Ok(d) => Some(d),
                Err(_) => {
                    errors.push(FieldError::new("date", "Not a valid date (YYYY-MM-DD)"));
                    None
                }
            },
        };

        match (text, deadline_date) {
            (Some(text), Some(deadline_date)) if errors.is_empty() => Ok(TaskInput {
                text: text.to_string(),
                deadline_date,
                done: self.done.is_some(),
            }),
            _ => Err(errors),
        }
    }

    /// Pre-populate an edit form from an existing task.
    pub fn from_task(task: &Task) -> Self {
        Self {
            text: Some(task.text.clone()),
            date: Some(task.deadline_date.format(DATE_FORMAT).to_string()),
            done: task.done.then(|| "on".to_string()),
        }
    }
}
