//! HTML views.
//!
//! The pages are small enough that a template engine would be overhead; each
//! view assembles a page from escaped fragments and returns `Html<String>`.
//! All user-supplied text passes through [`escape`].

use axum::response::Html;

use crate::forms::{FieldError, RegistrationForm, TaskForm, DATE_FORMAT};
use crate::models::{Task, User};

use super::tasks::TaskBuckets;

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>{} - TaskList</title>\n\
         </head>\n\
         <body>\n{}\n</body>\n\
         </html>\n",
        escape(title),
        body
    ))
}

fn errors_for(errors: &[FieldError], field: &str) -> String {
    errors
        .iter()
        .filter(|e| e.field == field)
        .map(|e| format!("<span class=\"error\">{}</span>", escape(&e.message)))
        .collect()
}

// ── Dashboard ────────────────────────────────────────────────────────────

/// Landing page for anonymous visitors.
pub fn landing_page() -> Html<String> {
    layout(
        "Welcome",
        "<h1>TaskList</h1>\n\
         <p>Keep track of what needs doing, and when.</p>\n\
         <p><a href=\"/login\">Log in</a> or <a href=\"/registration\">register</a>.</p>",
    )
}

fn task_row(task: &Task) -> String {
    let marker = if task.done { "&#10003; " } else { "" };
    format!(
        "<li>{}{} &mdash; {} \
         <a href=\"/edit/task/{}\">edit</a> \
         <a href=\"/delete/task/{}\">delete</a></li>\n",
        marker,
        escape(&task.text),
        task.deadline_date.format(DATE_FORMAT),
        task.id,
        task.id
    )
}

fn task_section(id: &str, heading: &str, tasks: &[Task]) -> String {
    let rows: String = tasks.iter().map(task_row).collect();
    format!(
        "<section id=\"{id}\">\n<h2>{heading}</h2>\n<ul>\n{rows}</ul>\n</section>\n"
    )
}

/// Dashboard with the three deadline buckets.
pub fn dashboard_page(user: &User, buckets: &TaskBuckets) -> Html<String> {
    let body = format!(
        "<h1>Tasks for {}</h1>\n\
         <p><a href=\"/task\">New task</a> | <a href=\"/logout\">Log out</a></p>\n\
         {}{}{}",
        escape(&user.username),
        task_section("overdue", "Unfinished", &buckets.overdue),
        task_section("current", "Today", &buckets.current),
        task_section("future", "Upcoming", &buckets.future),
    );
    layout("Dashboard", &body)
}

// ── Account forms ────────────────────────────────────────────────────────

pub fn login_page() -> Html<String> {
    layout(
        "Log in",
        "<h1>Log in</h1>\n\
         <form method=\"post\" action=\"/login\">\n\
         <label>Username <input type=\"text\" name=\"username\"></label><br>\n\
         <label>Password <input type=\"password\" name=\"password\"></label><br>\n\
         <button type=\"submit\">Log in</button>\n\
         </form>\n\
         <p>No account? <a href=\"/registration\">Register</a>.</p>",
    )
}

pub fn registration_page(form: &RegistrationForm, errors: &[FieldError]) -> Html<String> {
    let username = form.username.as_deref().unwrap_or("");
    // Password fields are never echoed back.
    let body = format!(
        "<h1>Register</h1>\n\
         <form method=\"post\" action=\"/registration\">\n\
         <label>Username <input type=\"text\" name=\"username\" value=\"{}\"></label>{}<br>\n\
         <label>New password <input type=\"password\" name=\"password\"></label>{}<br>\n\
         <label>Repeat password <input type=\"password\" name=\"confirm\"></label>{}<br>\n\
         <button type=\"submit\">Register</button>\n\
         </form>\n\
         <p>Already registered? <a href=\"/login\">Log in</a>.</p>",
        escape(username),
        errors_for(errors, "username"),
        errors_for(errors, "password"),
        errors_for(errors, "confirm"),
    );
    layout("Register", &body)
}

// ── Task form ────────────────────────────────────────────────────────────

/// Form for creating or editing a task; `action` is the POST target.
pub fn task_page(title: &str, action: &str, form: &TaskForm, errors: &[FieldError]) -> Html<String> {
    let text = form.text.as_deref().unwrap_or("");
    let date = form.date.as_deref().unwrap_or("");
    let checked = if form.done.is_some() { " checked" } else { "" };
    let body = format!(
        "<h1>{}</h1>\n\
         <form method=\"post\" action=\"{}\">\n\
         <label>Task <input type=\"text\" name=\"text\" value=\"{}\"></label>{}<br>\n\
         <label>Deadline <input type=\"date\" name=\"date\" value=\"{}\"></label>{}<br>\n\
         <label>Done <input type=\"checkbox\" name=\"done\"{}></label><br>\n\
         <button type=\"submit\">Save</button>\n\
         </form>\n\
         <p><a href=\"/\">Back to dashboard</a></p>",
        escape(title),
        escape(action),
        escape(text),
        errors_for(errors, "text"),
        escape(date),
        errors_for(errors, "date"),
        checked,
    );
    layout(title, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PasswordHash;

    #[test]
    fn escape_covers_html_metacharacters() {
        assert_eq!(
            escape(r#"<b a="1">&'x'</b>"#),
            "&lt;b a=&quot;1&quot;&gt;&amp;&#39;x&#39;&lt;/b&gt;"
        );
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn dashboard_escapes_task_text() {
        let user = User {
            id: 1,
            username: "alice".into(),
            password: PasswordHash::new("pw"),
        };
        let buckets = TaskBuckets {
            overdue: vec![Task {
                id: 1,
                user_id: 1,
                text: "<script>alert(1)</script>".into(),
                deadline_date: "2026-08-29".parse().unwrap(),
                done: false,
            }],
            ..Default::default()
        };
        let Html(page) = dashboard_page(&user, &buckets);
        assert!(!page.contains("<script>alert"));
        assert!(page.contains("&lt;script&gt;"));
    }

    #[test]
    fn task_form_preserves_submitted_values() {
        let form = TaskForm {
            text: Some("Buy milk".into()),
            date: Some("2026-08-30".into()),
            done: Some("on".into()),
        };
        let Html(page) = task_page("Edit task", "/edit/task/7", &form, &[]);
        assert!(page.contains("value=\"Buy milk\""));
        assert!(page.contains("value=\"2026-08-30\""));
        assert!(page.contains("checked"));
        assert!(page.contains("action=\"/edit/task/7\""));
    }

    #[test]
    fn registration_page_shows_field_errors() {
        let form = RegistrationForm {
            username: Some("alice".into()),
            password: Some("a".into()),
            confirm: Some("b".into()),
        };
        let errors = form.validate().unwrap_err();
        let Html(page) = registration_page(&form, &errors);
        assert!(page.contains("Passwords must match"));
        assert!(page.contains("value=\"alice\""));
    }
}
