//! Student detail, not-found, and simulated edit pages.

use chrono::{DateTime, Utc};
use maud::{Markup, html};

use campus_core::student::{FieldError, SimulatedAction};
use campus_core::{SessionState, Student, StudentEdit};

use super::components::{notice, page_shell};

/// Detail page for one student. `generated_at` is when the served copy of
/// the page was built.
pub fn detail(
    site_name: &str,
    session: &SessionState,
    student: &Student,
    action: Option<SimulatedAction>,
    generated_at: Option<DateTime<Utc>>,
) -> Markup {
    let path = format!("/students/{}", student.id);
    let name = student.full_name();

    let body = html! {
        @if let Some(action) = action {
            (notice(action.message()))
        }

        section class="card detail" {
            div class="row" {
                h2 { "Student Detail" }
                span {
                    a class="btn" href="/students" { "← Back" }
                    " "
                    a class="btn btn-primary" href={ (path) "/edit" } { "Edit" }
                    " "
                    form class="inline" method="post" action={ (path) "/delete" }
                        onsubmit="return confirm('Are you sure you want to delete this student?');" {
                        button class="btn btn-danger" type="submit" { "Delete" }
                    }
                }
            }
            h1 { (name) }
            p { strong { "Email: " } (student.email) }
            p { strong { "Phone: " } (student.phone) }
            p { strong { "Age: " } (student.age) }
            p { strong { "Address: " } (student.address_line()) }
            p { strong { "Company: " } (student.company) }
            p { strong { "University: " } (student.university) }
            @if let Some(at) = generated_at {
                p class="muted" {
                    "Page generated at " (at.format("%Y-%m-%d %H:%M:%S UTC"))
                }
            }
        }
    };

    page_shell(&name, site_name, session, &path, body)
}

/// Shown when the requested student does not exist (or the id is not a
/// number).
pub fn not_found(site_name: &str, session: &SessionState, requested: &str) -> Markup {
    let body = html! {
        section class="card" {
            p class="failed" { "Student not found. ID: " (requested) }
            p { a class="btn" href="/students" { "Back to List" } }
        }
    };

    page_shell("Student not found", site_name, session, "/students", body)
}

/// Simulated edit form. `errors` are shown next to their fields.
pub fn edit_form(
    site_name: &str,
    session: &SessionState,
    id: u32,
    form: &StudentEdit,
    errors: &[FieldError],
) -> Markup {
    let path = format!("/students/{id}");
    let fields: [(&str, &str, &str, &str); 10] = [
        ("first_name", "First Name", "text", &form.first_name),
        ("last_name", "Last Name", "text", &form.last_name),
        ("email", "Email", "email", &form.email),
        ("phone", "Phone", "text", &form.phone),
        ("age", "Age", "number", &form.age),
        ("university", "University", "text", &form.university),
        ("company", "Company Name", "text", &form.company),
        ("address", "Street Address", "text", &form.address),
        ("city", "City", "text", &form.city),
        ("postal_code", "Postal Code", "text", &form.postal_code),
    ];

    let body = html! {
        section class="card" {
            h2 { "Edit Student Details (Simulation)" }
            p class="muted" { "Changes are not saved anywhere." }
            form method="post" action={ (path) "/edit" } {
                div class="fields" {
                    @for (name, label, kind, value) in fields {
                        div class="field" {
                            label for=(name) { (label) }
                            input id=(name) name=(name) type=(kind) value=(value)
                                required[name == "first_name" || name == "last_name"];
                            @for error in errors.iter().filter(|e| e.field == name) {
                                div class="field-error" { (error.message) }
                            }
                        }
                    }
                }
                p {
                    a class="btn" href=(path) { "Cancel" }
                    " "
                    button class="btn btn-primary" type="submit" { "Save Changes (Simulate)" }
                }
            }
        }
    };

    page_shell("Edit student", site_name, session, &path, body)
}
