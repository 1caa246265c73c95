//! Dashboard page and its post-render fragment.

use maud::{Markup, html};

use campus_core::{LoadState, SessionState, Student, Theme};

use super::components::{login_control, major_tag, page_shell, theme_toggle};

/// Render the dashboard. `user_count` comes from the request-time source;
/// the recent-students card is a placeholder filled in by the browser.
pub fn render(site_name: &str, session: &SessionState, user_count: u64) -> Markup {
    let theme_tag = match session.theme {
        Theme::Dark => "tag tag-blue",
        Theme::Light => "tag tag-gold",
    };

    let body = html! {
        h1 { (site_name) }
        p class="lead" {
            "Welcome, " strong { (session.user_name) } ". "
            "Your settings follow you across every page of this session."
        }

        div class="grid" {
            section class="card" {
                h2 { "Application Settings" }
                div class="row" {
                    span { "Current Theme:" }
                    span {
                        span class=(theme_tag) { (session.theme.label()) }
                        " "
                        (theme_toggle(session.theme, "/"))
                    }
                }
                div class="row" {
                    span { "Status:" }
                    span {
                        @if session.is_logged_in {
                            span class="tag tag-green" { "Logged In" }
                        } @else {
                            span class="tag tag-red" { "Logged Out" }
                        }
                        " "
                        (login_control(session, "/"))
                    }
                }
            }

            section class="card" {
                h2 { "User and Filter Status" }
                div class="row" {
                    strong { "Username:" }
                    span class="tag tag-cyan" { (session.user_name) }
                }
                div class="row" {
                    strong { "Default Major Filter:" }
                    @match &session.selected_major {
                        Some(major) => span class="tag tag-volcano" { (major) },
                        None => span class="muted" { "Not set" },
                    }
                }
            }

            section class="card" {
                h2 { "Quick Actions" }
                a class="btn btn-block" href="/students" { "View Student List" }
                a class="btn btn-block" href="/api/session" { "Session Snapshot (JSON)" }
            }

            section class="card" {
                h2 { "Directory" }
                div class="row" {
                    span { "Registered students:" }
                    strong id="user-count" { (user_count) }
                }
                p class="muted" { "Counted when this page was requested." }
            }

            section class="card" {
                h2 { "Recent Students" }
                div data-fragment="/fragments/recent-students" {
                    p class="placeholder" { "Loading recent students…" }
                }
            }
        }
    };

    page_shell("Dashboard", site_name, session, "/", body)
}

/// Body of the recent-students card for each load state.
pub fn recent_students(state: &LoadState<Vec<Student>>) -> Markup {
    html! {
        @match state {
            LoadState::Loading => p class="placeholder" { "Loading recent students…" },
            LoadState::Failed(_) => p class="failed" { "Failed to load recent students." },
            LoadState::Ready(students) if students.is_empty() => {
                p class="muted" { "No students yet." }
            },
            LoadState::Ready(students) => ul {
                @for student in students {
                    li {
                        a href={ "/students/" (student.id) } { (student.full_name()) }
                        @if let Some(major) = &student.major {
                            " " (major_tag(major))
                        }
                    }
                }
            },
        }
    }
}
