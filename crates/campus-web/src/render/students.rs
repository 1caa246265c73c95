//! Student listing page.

use maud::{Markup, html};

use campus_core::student::{PAGE_SIZES, Pagination, SimulatedAction};
use campus_core::{Directory, SessionState};

use super::components::{major_tag, notice, page_shell};

/// What the listing was asked to show.
#[derive(Debug, Clone, Default)]
pub struct ListingView<'a> {
    pub search: Option<&'a str>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub notice: Option<SimulatedAction>,
}

/// Render the listing, filtered by the search term and the session's
/// selected major.
pub fn render(
    site_name: &str,
    session: &SessionState,
    directory: &Directory,
    view: &ListingView<'_>,
) -> Markup {
    let selected_major = session.selected_major.as_deref();
    let matches = directory.filter(view.search, selected_major);
    let pagination = Pagination::new(matches.len(), view.page, view.page_size);
    let visible = &matches[pagination.range()];
    let search = view.search.unwrap_or_default();

    let body = html! {
        h1 { "Student Directory" }
        p class="lead" {
            "Loaded when this page was requested. Use the filters below to find students."
        }

        @if let Some(action) = view.notice {
            (notice(action.message()))
        }

        div class="toolbar" {
            form method="get" action="/students" {
                input type="search" name="q" placeholder="Search name" value=(search);
                input type="hidden" name="size" value=(pagination.page_size);
                " "
                button class="btn" type="submit" { "Search" }
            }

            form method="post" action="/students/filter" {
                select name="major" aria-label="Major" {
                    option value="" selected[selected_major.is_none()] { "All majors" }
                    @for major in &directory.majors {
                        option value=(major) selected[selected_major == Some(major.as_str())] {
                            (major)
                        }
                    }
                }
                input type="hidden" name="return_to" value="/students";
                " "
                button class="btn" type="submit" { "Apply" }
            }
        }

        @if directory.students.is_empty() {
            p class="muted" { "No students available right now." }
        } @else if visible.is_empty() {
            p class="muted" { "No students match these filters." }
        } @else {
            table {
                thead {
                    tr {
                        th { "Name" }
                        th { "Email" }
                        th { "Age" }
                        th { "University" }
                        th { "Major" }
                    }
                }
                tbody {
                    @for student in visible {
                        tr {
                            td { a href={ "/students/" (student.id) } { (student.full_name()) } }
                            td { (student.email) }
                            td { (student.age) }
                            td { (student.university) }
                            td {
                                @if let Some(major) = &student.major {
                                    (major_tag(major))
                                }
                            }
                        }
                    }
                }
            }
        }

        (pager(&pagination, search))
    };

    page_shell("Students", site_name, session, "/students", body)
}

fn pager(pagination: &Pagination, search: &str) -> Markup {
    let page_link = |page: usize, label: &str| {
        html! {
            form class="inline" method="get" action="/students" {
                input type="hidden" name="q" value=(search);
                input type="hidden" name="size" value=(pagination.page_size);
                input type="hidden" name="page" value=(page);
                button class="btn" type="submit" { (label) }
            }
        }
    };

    html! {
        div class="pager" {
            @if pagination.has_prev() {
                (page_link(pagination.page - 1, "Previous"))
            }
            span class="muted" {
                "Page " (pagination.page) " of " (pagination.page_count())
                " (" (pagination.total) " students)"
            }
            @if pagination.has_next() {
                (page_link(pagination.page + 1, "Next"))
            }
            form class="inline" method="get" action="/students" {
                input type="hidden" name="q" value=(search);
                select name="size" aria-label="Page size" {
                    @for size in PAGE_SIZES {
                        option value=(size) selected[size == pagination.page_size] {
                            (size) " / page"
                        }
                    }
                }
                " "
                button class="btn" type="submit" { "Show" }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_core::{RemoteUser, Theme};

    fn directory(n: u32) -> Directory {
        let users = (1..=n)
            .map(|id| RemoteUser {
                id,
                first_name: format!("Student{id:02}"),
                last_name: "Test".to_string(),
                ..Default::default()
            })
            .collect();
        Directory::build(
            users,
            vec!["beauty".to_string(), "smartphones".to_string()],
        )
    }

    #[test]
    fn listing_paginates_with_default_size() {
        let session = SessionState::guest(Theme::Light);
        let page = render("Campus", &session, &directory(23), &ListingView::default())
            .into_string();
        assert!(page.contains("Student01 Test"));
        assert!(page.contains("Student10 Test"));
        assert!(!page.contains("Student11 Test"));
        assert!(page.contains("Page 1 of 3"));
    }

    #[test]
    fn listing_respects_selected_major() {
        let mut session = SessionState::guest(Theme::Light);
        session.selected_major = Some("smartphones".to_string());
        let page = render("Campus", &session, &directory(4), &ListingView::default())
            .into_string();
        // Odd ids get majors[1] = smartphones.
        assert!(page.contains("Student01 Test"));
        assert!(page.contains("Student03 Test"));
        assert!(!page.contains("Student02 Test"));
        assert!(page.contains(r#"<option value="smartphones" selected>"#));
    }

    #[test]
    fn listing_shows_notice_and_empty_states() {
        let session = SessionState::guest(Theme::Light);
        let view = ListingView {
            notice: Some(SimulatedAction::Deleted),
            ..Default::default()
        };
        let page = render("Campus", &session, &Directory::default(), &view).into_string();
        assert!(page.contains("Student deleted (simulated)."));
        assert!(page.contains("No students available right now."));

        let view = ListingView {
            search: Some("nobody"),
            ..Default::default()
        };
        let page = render("Campus", &session, &directory(3), &view).into_string();
        assert!(page.contains("No students match these filters."));
    }
}
