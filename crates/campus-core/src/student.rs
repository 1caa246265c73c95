//! Student records, the directory listing, and the simulated edit form.
//!
//! Students are users of the demo API. Their "major" is one of the first
//! [`MAX_MAJORS`] product categories, picked by `id % majors.len()`.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::api::{DemoApi, RemoteUser};
use crate::error::Result;

/// How many category slugs are used as majors.
pub const MAX_MAJORS: usize = 5;

/// Page sizes offered by the listing.
pub const PAGE_SIZES: [usize; 3] = [5, 10, 20];

/// Page size used when none (or an unsupported one) is requested.
pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub postal_code: String,
}

/// A student as displayed by the dashboard. Read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Student {
    pub id: u32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub age: u32,
    pub address: Address,
    pub company: String,
    pub university: String,
    pub major: Option<String>,
}

impl Student {
    pub fn from_remote(user: RemoteUser, major: Option<String>) -> Self {
        let address = user
            .address
            .map(|a| Address {
                street: a.address,
                city: a.city,
                postal_code: a.postal_code,
            })
            .unwrap_or_default();

        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            phone: user.phone,
            age: user.age,
            address,
            company: user.company.map(|c| c.name).unwrap_or_default(),
            university: user.university,
            major,
        }
    }

    /// "First Last".
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// "street, city, postal code", skipping empty parts.
    pub fn address_line(&self) -> String {
        [
            self.address.street.as_str(),
            self.address.city.as_str(),
            self.address.postal_code.as_str(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

/// Keep the first [`MAX_MAJORS`] categories as majors.
pub fn usable_majors(categories: Vec<String>) -> Vec<String> {
    categories.into_iter().take(MAX_MAJORS).collect()
}

/// Major for a student id, or `None` when there are no majors.
pub fn assign_major(id: u32, majors: &[String]) -> Option<String> {
    if majors.is_empty() {
        return None;
    }
    majors.get(id as usize % majors.len()).cloned()
}

/// Tag colour for a major.
pub fn major_color(major: &str) -> &'static str {
    if major.contains("smartphones") {
        "blue"
    } else if major.contains("groceries") {
        "green"
    } else if major.contains("fragrances") {
        "gold"
    } else {
        "purple"
    }
}

/// The student listing: students with majors assigned, plus the majors
/// offered in the filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    pub students: Vec<Student>,
    pub majors: Vec<String>,
}

impl Directory {
    /// Assemble from API results.
    pub fn build(users: Vec<RemoteUser>, categories: Vec<String>) -> Self {
        let majors = usable_majors(categories);
        let students = users
            .into_iter()
            .map(|user| {
                let major = assign_major(user.id, &majors);
                Student::from_remote(user, major)
            })
            .collect();

        Self { students, majors }
    }

    /// Fetch the first `limit` users and the categories. Fails if either
    /// request fails.
    pub async fn fetch(api: &dyn DemoApi, limit: usize) -> Result<Self> {
        let (users, categories) = futures::try_join!(api.users(limit), api.categories())?;
        Ok(Self::build(users, categories))
    }

    /// Students whose name contains `search` (case-insensitive) and whose
    /// major equals `major`, sorted by name. Blank criteria match everything.
    pub fn filter(&self, search: Option<&str>, major: Option<&str>) -> Vec<&Student> {
        let needle = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        let major = major.filter(|m| !m.is_empty());

        let mut matches: Vec<&Student> = self
            .students
            .iter()
            .filter(|s| {
                needle
                    .as_ref()
                    .is_none_or(|n| s.full_name().to_lowercase().contains(n.as_str()))
            })
            .filter(|s| major.is_none_or(|m| s.major.as_deref() == Some(m)))
            .collect();

        matches.sort_by_key(|s| s.full_name());
        matches
    }
}

/// Position within a paginated listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
}

impl Pagination {
    /// Clamp the requested page into range and fall back to
    /// [`DEFAULT_PAGE_SIZE`] for unsupported sizes. Pages are 1-based.
    pub fn new(total: usize, page: Option<usize>, page_size: Option<usize>) -> Self {
        let page_size = page_size
            .filter(|s| PAGE_SIZES.contains(s))
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let mut pagination = Self {
            page: 1,
            page_size,
            total,
        };
        pagination.page = page.unwrap_or(1).clamp(1, pagination.page_count());
        pagination
    }

    /// Number of pages; an empty listing still has one (empty) page.
    pub fn page_count(&self) -> usize {
        self.total.div_ceil(self.page_size).max(1)
    }

    /// Index range of the current page's items.
    pub fn range(&self) -> Range<usize> {
        let start = ((self.page - 1) * self.page_size).min(self.total);
        let end = (start + self.page_size).min(self.total);
        start..end
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.page_count()
    }
}

/// Fields of the simulated edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StudentEdit {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub age: String,
    pub university: String,
    pub company: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
}

/// A validation problem with one form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl StudentEdit {
    /// Prefill from the displayed student.
    pub fn from_student(student: &Student) -> Self {
        Self {
            first_name: student.first_name.clone(),
            last_name: student.last_name.clone(),
            email: student.email.clone(),
            phone: student.phone.clone(),
            age: if student.age == 0 {
                String::new()
            } else {
                student.age.to_string()
            },
            university: student.university.clone(),
            company: student.company.clone(),
            address: student.address.street.clone(),
            city: student.address.city.clone(),
            postal_code: student.address.postal_code.clone(),
        }
    }

    /// First and last name are required; email and age are checked only
    /// when present.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if self.first_name.trim().is_empty() {
            errors.push(FieldError {
                field: "first_name",
                message: "First name is required",
            });
        }
        if self.last_name.trim().is_empty() {
            errors.push(FieldError {
                field: "last_name",
                message: "Last name is required",
            });
        }
        let email = self.email.trim();
        if !email.is_empty() && !looks_like_email(email) {
            errors.push(FieldError {
                field: "email",
                message: "Enter a valid email address",
            });
        }
        let age = self.age.trim();
        if !age.is_empty() && age.parse::<u32>().is_err() {
            errors.push(FieldError {
                field: "age",
                message: "Age must be a whole number",
            });
        }

        errors
    }
}

fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.contains(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

/// Outcome of a simulated destructive action, carried to the next page as a
/// `notice` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedAction {
    Updated,
    Deleted,
}

impl SimulatedAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "updated" => Some(Self::Updated),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }

    /// Confirmation shown to the user.
    pub const fn message(self) -> &'static str {
        match self {
            Self::Updated => {
                "Student details updated (simulated). The display data remains unchanged."
            }
            Self::Deleted => "Student deleted (simulated).",
        }
    }
}
