//! Application state shared across all request handlers.

use std::sync::Arc;

use campus_core::registry::DEFAULT_SESSION_CAPACITY;
use campus_core::source::{DEFAULT_PAGE_CAPACITY, fetch_fn, keyed_fetch_fn};
use campus_core::{
    DemoApi, Directory, HttpDemoApi, PostRenderSource, RequestTimeSource, RevalidatingPages,
    SessionRegistry, Student,
};

use crate::config::Config;
use crate::session::CookieStorage;

/// Number of users shown in the student listing.
const LISTING_LIMIT: usize = 30;

/// Number of students in the dashboard's "recent students" card.
const RECENT_LIMIT: usize = 5;

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,

    /// Demo API client.
    pub api: Arc<dyn DemoApi>,

    /// Live sessions and their state stores.
    pub sessions: SessionRegistry<CookieStorage>,

    /// Dashboard user count, fetched per request.
    pub user_count: Arc<RequestTimeSource<u64>>,

    /// Student listing with majors, fetched per request.
    pub directory: Arc<RequestTimeSource<Directory>>,

    /// Dashboard "recent students", fetched after the page is shown.
    pub recent: Arc<PostRenderSource<Vec<Student>>>,

    /// Student detail pages, built at startup and revalidated.
    pub profiles: Arc<RevalidatingPages<u32, Student>>,
}

impl AppState {
    /// Create application state talking to the configured demo API.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let api = HttpDemoApi::new(&config.api_url, config.fetch_timeout)?;
        Ok(Self::with_api(config, Arc::new(api)))
    }

    /// Create application state over any [`DemoApi`].
    pub fn with_api(config: Config, api: Arc<dyn DemoApi>) -> Self {
        let sessions = SessionRegistry::new(config.session_idle, DEFAULT_SESSION_CAPACITY);

        let user_count = {
            let api = Arc::clone(&api);
            RequestTimeSource::new(
                "user_count",
                fetch_fn(move || {
                    let api = Arc::clone(&api);
                    async move { api.user_count().await }
                }),
            )
        };

        let directory = {
            let api = Arc::clone(&api);
            RequestTimeSource::new(
                "directory",
                fetch_fn(move || {
                    let api = Arc::clone(&api);
                    async move { Directory::fetch(api.as_ref(), LISTING_LIMIT).await }
                }),
            )
        };

        let recent = {
            let api = Arc::clone(&api);
            PostRenderSource::new(
                "recent_students",
                config.fetch_timeout,
                fetch_fn(move || {
                    let api = Arc::clone(&api);
                    async move {
                        let users = api.users(RECENT_LIMIT).await?;
                        let students: Vec<Student> = users
                            .into_iter()
                            .map(|user| Student::from_remote(user, None))
                            .collect();
                        Ok::<_, campus_core::Error>(students)
                    }
                }),
            )
        };

        // Room for every pre-built page plus on-demand ones.
        let page_capacity = DEFAULT_PAGE_CAPACITY.max(config.prerender_limit as u64);
        let profiles = {
            let api = Arc::clone(&api);
            RevalidatingPages::new(
                "student",
                config.revalidate,
                page_capacity,
                keyed_fetch_fn(move |id: u32| {
                    let api = Arc::clone(&api);
                    async move {
                        let user = api.user(id).await?;
                        Ok::<_, campus_core::Error>(
                            user.map(|user| Student::from_remote(user, None)),
                        )
                    }
                }),
            )
        };

        tracing::info!(
            revalidate_secs = config.revalidate.as_secs(),
            session_idle_secs = config.session_idle.as_secs(),
            session_capacity = DEFAULT_SESSION_CAPACITY,
            page_capacity = page_capacity,
            "application state initialized"
        );

        Self {
            config: Arc::new(config),
            api,
            sessions,
            user_count: Arc::new(user_count),
            directory: Arc::new(directory),
            recent: Arc::new(recent),
            profiles: Arc::new(profiles),
        }
    }

    /// Build the first `prerender_limit` student pages. A failed listing
    /// builds nothing; every page then falls back to on-demand fetching.
    pub async fn prebuild(&self) -> usize {
        let limit = self.config.prerender_limit;
        if limit == 0 {
            return 0;
        }

        match self.api.users(limit).await {
            Ok(users) => {
                self.profiles
                    .prebuild(users.into_iter().map(|user| user.id))
                    .await
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not list students to pre-build");
                0
            }
        }
    }
}
