//! Guarded session loader shared by both dashboards.
//!
//! Runs once per screen entry: resolve the identity, check the role, then
//! run the screen's follow-up fetch. Any failure is terminal and ends in a
//! route away from the screen.

use log::{info, warn};
use std::future::Future;

use crate::api::TaskApi;
use crate::error::ClientError;
use crate::gateway::Transport;
use crate::models::{Role, Route, Session, Task};
use crate::notify::Notifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageGuard {
    pub expected: Role,
    pub mismatch_notice: &'static str,
    pub failure_fallback: &'static str,
    pub failure_route: Route,
}

pub const ADMIN_PAGE: PageGuard = PageGuard {
    expected: Role::Admin,
    mismatch_notice: "Admin access required",
    failure_fallback: "Authentication failed. Please login again.",
    failure_route: Route::Landing,
};

// The failure route points at a screen that is never registered.
pub const USER_PAGE: PageGuard = PageGuard {
    expected: Role::User,
    mismatch_notice: "User access only | Please login to continue",
    failure_fallback: "Please login to continue",
    failure_route: Route::Login,
};

impl PageGuard {
    pub fn for_role(role: Role) -> &'static PageGuard {
        match role {
            Role::Admin => &ADMIN_PAGE,
            Role::User | Role::Other => &USER_PAGE,
        }
    }
}

#[derive(Debug)]
pub enum GuardOutcome<D> {
    Ready { session: Session, data: D },
    Redirecting { route: Route, expected: Role, actual: Role },
    Failed { error: ClientError, route: Route },
}

impl<D> GuardOutcome<D> {
    /// Where the screen should go next; `None` means stay and render.
    pub fn redirect(&self) -> Option<Route> {
        match self {
            GuardOutcome::Ready { .. } => None,
            GuardOutcome::Redirecting { route, .. } | GuardOutcome::Failed { route, .. } => Some(*route),
        }
    }

    pub fn into_result(self) -> Result<(Session, D), ClientError> {
        match self {
            GuardOutcome::Ready { session, data } => Ok((session, data)),
            GuardOutcome::Redirecting { expected, actual, .. } => {
                Err(ClientError::AuthorizationMismatch { expected, actual })
            }
            GuardOutcome::Failed { error, .. } => Err(error),
        }
    }
}

pub async fn load<T, D, F, Fut>(
    api: &TaskApi<T>,
    page: &PageGuard,
    fetch: F,
    notifier: &mut dyn Notifier,
) -> GuardOutcome<D>
where
    T: Transport,
    F: FnOnce(Role) -> Fut,
    Fut: Future<Output = Result<D, ClientError>>,
{
    let session = match api.me().await {
        Ok(session) => session,
        Err(error) => return fail(page, error, notifier),
    };
    admit(page, session, fetch, notifier).await
}

/// The common case: guard a dashboard and fetch the tasks visible to its role.
pub async fn load_tasks<T: Transport>(
    api: &TaskApi<T>,
    page: &PageGuard,
    notifier: &mut dyn Notifier,
) -> GuardOutcome<Vec<Task>> {
    load(api, page, |role| api.list_tasks(role), notifier).await
}

/// Guards whichever dashboard the session's own role belongs to, with a
/// single identity lookup. Identity failures use the admin page's fallback.
pub async fn load_own_tasks<T: Transport>(
    api: &TaskApi<T>,
    notifier: &mut dyn Notifier,
) -> GuardOutcome<Vec<Task>> {
    let session = match api.me().await {
        Ok(session) => session,
        Err(error) => return fail(&ADMIN_PAGE, error, notifier),
    };
    let page = PageGuard::for_role(session.role);
    admit(page, session, |role| api.list_tasks(role), notifier).await
}

async fn admit<D, F, Fut>(
    page: &PageGuard,
    session: Session,
    fetch: F,
    notifier: &mut dyn Notifier,
) -> GuardOutcome<D>
where
    F: FnOnce(Role) -> Fut,
    Fut: Future<Output = Result<D, ClientError>>,
{
    if session.role != page.expected {
        info!(
            "{} has role {}, screen requires {}",
            session.email, session.role, page.expected
        );
        notifier.blocking(page.mismatch_notice);
        return GuardOutcome::Redirecting {
            route: Route::Landing,
            expected: page.expected,
            actual: session.role,
        };
    }

    match fetch(session.role).await {
        Ok(data) => GuardOutcome::Ready { session, data },
        Err(error) => fail(page, error, notifier),
    }
}

fn fail<D>(page: &PageGuard, error: ClientError, notifier: &mut dyn Notifier) -> GuardOutcome<D> {
    warn!("{} screen failed to load: {}", page.expected, error);
    let message = error.to_string();
    if message.is_empty() {
        notifier.blocking(page.failure_fallback);
    } else {
        notifier.blocking(&message);
    }
    GuardOutcome::Failed {
        error,
        route: page.failure_route,
    }
}
