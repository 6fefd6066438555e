use axum::extract::{OriginalUri, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::gateway::Author;
use crate::state::AppState;
use crate::store::{Collection, StoreError};

pub const SESSION_COOKIE: &str = "session";
pub const REDIRECT_COOKIE: &str = "redirect_to";
pub const LOGIN_PATH: &str = "/api/login";

/// The logged-in user, as written to the `sessions` collection by the login
/// flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl SessionUser {
    pub fn author(&self) -> Author {
        Author {
            user_id: self.id.clone(),
            username: self.username.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

async fn resolve_session(state: &AppState, session_id: &str) -> Result<Option<SessionUser>, AppError> {
    let Some(raw) = state.store.get(Collection::Sessions, session_id).await? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| {
            AppError::from(StoreError::Corrupt {
                collection: Collection::Sessions.name(),
                key: session_id.to_string(),
                source,
            })
        })
}

/// Session gate for `/api`. Without a cookie the caller is sent to log in
/// and remembered for the trip back; an unknown session is a 401.
pub async fn require_session(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(session_id) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) else {
        let jar = jar.add(Cookie::build((REDIRECT_COOKIE, uri.path().to_string())).path("/"));
        return (jar, Redirect::temporary(LOGIN_PATH)).into_response();
    };

    match resolve_session(&state, &session_id).await {
        Ok(Some(user)) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Ok(None) => AppError::Unauthorized.into_response(),
        Err(e) => e.into_response(),
    }
}
