use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};
use uuid::Uuid;

use crate::domain::identity::Identity;
use crate::AppState;

/// A request made with a valid bearer token.
///
/// Extracting it on a route makes the route login-only: anonymous callers
/// are sent to the login flow with the original path in `next`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
}

impl AuthUser {
    pub fn identity(&self) -> Identity {
        Identity::User(self.user_id)
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        let identity = token.map_or(Identity::Anonymous, |token| state.identity.resolve(token));

        match identity {
            Identity::User(user_id) => Ok(AuthUser { user_id }),
            Identity::Anonymous => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|path| path.as_str())
                    .unwrap_or("/");
                Err(Redirect::to(&login_location(&state.login_url, next)).into_response())
            }
        }
    }
}

fn login_location(login_url: &str, next: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("next", next)
        .finish();
    let separator = if login_url.contains('?') { '&' } else { '?' };
    format!("{login_url}{separator}{query}")
}

#[cfg(test)]
mod tests {
    use super::login_location;

    #[test]
    fn next_is_percent_encoded() {
        assert_eq!(
            login_location("/login", "/edit/hello-world?x=1"),
            "/login?next=%2Fedit%2Fhello-world%3Fx%3D1"
        );
        assert_eq!(
            login_location("https://id.example.com/authorize?client=blog", "/dashboard"),
            "https://id.example.com/authorize?client=blog&next=%2Fdashboard"
        );
    }
}
