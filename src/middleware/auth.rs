use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use mongodb::bson::oid::ObjectId;

use crate::error::AppError;
use crate::services::tokens::TokenService;

pub const TOKEN_HEADER: &str = "x-auth-token";

/// Authentication gate for private routes: pulls the identity token out of
/// the `x-auth-token` header and verifies it. Handlers receive the resolved
/// user id as a plain extractor argument; public routes simply don't ask for
/// one.
pub struct AuthUser {
    pub id: ObjectId,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenService: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized("No token, authorization denied"))?;

        let tokens = TokenService::from_ref(state);
        let id = tokens.verify(token)?;
        Ok(AuthUser { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[derive(Clone)]
    struct TestState(TokenService);

    impl FromRef<TestState> for TokenService {
        fn from_ref(state: &TestState) -> TokenService {
            state.0.clone()
        }
    }

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/auth");
        if let Some(token) = header {
            builder = builder.header(TOKEN_HEADER, token);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn resolves_the_issuing_user() {
        let tokens = TokenService::new("keyboard cat");
        let id = ObjectId::new();
        let token = tokens.issue(&id).unwrap();
        let state = TestState(tokens);

        let mut parts = parts_with(Some(&token));
        let auth = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(auth.id, id);
    }

    #[tokio::test]
    async fn missing_header_is_missing_token() {
        let state = TestState(TokenService::new("keyboard cat"));
        let mut parts = parts_with(None);
        match AuthUser::from_request_parts(&mut parts, &state).await {
            Err(AppError::Unauthorized(msg)) => {
                assert_eq!(msg, "No token, authorization denied")
            }
            other => panic!("expected unauthorized, got {:?}", other.map(|a| a.id)),
        }
    }

    #[tokio::test]
    async fn garbage_token_is_invalid_token() {
        let state = TestState(TokenService::new("keyboard cat"));
        let mut parts = parts_with(Some("garbage"));
        match AuthUser::from_request_parts(&mut parts, &state).await {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, "Token is not valid"),
            other => panic!("expected unauthorized, got {:?}", other.map(|a| a.id)),
        }
    }
}
