//! JSON body extractor that rejects through [`ApiError`].

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;

use super::error::ApiError;

/// Like [`Json`], but a missing field, a wrong type or an unreadable body
/// is a logged 400 with the usual `{ "error": .. }` body.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(rejection.into()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{self, StatusCode}};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Deposit {
        amount: f64,
    }

    fn request(body: &'static str) -> Request {
        http::Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn well_formed_body_passes() {
        let ApiJson(p) = ApiJson::<Deposit>::from_request(request(r#"{"amount":4.5}"#), &()).await.unwrap();
        assert_eq!(p.amount, 4.5);
    }

    #[tokio::test]
    async fn missing_field_and_bad_syntax_are_bad_requests() {
        for body in ["{}", r#"{"amount":"lots"}"#, "{not json"] {
            let err = ApiJson::<Deposit>::from_request(request(body), &()).await.err().unwrap();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST, "{body}");
        }
    }
}
