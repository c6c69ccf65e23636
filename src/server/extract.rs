//! Body extractor accepting JSON or form-encoded requests.

use axum::{
    Form, async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
};
use serde::de::DeserializeOwned;

use crate::server::ApiError;
use crate::Result;

/// A request type that can also arrive as form fields.
pub trait FormBody: Sized {
    /// Shape of the form-encoded body.
    type Form: DeserializeOwned;

    fn from_form(form: Self::Form) -> Result<Self>;
}

/// Deserializes `T` from a form body when the content type says so, and from
/// JSON otherwise.
#[derive(Debug, Clone)]
pub struct JsonOrForm<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonOrForm<T>
where
    T: DeserializeOwned + FormBody + Send,
    T::Form: Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(form) = Form::<T::Form>::from_request(req, state)
                .await
                .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
            return Ok(Self(T::from_form(form)?));
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        let value = serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?;
        Ok(Self(value))
    }
}
