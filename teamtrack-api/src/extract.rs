/// Request extractors
///
/// [`ValidatedJson`] replaces `Json<T>` in handlers: malformed bodies and
/// `validator` failures both come back as a 400 `validation_error` in the
/// usual [`crate::error::ErrorResponse`] shape. [`ValidatedPath`] and
/// [`ValidatedQuery`] do the same for path segments and query strings.

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Path, Query, Request,
    },
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::ApiError;

/// JSON body that has been deserialized and validated
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid("body", &format!("Invalid request body: {}", rejection.body_text()))
    }
}

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state).await?;
        inner.validate()?;
        Ok(ValidatedJson(inner))
    }
}

/// Path parameters that failed to parse are a 400 `validation_error`
#[derive(Debug, Clone, Copy)]
pub struct ValidatedPath<T>(pub T);

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        if rejection.status().is_server_error() {
            return ApiError::internal(rejection.body_text());
        }
        ApiError::invalid("path", &format!("Invalid path: {}", rejection.body_text()))
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(inner) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(ValidatedPath(inner))
    }
}

/// Query string that failed to parse is a 400 `validation_error`
#[derive(Debug, Clone, Copy)]
pub struct ValidatedQuery<T>(pub T);

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::invalid("query", &format!("Invalid query: {}", rejection.body_text()))
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(inner) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ValidatedQuery(inner))
    }
}

/// Deserializes a field that is present in the body as `Some`, even when
/// its value is `null`
///
/// Used with `#[serde(default, deserialize_with = "present")]` on
/// `Option<Option<T>>` fields, so PATCH bodies can tell "leave unchanged"
/// (absent) from "clear" (`null`).
pub fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "present")]
        note: Option<Option<String>>,
    }

    #[test]
    fn test_present_distinguishes_absent_from_null() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.note, None);

        let null: Patch = serde_json::from_str(r#"{"note":null}"#).unwrap();
        assert_eq!(null.note, Some(None));

        let set: Patch = serde_json::from_str(r#"{"note":"hi"}"#).unwrap();
        assert_eq!(set.note, Some(Some("hi".to_string())));
    }
}
