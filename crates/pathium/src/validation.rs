//! Typed request body and query validation.

use serde::de::DeserializeOwned;

use crate::error::{Failure, HttpError};
use crate::request::Request;

/// Deserializes the JSON request body into `T`.
///
/// An empty body is treated as `{}`, so a model whose fields all have
/// defaults still validates.
///
/// # Errors
///
/// Fails with `422` carrying the deserializer's message when the body is not
/// valid JSON or does not fit `T`.
pub async fn validate_body<T: DeserializeOwned>(req: &mut Request) -> Result<T, Failure> {
    let body = req.body().await;
    let parsed = if body.is_empty() {
        serde_json::from_slice(b"{}")
    } else {
        serde_json::from_slice(body)
    };
    parsed.map_err(|err| Failure::from(HttpError::unprocessable(err.to_string())))
}

/// Deserializes the query string into `T`.
///
/// Values are form-decoded and converted to the field types of `T`, so
/// `limit=3` fills an integer field. Fields absent from the query take their
/// serde defaults.
///
/// # Errors
///
/// Fails with `422` carrying the deserializer's message when a required field
/// is missing or a value does not convert.
pub fn validate_query<T: DeserializeOwned>(req: &Request) -> Result<T, Failure> {
    serde_urlencoded::from_bytes(&req.scope().query_string)
        .map_err(|err| Failure::from(HttpError::unprocessable(err.to_string())))
}
