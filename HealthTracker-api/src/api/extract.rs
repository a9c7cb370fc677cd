// Extractors that reject malformed input with the API error format
// instead of axum's plain-text rejections.

use axum::extract::{FromRequest, FromRequestParts};

use crate::entities::ErrorResponse;

/// JSON body; syntax, type and content-type errors become 400
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ErrorResponse))]
pub struct ApiJson<T>(pub T);

/// Path parameters; unparsable values become 400
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ErrorResponse))]
pub struct ApiPath<T>(pub T);

/// Query string; unparsable values become 400
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ErrorResponse))]
pub struct ApiQuery<T>(pub T);
