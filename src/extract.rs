//! Request extractors that reject malformed input with the app's JSON error envelope.

use axum::extract::{FromRequest, FromRequestParts};

use crate::Error;

/// A JSON request body. Rejections become [Error::Validation].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct ApiJson<T>(pub T);

/// URL query parameters. Rejections become [Error::Validation].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct ApiQuery<T>(pub T);

/// URL path parameters. Rejections become [Error::Validation].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct ApiPath<T>(pub T);
