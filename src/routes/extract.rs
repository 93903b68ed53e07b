use axum::extract::{FromRequest, FromRequestParts};

use crate::error::Error;

/// `axum::Json` whose rejection renders as the crate error body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct ApiPath<T>(pub T);
