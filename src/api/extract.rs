//! Extractors whose rejections use the API error envelope.
//!
//! Axum's own `Json`, `Path` and `Query` reject with a plain-text body; these
//! wrappers route the same failures through [`AppError`] so clients always get
//! `{"success": false, "message": ...}`.

use axum::extract::{FromRequest, FromRequestParts};

use crate::errors::AppError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct Path<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct Query<T>(pub T);
