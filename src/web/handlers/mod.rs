use axum::Router;
use serde::Serialize;
use std::sync::Arc;

use crate::AppContext;

pub mod status;
pub mod submit;

pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .merge(submit::submit_router(ctx.clone()))
        .merge(status::status_router(ctx))
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(error: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}
