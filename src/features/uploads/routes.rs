use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::features::uploads::handlers::{method_not_allowed, show_form, upload_image};
use crate::features::uploads::state::UploadState;

/// Create routes for the uploads feature
///
/// The body limit covers the whole multipart request, not just the file part.
pub fn routes(state: UploadState) -> Router {
    let max_upload_size = state.config.max_upload_size;

    Router::new()
        .route("/", get(show_form))
        .route(
            "/upload",
            post(upload_image)
                .fallback(method_not_allowed)
                .layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .with_state(state)
}
