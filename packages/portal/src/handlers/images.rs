use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/images/{filename}",
    tag = "Images",
    operation_id = "getImage",
    summary = "Download a generated image",
    description = "Serves a stored image by the filename returned from image generation. Filenames are content-addressed, so responses are cacheable forever.",
    params(("filename" = String, Path, description = "Stored image filename")),
    responses(
        (status = 200, description = "Image bytes"),
        (status = 404, description = "Unknown image (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn serve_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let content = state.images.get(&filename).await?;
    let mime = mime_guess::from_path(&filename).first_or_octet_stream();

    Response::builder()
        .header(header::CONTENT_TYPE, mime.as_ref())
        .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
        .body(Body::from(content))
        .map_err(|e| AppError::Internal(e.to_string()))
}
