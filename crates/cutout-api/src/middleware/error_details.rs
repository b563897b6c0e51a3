use crate::error::DetailedErrorBody;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

/// Whether error responses may carry diagnostic `details`. Fixed per router.
#[derive(Clone, Copy, Debug, Default)]
pub struct ErrorDetailPolicy {
    pub expose: bool,
}

/// Swap in the detailed error body when the router exposes diagnostics.
///
/// Error responses leave the handler without `details`; the full body rides along as a
/// `DetailedErrorBody` extension and is dropped here unless `expose` is set.
pub async fn error_details_middleware(
    State(policy): State<ErrorDetailPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;

    let Some(DetailedErrorBody(body)) = response.extensions_mut().remove::<DetailedErrorBody>()
    else {
        return response;
    };
    if !policy.expose {
        return response;
    }

    let (mut parts, _) = response.into_parts();
    let (json_parts, json_body) = Json(body).into_response().into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    if let Some(content_type) = json_parts.headers.get(header::CONTENT_TYPE) {
        parts.headers.insert(header::CONTENT_TYPE, content_type.clone());
    }
    Response::from_parts(parts, json_body)
}
