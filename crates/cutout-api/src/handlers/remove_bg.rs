use crate::error::HttpAppError;
use crate::services::RelayService;
use crate::utils::upload::extract_upload;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};

/// `POST /api/remove-bg`: multipart field `file` in, PNG bytes out.
///
/// A request that is not multipart at all is treated as carrying no file.
pub async fn remove_background(
    State(relay): State<RelayService>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, HttpAppError> {
    let upload = match multipart {
        Ok(multipart) => extract_upload(multipart).await?,
        Err(rejection) => {
            tracing::debug!(rejection = %rejection, "Request body is not multipart");
            None
        }
    };

    let image = relay.handle(upload).await?;
    let disposition = HeaderValue::from_str(&image.content_disposition()).ok();

    let mut response = image.data.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(image.content_type),
    );
    if let Some(disposition) = disposition {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }

    Ok(response)
}
