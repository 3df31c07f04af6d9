use homefeed_core::FetchError;
use reqwest::StatusCode;

/// Send a built request and return the response body as text.
///
/// HTTP 429 maps to [`FetchError::RateLimited`]; any other non-success
/// status and all transport failures (including timeouts) map to
/// [`FetchError::Network`].
pub(crate) async fn send_text(request: reqwest::RequestBuilder) -> Result<String, FetchError> {
    let response = request.send().await.map_err(transport_error)?;
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchError::RateLimited);
    }
    if !status.is_success() {
        return Err(FetchError::Network(format!(
            "unexpected HTTP status {}",
            status
        )));
    }
    response.text().await.map_err(transport_error)
}

/// Same as [`send_text`] but for binary bodies (feed XML may declare a
/// non-UTF-8 encoding, so the parser gets raw bytes).
pub(crate) async fn send_bytes(request: reqwest::RequestBuilder) -> Result<Vec<u8>, FetchError> {
    let response = request.send().await.map_err(transport_error)?;
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchError::RateLimited);
    }
    if !status.is_success() {
        return Err(FetchError::Network(format!(
            "unexpected HTTP status {}",
            status
        )));
    }
    Ok(response.bytes().await.map_err(transport_error)?.to_vec())
}

fn transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Network(format!("request timed out: {}", err))
    } else if err.is_decode() {
        FetchError::Parse(err.to_string())
    } else {
        FetchError::Network(err.to_string())
    }
}

pub(crate) fn parse_error(err: impl std::fmt::Display) -> FetchError {
    FetchError::Parse(err.to_string())
}
