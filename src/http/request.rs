use crate::types::{ErrorKind, HttpMethod, RequestOutcome, describe_reqwest_error};
use chrono::Utc;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Instant;
use url::Url;

/// Performs one request and reports how it ended.
///
/// Any HTTP response counts as a success, whatever its status code. The
/// duration covers sending the request and reading the whole body. A body
/// that is not valid UTF-8 is reported as absent rather than as a failure.
pub async fn execute_request(
    client: &Client,
    url: &Url,
    method: HttpMethod,
    body: Option<&str>,
) -> RequestOutcome {
    let start = Instant::now();

    let mut request = client.request(method.to_reqwest(), url.clone());

    if method == HttpMethod::Post {
        request = request
            .header(CONTENT_TYPE, "application/json")
            .body(body.unwrap_or_default().to_string());
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(err) => return failure(&err),
    };

    let status_code = response.status().as_u16();

    // Read the whole body before stopping the clock
    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(err) => return failure(&err),
    };

    let duration = start.elapsed();
    let response_body = String::from_utf8(bytes.to_vec()).ok();

    RequestOutcome::Success {
        end_time: Utc::now(),
        duration,
        status_code,
        response_body,
    }
}

fn failure(err: &reqwest::Error) -> RequestOutcome {
    RequestOutcome::Failure {
        kind: ErrorKind::from_reqwest_error(err),
        message: describe_reqwest_error(err),
    }
}
