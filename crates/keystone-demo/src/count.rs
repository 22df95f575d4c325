//! Demo request handlers.

use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use keystone::server::{api_error, ok, raw, Handler, HttpResponse, Request, RequestExt, JSON};

/// Most values a single count may return, minus one.
pub const MAX_SPAN: i64 = 100;

/// How long `die` waits before exiting.
pub const DIE_DELAY: Duration = Duration::from_secs(1);

/// Called by `die` with the requested exit code.
pub type ExitFn = Arc<dyn Fn(i32) + Send + Sync + 'static>;

fn int_param(req: &Request, name: &str) -> Option<i64> {
    req.param(name)?.parse().ok()
}

/// `GET /count/:first/:last`: the integers from `first` to `last` inclusive.
pub async fn count(req: Request) -> HttpResponse {
    let Some(first) = int_param(&req, "first") else {
        return api_error(
            StatusCode::BAD_REQUEST,
            "'first' parameter did not parse as an integer",
        );
    };
    let Some(last) = int_param(&req, "last") else {
        return api_error(
            StatusCode::BAD_REQUEST,
            "'last' parameter did not parse as an integer",
        );
    };
    if first > last {
        return api_error(StatusCode::BAD_REQUEST, "'first' must be less than 'last'");
    }
    if first.saturating_add(MAX_SPAN) < last {
        return api_error(StatusCode::BAD_REQUEST, "cannot return more than 100 values");
    }

    ok(&(first..=last).collect::<Vec<_>>())
}

/// `GET /passthrough/:first/:last`: relays `<base_url>/count/<first>/<last>`.
pub fn passthrough(client: reqwest::Client, base_url: impl Into<String>) -> impl Handler {
    let base_url: Arc<str> = base_url.into().into();
    move |req: Request| {
        let client = client.clone();
        let url = format!(
            "{}/count/{}/{}",
            base_url,
            req.param("first").unwrap_or_default(),
            req.param("last").unwrap_or_default(),
        );
        async move { relay(&client, &url).await }
    }
}

async fn relay(client: &reqwest::Client, url: &str) -> HttpResponse {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(url, error = %e, "passthrough request failed");
            return api_error(StatusCode::INTERNAL_SERVER_ERROR, "bad response from passthrough");
        }
    };

    let status = response.status();
    match response.bytes().await {
        Ok(body) => raw(status, JSON, body),
        Err(e) => {
            tracing::warn!(url, error = %e, "passthrough body unreadable");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "bad response from passthrough")
        }
    }
}

/// `GET /die/:code`: answers, then calls `exit` with `code` after
/// [`DIE_DELAY`]. A code that is not an integer becomes 0.
pub fn die(exit: ExitFn) -> impl Handler {
    move |req: Request| {
        let code = req
            .param("code")
            .and_then(|c| c.parse::<i32>().ok())
            .unwrap_or(0);
        let exit = Arc::clone(&exit);
        async move {
            tracing::warn!(code, "exit requested");
            tokio::spawn(async move {
                tokio::time::sleep(DIE_DELAY).await;
                exit(code);
            });
            ok(&"Shutting down in 1 sec")
        }
    }
}
