//! Network-request execution.
//!
//! The request future races three ways: completion, the abort channel
//! (supersede or explicit cancel), and the optional timeout. Losing to
//! the timeout always yields an error message; losing to the abort
//! channel is silent: the caller superseded or cancelled the request
//! on purpose and a newer outcome (or none) is the answer.

use super::aborts::AbortTicket;
use super::ServiceInner;
use clockwork_effect::{Dispatch, EffectError, ExpectBody, HttpEffect, HttpMethod};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

enum Outcome {
    Finished(Result<Value, EffectError>),
    TimedOut,
    Aborted,
}

/// Registers the abort slot (synchronously, so a newer request
/// supersedes the older one before either future runs) and spawns the
/// request.
pub(crate) fn run<M: Send + 'static>(
    inner: Arc<ServiceInner>,
    effect: HttpEffect<M>,
    dispatch: Dispatch<M>,
) {
    let ticket = effect.abort_key.as_ref().map(|k| inner.aborts.register(k));
    let handle = inner.handle.clone();
    handle.spawn(execute(inner, effect, ticket, dispatch));
}

async fn execute<M: Send + 'static>(
    inner: Arc<ServiceInner>,
    effect: HttpEffect<M>,
    ticket: Option<AbortTicket>,
    dispatch: Dispatch<M>,
) {
    let HttpEffect {
        request_id,
        purpose,
        url,
        method,
        headers,
        body,
        expect,
        timeout,
        abort_key,
        on_success,
        on_error,
    } = effect;

    debug!(%request_id, purpose, %url, method = method.as_str(), "http request");

    let mut request = match method {
        HttpMethod::Get => inner.http.get(&url),
        HttpMethod::Post => inner.http.post(&url),
        HttpMethod::Put => inner.http.put(&url),
        HttpMethod::Delete => inner.http.delete(&url),
    };
    for (name, value) in &headers {
        request = request.header(name, value);
    }
    if let Some(body) = body {
        request = request.body(body);
    }

    let response = async {
        let response = request.send().await.map_err(|err| EffectError::Http {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EffectError::Http {
                status: Some(status.as_u16()),
                message: format!("http status {status}"),
            });
        }

        match expect {
            ExpectBody::Json => {
                response
                    .json::<Value>()
                    .await
                    .map_err(|err| EffectError::Http {
                        status: Some(status.as_u16()),
                        message: err.to_string(),
                    })
            }
            ExpectBody::Text => response
                .text()
                .await
                .map(Value::String)
                .map_err(|err| EffectError::Http {
                    status: Some(status.as_u16()),
                    message: err.to_string(),
                }),
        }
    };
    tokio::pin!(response);

    let (generation, abort_rx) = match ticket {
        Some(ticket) => (Some(ticket.generation), Some(ticket.rx)),
        None => (None, None),
    };
    let aborted = async {
        match abort_rx {
            // A closed channel (registry dropped) counts as an abort.
            Some(rx) => {
                let _ = rx.await;
            }
            None => std::future::pending().await,
        }
    };
    let deadline = async {
        match timeout {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending().await,
        }
    };

    let outcome = tokio::select! {
        result = &mut response => Outcome::Finished(result),
        () = aborted => Outcome::Aborted,
        () = deadline => Outcome::TimedOut,
    };

    match outcome {
        Outcome::Finished(Ok(value)) => {
            debug!(%request_id, "http success");
            dispatch.send(on_success(value));
        }
        Outcome::Finished(Err(err)) => {
            debug!(%request_id, error = %err, "http failure");
            dispatch.send(on_error(err));
        }
        Outcome::TimedOut => {
            let after_ms = timeout.map(|d| d.as_millis() as u64).unwrap_or_default();
            debug!(%request_id, after_ms, "http timeout");
            dispatch.send(on_error(EffectError::Timeout { after_ms }));
        }
        // Voluntary: superseded or explicitly cancelled. The one
        // outcome the vocabulary swallows on purpose.
        Outcome::Aborted => {
            debug!(%request_id, "http aborted");
        }
    }

    if let (Some(key), Some(generation)) = (abort_key, generation) {
        inner.aborts.complete(&key, generation);
    }
}
