//! The closed effect vocabulary.
//!
//! An [`Effect`] describes an intended external action together with the
//! mappings that turn its outcome back into an application message. The
//! description carries everything the execution service needs (resource
//! identifiers, payloads, timeouts, abort keys), so the service never
//! touches application state.
//!
//! # One Terminal Outcome
//!
//! Every effect that can fail or be superseded delivers exactly one
//! terminal outcome per request: success, error, or (only for a
//! voluntary, non-timeout cancellation) silent drop. No effect leaves
//! its caller permanently unanswered.

use crate::error::EffectError;
use clockwork_types::{AbortKey, RequestId, TaskId};
use serde_json::Value;
use std::time::Duration;

/// Maps a successful outcome payload to an application message.
pub type SuccessMapper<M> = Box<dyn FnOnce(Value) -> M + Send>;

/// Maps a failure outcome to an application message.
pub type ErrorMapper<M> = Box<dyn FnOnce(EffectError) -> M + Send>;

/// HTTP method for a network-request effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    /// GET (default).
    #[default]
    Get,
    /// POST.
    Post,
    /// PUT.
    Put,
    /// DELETE.
    Delete,
}

impl HttpMethod {
    /// Returns the method as an uppercase string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// How the response body of a network request is decoded before it is
/// handed to the success mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpectBody {
    /// Parse the body as JSON (default).
    #[default]
    Json,
    /// Deliver the body as a JSON string value.
    Text,
}

/// A network request.
///
/// # Cancellation
///
/// With an [`AbortKey`], a second request under the same key immediately
/// aborts the first ("latest wins"), so a stale in-flight response can
/// never apply after a newer request superseded it. With a timeout, the
/// request aborts after the duration and an error message is always
/// delivered: a timeout and a voluntary cancellation share the abort
/// path but differ in whether an error surfaces.
///
/// # Example
///
/// ```
/// use clockwork_effect::{Effect, EffectError, HttpEffect};
/// use std::time::Duration;
///
/// enum Msg {
///     Loaded(serde_json::Value),
///     Failed(EffectError),
/// }
///
/// let effect: Effect<Msg> = HttpEffect::get(
///     "https://example.com/data",
///     Msg::Loaded,
///     Msg::Failed,
/// )
/// .with_timeout(Duration::from_secs(5))
/// .with_abort_key("load")
/// .into();
/// assert_eq!(effect.kind(), "http");
/// ```
pub struct HttpEffect<M> {
    /// Unique id for this request (logging/tracing).
    pub request_id: RequestId,
    /// Short human-readable purpose, used in log output.
    pub purpose: String,
    /// Target URL.
    pub url: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Extra request headers.
    pub headers: Vec<(String, String)>,
    /// Optional request body.
    pub body: Option<String>,
    /// How to decode the response body.
    pub expect: ExpectBody,
    /// Optional timeout; elapsing always yields an error message.
    pub timeout: Option<Duration>,
    /// Optional key for supersede/cancel.
    pub abort_key: Option<AbortKey>,
    /// Maps the decoded response body to a message.
    pub on_success: SuccessMapper<M>,
    /// Maps a failure to a message.
    pub on_error: ErrorMapper<M>,
}

impl<M> HttpEffect<M> {
    /// Creates a GET request.
    pub fn get(
        url: impl Into<String>,
        on_success: impl FnOnce(Value) -> M + Send + 'static,
        on_error: impl FnOnce(EffectError) -> M + Send + 'static,
    ) -> Self {
        Self {
            request_id: RequestId::new(),
            purpose: String::new(),
            url: url.into(),
            method: HttpMethod::Get,
            headers: Vec::new(),
            body: None,
            expect: ExpectBody::Json,
            timeout: None,
            abort_key: None,
            on_success: Box::new(on_success),
            on_error: Box::new(on_error),
        }
    }

    /// Creates a POST request with a body.
    pub fn post(
        url: impl Into<String>,
        body: impl Into<String>,
        on_success: impl FnOnce(Value) -> M + Send + 'static,
        on_error: impl FnOnce(EffectError) -> M + Send + 'static,
    ) -> Self {
        let mut effect = Self::get(url, on_success, on_error);
        effect.method = HttpMethod::Post;
        effect.body = Some(body.into());
        effect
    }

    /// Sets the request purpose (shown in logs).
    #[must_use]
    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = purpose.into();
        self
    }

    /// Overrides the HTTP method.
    #[must_use]
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Adds a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the response decoding mode.
    #[must_use]
    pub fn with_expect(mut self, expect: ExpectBody) -> Self {
        self.expect = expect;
        self
    }

    /// Sets a timeout. Elapsing always yields an error message.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the abort key for supersede/cancel.
    #[must_use]
    pub fn with_abort_key(mut self, key: impl Into<AbortKey>) -> Self {
        self.abort_key = Some(key.into());
        self
    }
}

/// A one-shot timer: fires one message after a duration, once.
///
/// Repetition belongs to subscriptions, not one-shot effects.
pub struct DelayEffect<M> {
    /// How long to wait before firing.
    pub after: Duration,
    /// Builds the message to dispatch when the duration elapses.
    pub on_elapsed: Box<dyn FnOnce() -> M + Send>,
}

/// A one-shot frame callback: fires one message at the next frame tick.
///
/// Chained self-resubmission implements a render loop. The closure
/// receives the frame timestamp in milliseconds since the service's
/// frame clock started.
pub struct FrameEffect<M> {
    /// Builds the message to dispatch at the next frame tick.
    pub on_frame: Box<dyn FnOnce(u64) -> M + Send>,
}

/// An offloaded computation submitted to a pooled, isolated unit.
///
/// The pool lazily creates units up to a configured maximum per target;
/// at capacity, excess tasks queue for the next unit to free. A per-task
/// timeout abandons and replaces a stuck unit and always yields an
/// error; a unit panic likewise always yields an error.
pub struct ComputeEffect<M> {
    /// Unique id for this task (logging/tracing).
    pub task_id: TaskId,
    /// Name of the registered compute target.
    pub target: String,
    /// Input handed to the compute function.
    pub payload: Value,
    /// Optional per-task timeout.
    pub timeout: Option<Duration>,
    /// Maps the computed result to a message.
    pub on_success: SuccessMapper<M>,
    /// Maps a failure to a message.
    pub on_error: ErrorMapper<M>,
}

impl<M> ComputeEffect<M> {
    /// Creates a computation for the named target.
    pub fn new(
        target: impl Into<String>,
        payload: Value,
        on_success: impl FnOnce(Value) -> M + Send + 'static,
        on_error: impl FnOnce(EffectError) -> M + Send + 'static,
    ) -> Self {
        Self {
            task_id: TaskId::new(),
            target: target.into(),
            payload,
            timeout: None,
            on_success: Box::new(on_success),
            on_error: Box::new(on_error),
        }
    }

    /// Sets a per-task timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A declarative description of an intended external action.
///
/// Created by the update function, consumed exactly once by the effect
/// runner. Handoff order equals the order returned from update;
/// completion order is unspecified.
pub enum Effect<M> {
    /// Network request (§ [`HttpEffect`]).
    Http(HttpEffect<M>),
    /// Abort whatever is registered under the key; no-op if nothing is.
    Cancel {
        /// The slot to abort.
        key: AbortKey,
    },
    /// One-shot timer (§ [`DelayEffect`]).
    Delay(DelayEffect<M>),
    /// One-shot frame callback (§ [`FrameEffect`]).
    Frame(FrameEffect<M>),
    /// Pooled offloaded computation (§ [`ComputeEffect`]).
    Compute(ComputeEffect<M>),
}

impl<M> Effect<M> {
    /// Creates a one-shot timer effect.
    pub fn delay(after: Duration, on_elapsed: impl FnOnce() -> M + Send + 'static) -> Self {
        Self::Delay(DelayEffect {
            after,
            on_elapsed: Box::new(on_elapsed),
        })
    }

    /// Creates a one-shot frame callback effect.
    pub fn frame(on_frame: impl FnOnce(u64) -> M + Send + 'static) -> Self {
        Self::Frame(FrameEffect {
            on_frame: Box::new(on_frame),
        })
    }

    /// Creates an explicit-cancel effect.
    pub fn cancel(key: impl Into<AbortKey>) -> Self {
        Self::Cancel { key: key.into() }
    }

    /// Creates an offloaded-computation effect.
    pub fn compute(
        target: impl Into<String>,
        payload: Value,
        on_success: impl FnOnce(Value) -> M + Send + 'static,
        on_error: impl FnOnce(EffectError) -> M + Send + 'static,
    ) -> Self {
        Self::Compute(ComputeEffect::new(target, payload, on_success, on_error))
    }

    /// Returns the variant name, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Cancel { .. } => "cancel",
            Self::Delay(_) => "delay",
            Self::Frame(_) => "frame",
            Self::Compute(_) => "compute",
        }
    }

    /// Translates this effect's resulting messages into a parent
    /// vocabulary.
    ///
    /// The child effect is embedded unmodified (resource identifiers,
    /// timeouts and abort keys are untouched) and the translation is
    /// composed into each outcome mapping, so the child's message is
    /// built first and then wrapped.
    ///
    /// # Example
    ///
    /// ```
    /// use clockwork_effect::Effect;
    /// use std::time::Duration;
    ///
    /// enum Child { Done }
    /// enum Parent { FromChild(Child) }
    ///
    /// let child: Effect<Child> = Effect::delay(Duration::from_millis(1), || Child::Done);
    /// let parent: Effect<Parent> = child.map(Parent::FromChild);
    /// assert_eq!(parent.kind(), "delay");
    /// ```
    #[must_use]
    pub fn map<N>(self, wrap: impl Fn(M) -> N + Clone + Send + Sync + 'static) -> Effect<N>
    where
        M: 'static,
        N: 'static,
    {
        match self {
            Self::Http(e) => {
                let wrap_err = wrap.clone();
                let on_success = e.on_success;
                let on_error = e.on_error;
                Effect::Http(HttpEffect {
                    request_id: e.request_id,
                    purpose: e.purpose,
                    url: e.url,
                    method: e.method,
                    headers: e.headers,
                    body: e.body,
                    expect: e.expect,
                    timeout: e.timeout,
                    abort_key: e.abort_key,
                    on_success: Box::new(move |value| wrap(on_success(value))),
                    on_error: Box::new(move |err| wrap_err(on_error(err))),
                })
            }
            Self::Cancel { key } => Effect::Cancel { key },
            Self::Delay(e) => {
                let on_elapsed = e.on_elapsed;
                Effect::Delay(DelayEffect {
                    after: e.after,
                    on_elapsed: Box::new(move || wrap(on_elapsed())),
                })
            }
            Self::Frame(e) => {
                let on_frame = e.on_frame;
                Effect::Frame(FrameEffect {
                    on_frame: Box::new(move |ts| wrap(on_frame(ts))),
                })
            }
            Self::Compute(e) => {
                let wrap_err = wrap.clone();
                let on_success = e.on_success;
                let on_error = e.on_error;
                Effect::Compute(ComputeEffect {
                    task_id: e.task_id,
                    target: e.target,
                    payload: e.payload,
                    timeout: e.timeout,
                    on_success: Box::new(move |value| wrap(on_success(value))),
                    on_error: Box::new(move |err| wrap_err(on_error(err))),
                })
            }
        }
    }
}

impl<M> From<HttpEffect<M>> for Effect<M> {
    fn from(effect: HttpEffect<M>) -> Self {
        Self::Http(effect)
    }
}

impl<M> From<ComputeEffect<M>> for Effect<M> {
    fn from(effect: ComputeEffect<M>) -> Self {
        Self::Compute(effect)
    }
}

impl<M> std::fmt::Debug for Effect<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(e) => f
                .debug_struct("Http")
                .field("request_id", &e.request_id)
                .field("purpose", &e.purpose)
                .field("url", &e.url)
                .field("method", &e.method)
                .field("timeout", &e.timeout)
                .field("abort_key", &e.abort_key)
                .finish_non_exhaustive(),
            Self::Cancel { key } => f.debug_struct("Cancel").field("key", key).finish(),
            Self::Delay(e) => f
                .debug_struct("Delay")
                .field("after", &e.after)
                .finish_non_exhaustive(),
            Self::Frame(_) => f.debug_struct("Frame").finish_non_exhaustive(),
            Self::Compute(e) => f
                .debug_struct("Compute")
                .field("task_id", &e.task_id)
                .field("target", &e.target)
                .field("timeout", &e.timeout)
                .finish_non_exhaustive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq)]
    enum Child {
        Got(Value),
        Oops(EffectError),
        Tick,
    }

    #[derive(Debug, PartialEq)]
    enum Parent {
        Wrapped(Child),
    }

    #[test]
    fn kinds() {
        assert_eq!(
            Effect::<Child>::delay(Duration::from_millis(1), || Child::Tick).kind(),
            "delay"
        );
        assert_eq!(Effect::<Child>::cancel("k").kind(), "cancel");
        assert_eq!(
            Effect::<Child>::frame(|_| Child::Tick).kind(),
            "frame"
        );
    }

    #[test]
    fn http_builder() {
        let effect = HttpEffect::get("http://localhost/x", Child::Got, Child::Oops)
            .with_purpose("load x")
            .with_header("accept", "application/json")
            .with_timeout(Duration::from_secs(1))
            .with_abort_key("x");

        assert_eq!(effect.method, HttpMethod::Get);
        assert_eq!(effect.purpose, "load x");
        assert_eq!(effect.headers.len(), 1);
        assert_eq!(effect.timeout, Some(Duration::from_secs(1)));
        assert_eq!(effect.abort_key, Some(AbortKey::new("x")));
    }

    #[test]
    fn post_sets_method_and_body() {
        let effect = HttpEffect::post("http://localhost/x", "{}", Child::Got, Child::Oops);
        assert_eq!(effect.method, HttpMethod::Post);
        assert_eq!(effect.body.as_deref(), Some("{}"));
    }

    #[test]
    fn map_translates_success() {
        let effect: Effect<Child> = Effect::compute("t", json!(1), Child::Got, Child::Oops);
        let mapped: Effect<Parent> = effect.map(Parent::Wrapped);

        let Effect::Compute(e) = mapped else {
            panic!("expected compute effect");
        };
        let msg = (e.on_success)(json!(2));
        assert_eq!(msg, Parent::Wrapped(Child::Got(json!(2))));
    }

    #[test]
    fn map_translates_error() {
        let effect: Effect<Child> = Effect::compute("t", json!(1), Child::Got, Child::Oops);
        let mapped: Effect<Parent> = effect.map(Parent::Wrapped);

        let Effect::Compute(e) = mapped else {
            panic!("expected compute effect");
        };
        let err = EffectError::Timeout { after_ms: 10 };
        let msg = (e.on_error)(err.clone());
        assert_eq!(msg, Parent::Wrapped(Child::Oops(err)));
    }

    #[test]
    fn map_preserves_resource_fields() {
        let effect: Effect<Child> = HttpEffect::get("http://localhost/y", Child::Got, Child::Oops)
            .with_abort_key("y")
            .into();
        let mapped: Effect<Parent> = effect.map(Parent::Wrapped);

        let Effect::Http(e) = mapped else {
            panic!("expected http effect");
        };
        assert_eq!(e.url, "http://localhost/y");
        assert_eq!(e.abort_key, Some(AbortKey::new("y")));
    }

    #[test]
    fn debug_omits_closures() {
        let effect: Effect<Child> = Effect::delay(Duration::from_millis(5), || Child::Tick);
        let text = format!("{effect:?}");
        assert!(text.contains("Delay"));
        assert!(text.contains("5ms"));
    }
}
