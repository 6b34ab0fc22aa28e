//! Request and process span context.
//!
//! Request identifiers and routes live in task-local storage so that the
//! pipeline can attach them to its own spans and audit events without
//! threading them through every call.

use std::future::Future;
use std::sync::Arc;

use tracing::{Span, span::Entered};

use crate::init::build_sha;

/// Keeps the process-level span entered for as long as the guard lives.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    /// Enter a process-wide span tagged with the service name and build SHA.
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        let service = service.into();
        let span: &'static Span = Box::leak(Box::new(tracing::info_span!(
            "runwrap",
            service = %service,
            build_sha = %build_sha()
        )));
        Self {
            _guard: span.enter(),
        }
    }
}

/// Record request identifiers on a span declared with empty `request_id` and `route` fields.
pub fn set_request_context(span: &Span, request_id: impl Into<String>, route: impl Into<String>) {
    let request_id = request_id.into();
    let route = route.into();
    span.record("request_id", tracing::field::display(&request_id));
    span.record("route", tracing::field::display(&route));
}

/// Request identifier of the enclosing [`with_request_context`] scope.
#[must_use]
pub fn current_request_id() -> Option<String> {
    ACTIVE_REQUEST_CONTEXT
        .try_with(|ctx| ctx.request_id.to_string())
        .ok()
}

/// Route of the enclosing [`with_request_context`] scope.
#[must_use]
pub fn current_route() -> Option<String> {
    ACTIVE_REQUEST_CONTEXT
        .try_with(|ctx| ctx.route.to_string())
        .ok()
}

/// Run `fut` with the given request identifier and route available to downstream code.
pub async fn with_request_context<Fut, T>(
    request_id: impl Into<String>,
    route: impl Into<String>,
    fut: Fut,
) -> T
where
    Fut: Future<Output = T>,
{
    let context = RequestContext {
        request_id: Arc::from(request_id.into()),
        route: Arc::from(route.into()),
    };
    ACTIVE_REQUEST_CONTEXT.scope(context, fut).await
}

#[derive(Clone)]
struct RequestContext {
    request_id: Arc<str>,
    route: Arc<str>,
}

tokio::task_local! {
    static ACTIVE_REQUEST_CONTEXT: RequestContext;
}
