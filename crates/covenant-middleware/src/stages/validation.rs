//! Request and response validation middleware.
//!
//! Both stages wrap a shared [`ContractValidation`] and pass requests that
//! match no operation straight through.
//!
//! # Chain position
//!
//! ```text
//! Request → [RequestValidation] → [ResponseValidation] → Handler
//! ```
//!
//! Request validation runs first so that requests it rejects never reach the
//! response stage. It stores the matched [`OperationMatch`] in the context,
//! where the response stage picks it up instead of resolving again.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use covenant_middleware::stages::{RequestValidationMiddleware, ResponseValidationMiddleware};
//!
//! let validation = Arc::new(ContractValidation::new(router, validator, options));
//!
//! let pipeline = Pipeline::builder()
//!     .stage(RequestValidationMiddleware::new(validation.clone()))
//!     .stage(ResponseValidationMiddleware::observe(validation))
//!     .build();
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use covenant_core::{OperationMatch, OperationResolver, SchemaValidator};
use covenant_extract::RawRequest;
use covenant_telemetry::metrics::{
    record_response_size, record_unmatched_request, record_validation,
    record_validation_failure,
};
use covenant_telemetry::Phase;
use http_body_util::{BodyExt, Full};
use tracing::{debug, warn};

use crate::{
    context::MiddlewareContext,
    drain::ResponseBuffer,
    middleware::{BoxFuture, Middleware, Next},
    orchestrator::ContractValidation,
    types::{Request, Response, ResponseExt},
};

/// Request validation middleware.
///
/// Rejects nonconforming requests with the JSON error envelope and the
/// status of the [`ValidationError`](covenant_core::ValidationError):
/// 400 for malformed, uncoercible, or nonconforming requests.
pub struct RequestValidationMiddleware<R, V> {
    validation: Arc<ContractValidation<R, V>>,
}

impl<R, V> std::fmt::Debug for RequestValidationMiddleware<R, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestValidationMiddleware").finish_non_exhaustive()
    }
}

impl<R, V> RequestValidationMiddleware<R, V> {
    /// Creates a request validation stage.
    #[must_use]
    pub fn new(validation: Arc<ContractValidation<R, V>>) -> Self {
        Self { validation }
    }
}

impl<R, V> Middleware for RequestValidationMiddleware<R, V>
where
    R: OperationResolver + 'static,
    V: SchemaValidator + 'static,
{
    fn name(&self) -> &'static str {
        "request_validation"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let (parts, body) = request.into_parts();
            let bytes = collect(body).await;
            let raw = RawRequest::from_parts(&parts, bytes.clone());

            let outcome = {
                let exchange = self.validation.exchange(&parts.method, parts.uri.path());
                exchange
                    .matched()
                    .cloned()
                    .map(|matched| (matched, exchange.validate_request(ctx.env_mut(), &raw)))
            };

            let Some((matched, result)) = outcome else {
                debug!(
                    http.method = %parts.method,
                    http.path = %parts.uri.path(),
                    "no operation matched, passing through"
                );
                record_unmatched_request();
                return next.run(ctx, Request::from_parts(parts, Full::new(bytes))).await;
            };

            let operation_id = matched.operation_id().to_string();
            ctx.set_operation_id(operation_id.clone());
            ctx.set_extension(matched);
            record_validation(Phase::Request, &operation_id);

            if let Err(err) = result {
                warn!(
                    operation_id = %operation_id,
                    error.code = err.error_code(),
                    violations = err.violations().len(),
                    error = %err,
                    "request rejected"
                );
                record_validation_failure(Phase::Request, &operation_id, err.error_code());
                return Response::validation_error(&err);
            }

            next.run(ctx, Request::from_parts(parts, Full::new(bytes))).await
        })
    }
}

/// Response validation middleware.
///
/// The response body is drained, validated, and handed onward as a fresh
/// body over the buffered bytes. In observe-only mode a nonconforming
/// response is logged and sent unchanged; when enforcing it is replaced by a
/// 500 error envelope.
pub struct ResponseValidationMiddleware<R, V> {
    validation: Arc<ContractValidation<R, V>>,
    enforce: bool,
    strict: bool,
}

impl<R, V> std::fmt::Debug for ResponseValidationMiddleware<R, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseValidationMiddleware")
            .field("enforce", &self.enforce)
            .field("strict", &self.strict)
            .finish_non_exhaustive()
    }
}

impl<R, V> ResponseValidationMiddleware<R, V> {
    /// Creates a stage that only logs nonconforming responses.
    #[must_use]
    pub fn observe(validation: Arc<ContractValidation<R, V>>) -> Self {
        Self {
            validation,
            enforce: false,
            strict: false,
        }
    }

    /// Creates a stage that replaces nonconforming responses with a 500.
    #[must_use]
    pub fn enforcing(validation: Arc<ContractValidation<R, V>>) -> Self {
        Self {
            validation,
            enforce: true,
            strict: false,
        }
    }

    /// Requires exact status and media type declarations.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Returns `true` if nonconforming responses are replaced.
    #[must_use]
    pub fn is_enforcing(&self) -> bool {
        self.enforce
    }
}

impl<R, V> Middleware for ResponseValidationMiddleware<R, V>
where
    R: OperationResolver + 'static,
    V: SchemaValidator + 'static,
{
    fn name(&self) -> &'static str {
        "response_validation"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let matched = ctx
                .get_extension::<OperationMatch>()
                .cloned()
                .or_else(|| self.validation.resolve(request.method(), request.uri().path()));

            let response = next.run(ctx, request).await;

            let Some(matched) = matched else {
                return response;
            };
            let operation_id = matched.operation_id().to_string();

            let (parts, body) = response.into_parts();
            let buffer = match ResponseBuffer::drain(body).await {
                Ok(buffer) => buffer,
                Err(never) => match never {},
            };
            record_response_size(&operation_id, buffer.len());

            let result = self.validation.exchange_for(Some(matched)).validate_response(
                parts.status,
                &parts.headers,
                &buffer,
                self.strict,
            );
            record_validation(Phase::Response, &operation_id);

            let status = parts.status;
            let response = Response::from_parts(parts, buffer.to_body());

            match result {
                Ok(()) => response,
                Err(err) => {
                    warn!(
                        operation_id = %operation_id,
                        http.status_code = status.as_u16(),
                        error.code = err.error_code(),
                        violations = err.violations().len(),
                        enforce = self.enforce,
                        error = %err,
                        "response does not conform"
                    );
                    record_validation_failure(Phase::Response, &operation_id, err.error_code());
                    if self.enforce {
                        Response::validation_error(&err)
                    } else {
                        response
                    }
                }
            }
        })
    }
}

async fn collect(body: Full<Bytes>) -> Bytes {
    match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(never) => {
            let never: Infallible = never;
            match never {}
        }
    }
}
