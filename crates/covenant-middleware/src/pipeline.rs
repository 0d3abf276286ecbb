//! Ordered middleware pipeline.
//!
//! A [`Pipeline`] runs its stages in insertion order around a handler. The
//! order is fixed once the pipeline is built.

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response};
use std::sync::Arc;

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// An immutable, ordered chain of middleware stages.
///
/// # Example
///
/// ```ignore
/// use covenant_middleware::Pipeline;
///
/// let pipeline = Pipeline::builder()
///     .stage(RequestValidationMiddleware::new(validation.clone()))
///     .stage(ResponseValidationMiddleware::observe(validation))
///     .build();
///
/// let response = pipeline.process(MiddlewareContext::new(), request, handler).await;
/// ```
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Processes a request through every stage, then the handler.
    ///
    /// Returns the response together with the context, so callers can read
    /// what the stages stored in it.
    pub async fn process<H>(
        &self,
        mut ctx: MiddlewareContext,
        request: Request,
        handler: H,
    ) -> (Response, MiddlewareContext)
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'static,
    {
        let next = self.build_chain(handler);
        let response = next.run(&mut ctx, request).await;
        (response, ctx)
    }

    fn build_chain<'a, H>(&'a self, handler: H) -> Next<'a>
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        let mut next = Next::handler(handler);
        for middleware in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|mw| mw.name()).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Appends a stage.
    #[must_use]
    pub fn stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Appends an already shared stage.
    #[must_use]
    pub fn shared_stage(mut self, middleware: BoxedMiddleware) -> Self {
        self.stages.push(middleware);
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;
    use std::sync::Mutex;

    struct OrderTracking {
        name: &'static str,
        order: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Middleware for OrderTracking {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut MiddlewareContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, Response> {
            Box::pin(async move {
                self.order.lock().unwrap().push(self.name);
                next.run(ctx, request).await
            })
        }
    }

    struct ShortCircuit;

    impl Middleware for ShortCircuit {
        fn name(&self) -> &'static str {
            "short_circuit"
        }

        fn process<'a>(
            &'a self,
            _ctx: &'a mut MiddlewareContext,
            _request: Request,
            _next: Next<'a>,
        ) -> BoxFuture<'a, Response> {
            Box::pin(async move {
                http::Response::builder()
                    .status(StatusCode::FORBIDDEN)
                    .body(Full::new(Bytes::new()))
                    .unwrap()
            })
        }
    }

    fn request() -> Request {
        http::Request::builder()
            .uri("/pets")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn ok(_ctx: &mut MiddlewareContext, _req: Request) -> BoxFuture<'static, Response> {
        Box::pin(async {
            http::Response::builder()
                .status(StatusCode::OK)
                .body(Full::new(Bytes::from("OK")))
                .unwrap()
        })
    }

    #[tokio::test]
    async fn test_pipeline_executes_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::builder()
            .stage(OrderTracking {
                name: "first",
                order: order.clone(),
            })
            .stage(OrderTracking {
                name: "second",
                order: order.clone(),
            })
            .build();

        assert_eq!(pipeline.stage_names(), vec!["first", "second"]);

        let (response, _ctx) = pipeline.process(MiddlewareContext::new(), request(), ok).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_short_circuit_skips_handler_and_later_stages() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::builder()
            .stage(ShortCircuit)
            .stage(OrderTracking {
                name: "never",
                order: order.clone(),
            })
            .build();

        let (response, _ctx) = pipeline.process(MiddlewareContext::new(), request(), ok).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(order.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_pipeline_runs_handler() {
        let pipeline = Pipeline::builder().build();
        assert_eq!(pipeline.stage_count(), 0);

        let (response, _ctx) = pipeline.process(MiddlewareContext::new(), request(), ok).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
