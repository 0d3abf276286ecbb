//! Middleware context types.
//!
//! The [`MiddlewareContext`] carries state through the middleware chain: the
//! [`RequestEnv`] the orchestrator writes validated parameters into, the
//! matched operation, and typed extensions.

use covenant_core::{ParameterSet, RequestEnv};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::Instant;

/// Context that flows through the middleware chain.
///
/// # Example
///
/// ```
/// use covenant_middleware::MiddlewareContext;
///
/// let mut ctx = MiddlewareContext::new();
/// ctx.set_operation_id("getPet".to_string());
///
/// assert_eq!(ctx.operation_id(), Some("getPet"));
/// assert!(ctx.env().native_query().is_none());
/// ```
#[derive(Debug)]
pub struct MiddlewareContext {
    /// Slots written by request validation and read by handlers.
    env: RequestEnv,

    /// The resolved operation ID from the contract.
    operation_id: Option<String>,

    /// When the request started processing.
    started_at: Instant,

    /// Type-erased extension data.
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl MiddlewareContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::with_env(RequestEnv::new())
    }

    /// Creates a context around an existing request environment.
    #[must_use]
    pub fn with_env(env: RequestEnv) -> Self {
        Self {
            env,
            operation_id: None,
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// Creates a context carrying the framework's native query hash.
    #[must_use]
    pub fn with_native_query(native_query: ParameterSet) -> Self {
        Self::with_env(RequestEnv::with_native_query(native_query))
    }

    /// Returns the request environment.
    #[must_use]
    pub fn env(&self) -> &RequestEnv {
        &self.env
    }

    /// Returns the request environment mutably.
    pub fn env_mut(&mut self) -> &mut RequestEnv {
        &mut self.env
    }

    /// Consumes the context and returns the request environment.
    #[must_use]
    pub fn into_env(self) -> RequestEnv {
        self.env
    }

    /// Returns the operation ID, if resolved.
    #[must_use]
    pub fn operation_id(&self) -> Option<&str> {
        self.operation_id.as_deref()
    }

    /// Sets the operation ID.
    ///
    /// This is set after routing resolves the path to an operation.
    pub fn set_operation_id(&mut self, operation_id: String) {
        self.operation_id = Some(operation_id);
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Stores a typed extension value.
    ///
    /// # Example
    ///
    /// ```
    /// use covenant_middleware::MiddlewareContext;
    ///
    /// #[derive(Clone)]
    /// struct TenantId(String);
    ///
    /// let mut ctx = MiddlewareContext::new();
    /// ctx.set_extension(TenantId("acme".to_string()));
    ///
    /// let tenant = ctx.get_extension::<TenantId>().unwrap();
    /// assert_eq!(tenant.0, "acme");
    /// ```
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Checks if an extension of the given type exists.
    #[must_use]
    pub fn has_extension<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }
}

impl Default for MiddlewareContext {
    fn default() -> Self {
        Self::new()
    }
}
