//! Route registry, scope tree, and the built [`Service`].
//!
//! An [`App`] accumulates routes, nested scopes, middleware and state.
//! [`App::build`] flattens the tree exactly once into an immutable router
//! of per-route pipelines.
//!
//! ```rust
//! use kairos_server::App;
//! use kairos_extract::{PathParam, State};
//!
//! struct Greeting {
//!     word: &'static str,
//! }
//!
//! async fn hello(greeting: State<Greeting>, PathParam(name): PathParam<String>) -> String {
//!     format!("{}, {name}", greeting.word)
//! }
//!
//! # fn main() -> Result<(), kairos_server::RegistryError> {
//! let mut app = App::new();
//! app.use_state(Greeting { word: "hello" })?
//!     .nest("/api", |api| {
//!         api.get("/hello/{name}", hello)?;
//!         Ok(())
//!     })?;
//!
//! let service = app.build()?;
//! assert_eq!(service.router().len(), 1);
//! # Ok(())
//! # }
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::FutureExt;
use http::header::{HeaderValue, ALLOW};
use http::{Method, StatusCode};
use http_body::Body;
use kairos_core::{
    BoxError, ConnectionInfo, RequestContext, Response, ResponseExt, StateMap, StateStore,
};
use kairos_extract::{into_endpoint, DefaultErrorMapper, ErrorMapper, Handler};
use kairos_middleware::stages::catch_panic::{internal_error, panic_message};
use kairos_middleware::{BoxedMiddleware, Endpoint, Middleware, Pipeline};
use kairos_router::{CompiledPattern, MatchResult, Router, RouterBuilder};

use crate::error::RegistryError;

type EndpointFactory = Box<dyn FnOnce(Arc<dyn ErrorMapper>) -> Endpoint + Send>;

struct RouteDef {
    method: Method,
    pattern: CompiledPattern,
    middleware: Vec<BoxedMiddleware>,
    endpoint: EndpointFactory,
}

/// A node of the scope tree: a path prefix with its own routes, middleware,
/// state and child scopes.
///
/// Obtained inside [`App::nest`] or [`Scope::nest`].
pub struct Scope {
    prefix: CompiledPattern,
    routes: Vec<RouteDef>,
    middleware: Vec<BoxedMiddleware>,
    state: StateMap,
    children: Vec<Scope>,
}

impl Scope {
    fn new(prefix: CompiledPattern) -> Self {
        Self {
            prefix,
            routes: Vec::new(),
            middleware: Vec::new(),
            state: StateMap::new(),
            children: Vec::new(),
        }
    }

    /// The full prefix of this scope.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.prefix.as_str()
    }

    /// Registers a handler for `method` on `pattern`, relative to this scope.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Compile`] if the pattern, joined with the
    /// scope prefix, is invalid.
    pub fn route<H, Args>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: H,
    ) -> Result<&mut Self, RegistryError>
    where
        H: Handler<Args>,
        Args: 'static,
    {
        self.route_with(method, pattern, handler, Vec::new())
    }

    /// Registers a handler with route-level middleware, innermost last.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Compile`] if the pattern is invalid.
    pub fn route_with<H, Args>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: H,
        middleware: Vec<BoxedMiddleware>,
    ) -> Result<&mut Self, RegistryError>
    where
        H: Handler<Args>,
        Args: 'static,
    {
        let own = CompiledPattern::compile(pattern)?;
        let pattern = self.prefix.join(&own)?;
        tracing::debug!(method = %method, pattern = pattern.as_str(), "route registered");

        self.routes.push(RouteDef {
            method,
            pattern,
            middleware,
            endpoint: Box::new(move |errors| into_endpoint::<H, Args>(handler, errors)),
        });
        Ok(self)
    }

    /// Creates a child scope under `prefix` and configures it.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Compile`] for an invalid prefix, or any error
    /// returned by `configure`.
    pub fn nest<F>(&mut self, prefix: &str, configure: F) -> Result<&mut Self, RegistryError>
    where
        F: FnOnce(&mut Scope) -> Result<(), RegistryError>,
    {
        let own = CompiledPattern::compile(prefix)?;
        if own.has_wildcard() {
            return Err(RegistryError::Compile(kairos_router::CompileError::InvalidPattern {
                pattern: prefix.to_string(),
                reason: "a scope prefix cannot contain a wildcard".to_string(),
            }));
        }
        let mut child = Scope::new(self.prefix.join(&own)?);
        configure(&mut child)?;
        self.children.push(child);
        Ok(self)
    }

    /// Binds `value` for this scope and its descendants, shadowing any
    /// binding of the same type from enclosing scopes.
    ///
    /// # Errors
    ///
    /// Never fails on a scope; the signature matches [`App::use_state`].
    pub fn use_state<T: Send + Sync + 'static>(&mut self, value: T) -> Result<&mut Self, RegistryError> {
        self.state.insert(value);
        Ok(self)
    }

    /// Adds middleware wrapping every route of this scope and its descendants.
    ///
    /// # Errors
    ///
    /// Never fails on a scope; the signature matches [`App::use_middleware`].
    pub fn use_middleware<M: Middleware>(&mut self, middleware: M) -> Result<&mut Self, RegistryError> {
        self.middleware.push(Arc::new(middleware));
        Ok(self)
    }

    fn route_count(&self) -> usize {
        self.routes.len() + self.children.iter().map(Self::route_count).sum::<usize>()
    }

    fn flatten(
        self,
        parent_state: &StateStore,
        parent_middleware: &[BoxedMiddleware],
        errors: &Arc<dyn ErrorMapper>,
        router: &mut RouterBuilder<Arc<Route>>,
    ) -> Result<(), RegistryError> {
        let state = StateStore::layer(parent_state, &self.state);
        let mut middleware = parent_middleware.to_vec();
        middleware.extend(self.middleware);

        for def in self.routes {
            let mut chain = middleware.clone();
            chain.extend(def.middleware);
            let pipeline = Pipeline::new(chain, (def.endpoint)(Arc::clone(errors)));
            let route = Route {
                method: def.method.clone(),
                pattern: Arc::from(def.pattern.as_str()),
                pipeline,
                state: state.clone(),
            };
            router.insert(def.method, &def.pattern, Arc::new(route))?;
        }

        for child in self.children {
            child.flatten(&state, &middleware, errors, router)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("prefix", &self.prefix.as_str())
            .field("routes", &self.routes.len())
            .field("middleware", &self.middleware.len())
            .field("state", &self.state.len())
            .field("children", &self.children)
            .finish()
    }
}

macro_rules! method_shorthands {
    ($($(#[$doc:meta])* $name:ident => $method:expr;)*) => {
        $(
            $(#[$doc])*
            ///
            /// # Errors
            ///
            /// See [`route`](Self::route).
            pub fn $name<H, Args>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, RegistryError>
            where
                H: Handler<Args>,
                Args: 'static,
            {
                self.route($method, pattern, handler)
            }
        )*
    };
}

impl Scope {
    method_shorthands! {
        /// Registers a `GET` route.
        get => Method::GET;
        /// Registers a `POST` route.
        post => Method::POST;
        /// Registers a `PUT` route.
        put => Method::PUT;
        /// Registers a `PATCH` route.
        patch => Method::PATCH;
        /// Registers a `DELETE` route.
        delete => Method::DELETE;
        /// Registers a `HEAD` route.
        head => Method::HEAD;
        /// Registers an `OPTIONS` route.
        options => Method::OPTIONS;
    }
}

/// The application registry: the root scope plus global settings.
///
/// Middleware and state registered on the `App` itself are global.
pub struct App {
    root: Scope,
    errors: Arc<dyn ErrorMapper>,
    frozen: bool,
}

impl App {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Scope::new(CompiledPattern::root()),
            errors: Arc::new(DefaultErrorMapper),
            frozen: false,
        }
    }

    fn root(&mut self) -> Result<&mut Scope, RegistryError> {
        if self.frozen {
            return Err(RegistryError::Frozen);
        }
        Ok(&mut self.root)
    }

    /// Registers a handler for `method` on `pattern`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Frozen`] after [`build`](Self::build), or
    /// [`RegistryError::Compile`] for an invalid pattern.
    pub fn route<H, Args>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: H,
    ) -> Result<&mut Self, RegistryError>
    where
        H: Handler<Args>,
        Args: 'static,
    {
        self.root()?.route(method, pattern, handler)?;
        Ok(self)
    }

    /// Registers a handler with route-level middleware.
    ///
    /// # Errors
    ///
    /// As for [`route`](Self::route).
    pub fn route_with<H, Args>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: H,
        middleware: Vec<BoxedMiddleware>,
    ) -> Result<&mut Self, RegistryError>
    where
        H: Handler<Args>,
        Args: 'static,
    {
        self.root()?.route_with(method, pattern, handler, middleware)?;
        Ok(self)
    }

    /// Creates a scope under `prefix`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Frozen`] after build, or any error from the scope.
    pub fn nest<F>(&mut self, prefix: &str, configure: F) -> Result<&mut Self, RegistryError>
    where
        F: FnOnce(&mut Scope) -> Result<(), RegistryError>,
    {
        self.root()?.nest(prefix, configure)?;
        Ok(self)
    }

    /// Binds global state.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Frozen`] after build.
    pub fn use_state<T: Send + Sync + 'static>(&mut self, value: T) -> Result<&mut Self, RegistryError> {
        self.root()?.use_state(value)?;
        Ok(self)
    }

    /// Adds global middleware, outermost first.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Frozen`] after build.
    pub fn use_middleware<M: Middleware>(&mut self, middleware: M) -> Result<&mut Self, RegistryError> {
        self.root()?.use_middleware(middleware)?;
        Ok(self)
    }

    /// Replaces the renderer for extraction failures.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Frozen`] after build.
    pub fn error_mapper<M: ErrorMapper>(&mut self, mapper: M) -> Result<&mut Self, RegistryError> {
        self.root()?;
        self.errors = Arc::new(mapper);
        Ok(self)
    }

    /// Returns `true` once [`build`](Self::build) has been called.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Flattens the scope tree into an immutable [`Service`].
    ///
    /// The registry is frozen by the first call, whether or not it succeeds.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Frozen`] on any later call, or
    /// [`RegistryError::DuplicateRoute`] when two routes collide.
    pub fn build(&mut self) -> Result<Service, RegistryError> {
        let root = std::mem::replace(self.root()?, Scope::new(CompiledPattern::root()));
        self.frozen = true;

        let expected = root.route_count();
        let mut router = Router::builder();
        root.flatten(&StateStore::empty(), &[], &self.errors, &mut router)?;
        let router = router.build();

        tracing::info!(routes = expected, "route registry built");
        Ok(Service {
            inner: Arc::new(ServiceInner { router }),
        })
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("root", &self.root)
            .field("frozen", &self.frozen)
            .finish_non_exhaustive()
    }
}

impl App {
    method_shorthands! {
        /// Registers a global `GET` route.
        get => Method::GET;
        /// Registers a global `POST` route.
        post => Method::POST;
        /// Registers a global `PUT` route.
        put => Method::PUT;
        /// Registers a global `PATCH` route.
        patch => Method::PATCH;
        /// Registers a global `DELETE` route.
        delete => Method::DELETE;
        /// Registers a global `HEAD` route.
        head => Method::HEAD;
        /// Registers a global `OPTIONS` route.
        options => Method::OPTIONS;
    }
}

/// One entry of the built router.
pub struct Route {
    method: Method,
    pattern: Arc<str>,
    pipeline: Pipeline,
    state: StateStore,
}

impl Route {
    /// The route's method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The full pattern, e.g. `/api/users/{id}`.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The composed middleware chain and handler.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// State visible to this route.
    #[must_use]
    pub fn state(&self) -> &StateStore {
        &self.state
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("middleware", &self.pipeline.names())
            .finish_non_exhaustive()
    }
}

struct ServiceInner {
    router: Router<Arc<Route>>,
}

/// The built application: an immutable router of route pipelines.
///
/// Cheap to clone and safe to share across worker threads.
#[derive(Clone)]
pub struct Service {
    inner: Arc<ServiceInner>,
}

impl Service {
    /// The compiled router.
    #[must_use]
    pub fn router(&self) -> &Router<Arc<Route>> {
        &self.inner.router
    }

    /// Matches the request and runs the route's pipeline.
    ///
    /// Unmatched paths answer `404`, a wrong method `405` with `Allow`, and a
    /// panic anywhere in the pipeline `500`.
    pub async fn dispatch(&self, mut ctx: RequestContext) -> Response {
        let method = ctx.method().clone();
        let route = match self.inner.router.match_route(&method, ctx.path()) {
            MatchResult::Matched { route, params, .. } => {
                let route = Arc::clone(route);
                ctx.set_route(Arc::clone(&route.pattern), params);
                route
            }
            MatchResult::NotFound => {
                tracing::debug!(http.method = %method, http.path = ctx.path(), "no route matched");
                let message = format!("no route for {}", ctx.path());
                return Response::json_error(StatusCode::NOT_FOUND, "NOT_FOUND", &message);
            }
            MatchResult::MethodNotAllowed { allowed } => {
                return method_not_allowed(&method, &allowed);
            }
        };

        ctx.set_state(route.state.clone());
        let request_id = ctx.request_id();
        match AssertUnwindSafe(route.pipeline.run(ctx)).catch_unwind().await {
            Ok(response) => response,
            Err(payload) => {
                tracing::error!(
                    request_id = %request_id,
                    route = %route.pattern,
                    panic = panic_message(payload.as_ref()),
                    "request pipeline panicked"
                );
                internal_error()
            }
        }
    }

    /// Serves a request in-process, without a connection.
    pub async fn serve<B>(&self, request: http::Request<B>) -> Response
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        self.serve_with(request, ConnectionInfo::default()).await
    }

    /// Serves a request that arrived on the given connection.
    pub async fn serve_with<B>(&self, request: http::Request<B>, connection: ConnectionInfo) -> Response
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        self.dispatch(RequestContext::from_request(request, connection)).await
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("routes", &self.inner.router.len())
            .finish()
    }
}

fn method_not_allowed(method: &Method, allowed: &[Method]) -> Response {
    let list = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let message = format!("method {method} not allowed; allowed: {list}");
    let mut response = Response::json_error(StatusCode::METHOD_NOT_ALLOWED, "METHOD_NOT_ALLOWED", &message);
    if let Ok(value) = HeaderValue::from_str(&list) {
        response.headers_mut().insert(ALLOW, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::{BodyExt, Empty};
    use kairos_extract::State;

    async fn get(service: &Service, uri: &str) -> (StatusCode, String) {
        let request = http::Request::get(uri).body(Empty::<Bytes>::new()).unwrap();
        let response = service.serve(request).await;
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    async fn ok() -> &'static str {
        "ok"
    }

    #[tokio::test]
    async fn test_build_twice_is_frozen() {
        let mut app = App::new();
        app.get("/ping", ok).unwrap();

        let service = app.build().unwrap();
        assert!(matches!(app.build(), Err(RegistryError::Frozen)));
        assert!(matches!(app.get("/late", ok), Err(RegistryError::Frozen)));
        assert!(matches!(app.use_state(1_u8), Err(RegistryError::Frozen)));
        assert!(app.is_frozen());

        let (status, body) = get(&service, "/ping").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[derive(Debug)]
    struct Tag {
        name: &'static str,
    }

    async fn tag(tag: State<Tag>) -> String {
        tag.name.to_owned()
    }

    #[tokio::test]
    async fn test_sibling_scopes_have_isolated_state() {
        let mut app = App::new();
        app.use_state(Tag { name: "root" })
            .unwrap()
            .get("/", tag)
            .unwrap()
            .nest("/left", |scope| {
                scope.use_state(Tag { name: "left" })?.get("/", tag)?;
                scope.nest("/inner", |inner| {
                    inner.get("/", tag)?;
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap()
            .nest("/right", |scope| {
                scope.use_state(Tag { name: "right" })?.get("/", tag)?;
                Ok(())
            })
            .unwrap()
            .nest("/plain", |scope| {
                scope.get("/", tag)?;
                Ok(())
            })
            .unwrap();
        let service = app.build().unwrap();

        assert_eq!(get(&service, "/").await.1, "root");
        assert_eq!(get(&service, "/left").await.1, "left");
        assert_eq!(get(&service, "/left/inner").await.1, "left");
        assert_eq!(get(&service, "/right").await.1, "right");
        assert_eq!(get(&service, "/plain").await.1, "root");
    }

    #[tokio::test]
    async fn test_duplicate_route_fails_build() {
        async fn a() {}
        let mut app = App::new();
        app.get("/items/{id}", a)
            .unwrap()
            .nest("/items", |scope| {
                scope.get("/{item}", a)?;
                Ok(())
            })
            .unwrap();
        assert!(matches!(app.build(), Err(RegistryError::DuplicateRoute { .. })));
    }

    #[test]
    fn test_invalid_patterns() {
        let mut app = App::new();
        assert!(matches!(app.get("/a/*/b", ok), Err(RegistryError::Compile(_))));
        assert!(matches!(
            app.nest("/files/*", |_| Ok(())),
            Err(RegistryError::Compile(_))
        ));
        assert!(matches!(
            app.nest("/users/{id}", |scope| {
                scope.get("/{id}", ok)?;
                Ok(())
            }),
            Err(RegistryError::Compile(_))
        ));
    }

    #[tokio::test]
    async fn test_not_found_and_method_not_allowed() {
        async fn create() -> StatusCode {
            StatusCode::CREATED
        }
        let mut app = App::new();
        app.post("/orders", create).unwrap();
        let service = app.build().unwrap();

        let request = http::Request::get("/orders").body(Empty::<Bytes>::new()).unwrap();
        let response = service.serve(request).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(ALLOW).unwrap(), "POST");

        let (status, body) = get(&service, "/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("NOT_FOUND"));
    }

    #[tokio::test]
    async fn test_panicking_handler_is_isolated() {
        async fn boom() -> &'static str {
            panic!("handler exploded")
        }
        let mut app = App::new();
        app.get("/boom", boom).unwrap().get("/ok", ok).unwrap();
        let service = app.build().unwrap();

        let (status, body) = get(&service, "/boom").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains("exploded"));
        assert_eq!(get(&service, "/ok").await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_route_pattern_recorded() {
        async fn pattern(uri: http::Uri) -> String {
            uri.path().to_string()
        }
        let mut app = App::new();
        app.nest("/api", |api| {
            api.get("/users/{id}", pattern)?;
            Ok(())
        })
        .unwrap();
        let service = app.build().unwrap();

        let routes = service.router().routes();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].1, "/api/users/{id}");
        assert_eq!(get(&service, "/api/users/7").await.1, "/api/users/7");
    }
}
