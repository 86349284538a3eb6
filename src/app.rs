//! `App` is the delegate at the root of the framework.
//!
//! It owns the controller registry, rewrites incoming URLs before routing,
//! drives the router/dispatcher/formatter pipeline for each request, and
//! recovers from failures by re-routing them as `exception:/{code}` URLs so
//! error pages are ordinary controller actions.
//!
//! # Examples
//!
//! ```rust,no_run
//! use caravel::app::App;
//! use caravel::controller::{ActionContext, ActionTable, Controller};
//! use caravel::json;
//!
//! struct MainController {
//!     actions: ActionTable,
//! }
//!
//! impl Controller for MainController {
//!     fn actions(&self) -> &ActionTable {
//!         &self.actions
//!     }
//! }
//!
//! let mut app = App::new();
//! app.register(
//!     "main",
//!     MainController {
//!         actions: ActionTable::new()
//!             .get("index", |_ctx: &mut ActionContext| Ok(json!({ "message": "Hello!" }))),
//!     },
//! );
//! app.listen("127.0.0.1:3000").unwrap();
//! ```

use crate::controller::{Attachment, Attachments, Controller, Failure};
use crate::dispatcher;
use crate::error::{ServerError, ServerResult};
use crate::http::request::{Body, Method, Request};
use crate::http::response::{Payload, Response};
use crate::registry::ControllerRegistry;
use crate::router::Router;
use crate::url::{Url, UrlPath};
use futures::FutureExt;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader as StdBufReader;
use std::io::{Error, ErrorKind};
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};

type UrlFilter = Arc<dyn Fn(Url) -> Url + Send + Sync>;

/// TLS configuration for HTTPS support
pub struct TlsConfig {
    cert_file: PathBuf,
    key_file: PathBuf,
}

impl TlsConfig {
    pub fn new<P: AsRef<Path>>(cert_file: P, key_file: P) -> Self {
        Self {
            cert_file: cert_file.as_ref().to_path_buf(),
            key_file: key_file.as_ref().to_path_buf(),
        }
    }

    fn load_certs(&self) -> Result<Vec<CertificateDer<'static>>, Box<dyn std::error::Error>> {
        let cert_file = File::open(&self.cert_file)?;
        let mut reader = StdBufReader::new(cert_file);
        let certs = rustls_pemfile::certs(&mut reader)
            .filter_map(|result| result.ok())
            .collect();
        Ok(certs)
    }

    fn load_key(&self) -> Result<PrivateKeyDer<'static>, Box<dyn std::error::Error>> {
        let key_file = File::open(&self.key_file)?;
        let mut reader = StdBufReader::new(key_file);
        let key = rustls_pemfile::private_key(&mut reader)?.ok_or("No private key found")?;
        Ok(key)
    }
}

/// The application delegate: registry, URL filtering, dispatch pipeline and
/// the HTTP transport.
#[derive(Clone)]
pub struct App {
    pub max_connections: usize,
    pub keep_alive: Duration,
    registry: ControllerRegistry,
    default_controller: String,
    attachments: Vec<Attachment>,
    url_filter: Option<UrlFilter>,
    tls_config: Option<Arc<TlsConfig>>,
}

impl App {
    pub fn new() -> Self {
        Self {
            max_connections: 256,
            keep_alive: Duration::from_secs(5),
            registry: ControllerRegistry::new(),
            default_controller: "main".to_string(),
            attachments: Vec::new(),
            url_filter: None,
            tls_config: None,
        }
    }

    pub fn max_connections(&mut self, max_connections: usize) -> &mut Self {
        self.max_connections = max_connections;
        self
    }

    pub fn keep_alive(&mut self, keep_alive: Duration) -> &mut Self {
        self.keep_alive = keep_alive;
        self
    }

    /// The controller the default URL filter substitutes for the root URL
    /// and for exception URLs. Defaults to `main`.
    pub fn default_controller(&mut self, name: &str) -> &mut Self {
        self.default_controller = name.to_lowercase();
        self
    }

    /// Register a controller under a namespace path (e.g. `widgets` or
    /// `admin/widgets`).
    pub fn register<C>(&mut self, name: &str, controller: C) -> &mut Self
    where
        C: Controller + 'static,
    {
        self.registry.register(name, controller);
        self
    }

    pub fn registry(&self) -> &ControllerRegistry {
        &self.registry
    }

    /// Attach a value delivered to every routed action, after the per-call
    /// attachments.
    pub fn attach(&mut self, attachment: Attachment) -> &mut Self {
        self.attachments.push(attachment);
        self
    }

    /// Replace the default URL filter with a custom one.
    pub fn url_filter<F>(&mut self, filter: F) -> &mut Self
    where
        F: Fn(Url) -> Url + Send + Sync + 'static,
    {
        self.url_filter = Some(Arc::new(filter));
        self
    }

    /// Configure TLS for HTTPS support
    pub fn with_tls<P: AsRef<Path>>(&mut self, cert_file: P, key_file: P) -> &mut Self {
        self.tls_config = Some(Arc::new(TlsConfig::new(cert_file, key_file)));
        self
    }

    /// Pre-routing URL rewriting. The default filter routes the home page
    /// (no path components) to the default controller, and bare exception
    /// URLs to the default controller's `exception` action; everything else
    /// passes through untouched.
    fn filter_url(&self, url: Url) -> Url {
        if let Some(filter) = &self.url_filter {
            return filter(url);
        }
        let mut url = url;
        let components = url.path().components().len();
        if components == 0 {
            url.set_path(UrlPath::new(&format!("/{}", self.default_controller)));
        } else if url.scheme() == "exception" && components == 1 {
            url.set_path(UrlPath::new(&format!(
                "/{}/exception",
                self.default_controller
            )));
        }
        url
    }

    /// Generate a response for a URL by routing it to a controller action.
    pub fn response_for_url(
        &self,
        url: &Url,
        method: Method,
        attachments: Vec<Attachment>,
    ) -> ServerResult<Response> {
        self.route_url(url, method, None, attachments)
    }

    /// Generate a response for a parsed request.
    pub fn response_for_request(&self, request: &Request) -> ServerResult<Response> {
        self.route_url(&request.url, request.method, Some(request), Vec::new())
    }

    fn route_url(
        &self,
        url: &Url,
        method: Method,
        request: Option<&Request>,
        extra: Vec<Attachment>,
    ) -> ServerResult<Response> {
        // The routed URL is always the first attachment, then the call
        // site's, then the app-level ones.
        let mut attachments = Attachments::new();
        attachments.push(Attachment::Url(url.clone()));
        for attachment in extra {
            attachments.push(attachment);
        }
        for attachment in &self.attachments {
            attachments.push(attachment.clone());
        }

        let filtered = self.filter_url(url.clone());
        let path = filtered.path().without_extension();
        debug!(path = %path, method = ?method, "routing");

        let route = Router::new(&self.registry).resolve(&path)?;
        let action = route
            .remaining
            .first()
            .cloned()
            .unwrap_or_else(|| "index".to_string());
        if !dispatcher::can_route(route.controller.as_ref(), &action, method) {
            warn!(controller = %route.name, action = %action, "no routable action");
            return Err(ServerError::RouteNotFound(action));
        }
        dispatcher::dispatch(
            route.controller.as_ref(),
            &action,
            method,
            url,
            request,
            &attachments,
        )
    }

    /// Generate a response for a failure by re-routing it as an
    /// `exception:/{code}` URL, so error pages are ordinary controller
    /// actions. The original error's status always wins over whatever the
    /// error page set. When the re-route itself fails, a minimal fallback
    /// response (status plus stringified error, no content negotiation) is
    /// the guaranteed last resort.
    pub fn response_for_error(
        &self,
        error: &ServerError,
        method: Method,
        request: Option<&Request>,
    ) -> Response {
        let status = error.status_code();
        let url = Url::parse(&format!("exception:/{}", status));
        let attachments = vec![Attachment::Failure(Failure {
            status,
            message: error.to_string(),
        })];
        match self.route_url(&url, method, request, attachments) {
            Ok(mut response) => {
                response.set_status(status);
                response
            }
            Err(inner) => {
                warn!(error = %inner, "error page routing failed, using the minimal fallback");
                let mut response = Response::new();
                response.set_status(status);
                response.set_body(Payload::Text(error.to_string()));
                response
            }
        }
    }

    /// Run the full pipeline for a request, containing panics and turning
    /// every failure into a routed error page.
    pub async fn respond(&self, request: &Request) -> Response {
        let outcome = AssertUnwindSafe(async { self.response_for_request(request) })
            .catch_unwind()
            .await;
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = if let Some(text) = panic.downcast_ref::<&str>() {
                    text.to_string()
                } else if let Some(text) = panic.downcast_ref::<String>() {
                    text.clone()
                } else {
                    "Unknown panic".to_string()
                };
                error!(message = %message, "action panicked");
                Err(ServerError::PanicError(message))
            }
        };
        match outcome {
            Ok(response) => response,
            Err(err) => self.response_for_error(&err, request.method, Some(request)),
        }
    }

    /// Starts the HTTP server
    ///
    /// # Arguments
    /// * `addr` - Address to listen on (e.g. "127.0.0.1:3000")
    pub fn listen(self, addr: &str) -> Result<(), Box<dyn std::error::Error>> {
        let runtime = Runtime::new()?;
        runtime.block_on(async {
            let listener = TcpListener::bind(addr).await?;
            let connection_counter = Arc::new(AtomicUsize::new(0));

            info!(
                addr = %addr,
                scheme = if self.tls_config.is_some() { "https" } else { "http" },
                controllers = self.registry.len(),
                "server listening"
            );

            let tls_acceptor = if let Some(tls_config) = &self.tls_config {
                let certs = tls_config.load_certs()?;
                let key = tls_config.load_key()?;
                let config = ServerConfig::builder()
                    .with_no_client_auth()
                    .with_single_cert(certs, key)?;
                Some(TlsAcceptor::from(Arc::new(config)))
            } else {
                None
            };

            loop {
                let counter = Arc::clone(&connection_counter);
                if counter.load(Ordering::Relaxed) >= self.max_connections {
                    warn!("max connections reached");
                    continue;
                }

                match listener.accept().await {
                    Ok((stream, _)) => {
                        counter.fetch_add(1, Ordering::Relaxed);
                        let app = self.clone();
                        let counter = Arc::clone(&counter);
                        let acceptor = tls_acceptor.clone();

                        tokio::spawn(async move {
                            let result = if let Some(acceptor) = acceptor {
                                match acceptor.accept(stream).await {
                                    Ok(tls_stream) => {
                                        app.handle_connection(tls_stream, "https").await
                                    }
                                    Err(e) => {
                                        warn!(error = %e, "TLS handshake failed");
                                        Ok(())
                                    }
                                }
                            } else {
                                app.handle_connection(stream, "http").await
                            };

                            if let Err(e) = result {
                                warn!(error = %e, "connection error");
                            }
                            counter.fetch_sub(1, Ordering::Relaxed);
                        });
                    }
                    Err(e) => warn!(error = %e, "connection failed"),
                }
            }
        })
    }

    async fn handle_connection<S>(&self, mut stream: S, scheme: &str) -> Result<(), Error>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut buf_reader = BufReader::new(&mut stream);
        let mut request_line = String::new();
        buf_reader.read_line(&mut request_line).await?;

        if request_line.is_empty() {
            return Ok(());
        }

        // Parse the request line
        let mut parts = request_line.trim().split_whitespace();
        let method = parts
            .next()
            .ok_or_else(|| Error::new(ErrorKind::InvalidData, "Invalid request line"))?
            .to_string();
        let target = parts
            .next()
            .ok_or_else(|| Error::new(ErrorKind::InvalidData, "Invalid request line"))?
            .to_string();

        // Parse headers
        let mut headers = HashMap::new();
        loop {
            let mut line = String::new();
            buf_reader.read_line(&mut line).await?;

            if line.trim().is_empty() {
                break;
            }

            if let Some((key, value)) = line.trim().split_once(':') {
                headers.insert(key.trim().to_lowercase(), value.trim().to_string());
            }
        }

        // Read body if Content-Length is present
        let mut body = Vec::new();
        let content_type = headers.get("content-type").cloned().unwrap_or_default();
        if let Some(content_length) = headers.get("content-length") {
            if let Ok(length) = content_length.parse::<usize>() {
                body.reserve(length);
                let mut take = buf_reader.take(length as u64);
                take.read_to_end(&mut body).await?;
            }
        }

        let url = self.url_for_target(scheme, headers.get("host").map(String::as_str), &target);
        let request = Request {
            method: Method::from_string(&method),
            url,
            headers,
            body: Body::with_content_type(content_type, body),
        };

        let response = self.respond(&request).await;
        info!(
            method = ?request.method,
            path = %request.url.path(),
            status = response.status(),
            "request handled"
        );

        let mut wire = response.status_line();
        wire.push_str("\r\n");
        wire += &format!("Date: {}\r\n", httpdate::fmt_http_date(SystemTime::now()));
        for (name, value) in response.headers() {
            wire += &format!("{}: {}\r\n", name, value);
        }
        let contents = response.body().to_string();
        wire += &format!("Content-Length: {}\r\n\r\n{}", contents.len(), contents);
        stream.write_all(wire.as_bytes()).await?;
        Ok(())
    }

    fn url_for_target(&self, scheme: &str, host: Option<&str>, target: &str) -> Url {
        let (path_part, query_part) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };
        let path_part = path_part.trim_end_matches('/');
        let path_part = if path_part.is_empty() { "/" } else { path_part };
        let rebuilt = match query_part {
            Some(query) => format!("{}?{}", path_part, query),
            None => path_part.to_string(),
        };
        match host {
            Some(host) => Url::parse(&format!("{}://{}{}", scheme, host, rebuilt)),
            None => Url::parse(&rebuilt),
        }
    }
}

impl Default for App {
    fn default() -> Self {
        App::new()
    }
}
