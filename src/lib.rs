//! # Caravel
//!
//! A convention-over-configuration controller framework for Rust.
//!
//! Incoming URLs are routed by walking their path components against a
//! registry of controllers, the action method is picked by the verb-prefix
//! convention (`getShow` before `actionShow` for a GET request to `show`),
//! and return values are rendered to JSON, XML or CSV from the URL's file
//! extension.
//!
//! ## Features
//!
//! - Namespace-walk routing with case-insensitive controller lookup
//! - Verb-prefixed action tables built at registration time
//! - Content negotiation from the URL extension (JSON/XML/CSV/native)
//! - Error pages routed as ordinary controller actions (`exception:/{code}`)
//! - Async/await HTTP transport with optional TLS
//!
//! ## Quick Start
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
//! impl MainController {
//!     fn new() -> Self {
//!         Self {
//!             actions: ActionTable::new()
//!                 .get("index", |_ctx: &mut ActionContext| Ok(json!({ "message": "Hello!" }))),
//!         }
//!     }
//! }
//!
//! impl Controller for MainController {
//!     fn actions(&self) -> &ActionTable {
//!         &self.actions
//!     }
//! }
//!
//! fn main() {
//!     let mut app = App::new();
//!     app.register("main", MainController::new());
//!     app.listen("127.0.0.1:3000").unwrap();
//! }
//! ```

pub mod app;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod format;
pub mod http;
pub mod registry;
pub mod router;
pub mod url;
pub extern crate serde_json;

// Reexport serde_json
pub use serde_json::{json, Value};

pub use app::App;
pub use controller::{
    ActionContext, ActionTable, Attachment, Attachments, Controller, Failure, IntoPayload,
};
pub use error::{ServerError, ServerResult};
pub use format::{Format, ResponseFormatter};
pub use http::request::{Body, Method, Request};
pub use http::response::{Payload, Response};
pub use registry::ControllerRegistry;
pub use router::{ResolvedRoute, Router};
pub use url::{Url, UrlPath};
