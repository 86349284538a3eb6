//! REST API example for Caravel
//!
//! Demonstrates content negotiation: the same widget data served as JSON,
//! XML or CSV depending on the URL extension, plus an error page routed as
//! a controller action.
//!
//!     GET /widgets            -> JSON (the configured default)
//!     GET /widgets.xml        -> XML, with singularized item elements
//!     GET /widgets.csv        -> CSV
//!     GET /widgets/show?id=2  -> one widget as JSON
//!     GET /missing            -> routed 404 page

use caravel::app::App;
use caravel::controller::{ActionContext, ActionTable, Attachments, Controller};
use caravel::error::{ServerError, ServerResult};
use caravel::format::ResponseFormatter;
use caravel::http::response::{Payload, Response};
use caravel::{json, Value};
use serde::Serialize;

#[derive(Serialize, Clone)]
struct Widget {
    id: u32,
    name: String,
    price: f64,
}

fn catalog() -> Vec<Widget> {
    vec![
        Widget {
            id: 1,
            name: "sprocket".to_string(),
            price: 9.5,
        },
        Widget {
            id: 2,
            name: "flange, large".to_string(),
            price: 12.0,
        },
    ]
}

struct WidgetsController {
    actions: ActionTable,
    formatter: ResponseFormatter,
}

impl WidgetsController {
    fn new() -> Self {
        Self {
            actions: ActionTable::new()
                .get("index", |_ctx: &mut ActionContext| {
                    let widgets = serde_json::to_value(catalog())
                        .map_err(|e| ServerError::InternalError(e.to_string()))?;
                    Ok(json!({ "widgets": widgets }))
                })
                .get("show", |ctx: &mut ActionContext| -> ServerResult<Value> {
                    let id: u32 = ctx
                        .url
                        .query_value("id")
                        .and_then(|raw| raw.parse().ok())
                        .unwrap_or(1);
                    let widget = catalog()
                        .into_iter()
                        .find(|widget| widget.id == id)
                        .ok_or_else(|| ServerError::status(404, "no such widget"))?;
                    serde_json::to_value(widget)
                        .map_err(|e| ServerError::InternalError(e.to_string()))
                }),
            formatter: ResponseFormatter::new(),
        }
    }
}

impl Controller for WidgetsController {
    fn actions(&self) -> &ActionTable {
        &self.actions
    }

    fn format_body(
        &self,
        body: Payload,
        attachments: &Attachments,
        response: &mut Response,
    ) -> ServerResult<Payload> {
        self.formatter.format_body(body, attachments, response)
    }
}

struct MainController {
    actions: ActionTable,
    formatter: ResponseFormatter,
}

impl MainController {
    fn new() -> Self {
        Self {
            actions: ActionTable::new()
                .get("index", |_ctx: &mut ActionContext| {
                    Ok(json!({ "endpoints": ["/widgets", "/widgets.xml", "/widgets.csv"] }))
                })
                .action("exception", |ctx: &mut ActionContext| {
                    let (status, message) = match ctx.attachments.failure() {
                        Some(failure) => (failure.status, failure.message.clone()),
                        None => (500, "unknown error".to_string()),
                    };
                    Ok(json!({ "error": { "status": status, "message": message } }))
                }),
            formatter: ResponseFormatter::new(),
        }
    }
}

impl Controller for MainController {
    fn actions(&self) -> &ActionTable {
        &self.actions
    }

    fn format_body(
        &self,
        body: Payload,
        attachments: &Attachments,
        response: &mut Response,
    ) -> ServerResult<Payload> {
        self.formatter.format_body(body, attachments, response)
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let mut app = App::new();
    app.register("main", MainController::new());
    app.register("widgets", WidgetsController::new());

    app.listen("127.0.0.1:3000").expect("Server failed to start")
}
