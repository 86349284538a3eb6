//! End-to-end pipeline tests: URL in, formatted response out, no network.

use caravel::app::App;
use caravel::controller::{
    ActionContext, ActionTable, Attachment, Attachments, Controller,
};
use caravel::error::{ServerError, ServerResult};
use caravel::format::ResponseFormatter;
use caravel::http::request::Method;
use caravel::http::response::{Payload, Response};
use caravel::url::Url;
use caravel::{json, Value};

struct Widgets {
    actions: ActionTable,
    formatter: ResponseFormatter,
}

impl Widgets {
    fn new() -> Widgets {
        Widgets {
            actions: ActionTable::new()
                .get("index", |_ctx: &mut ActionContext| Ok(json!(["a", "b"])))
                .get("show", |ctx: &mut ActionContext| -> ServerResult<Value> {
                    // The calling convention: the routed URL rides first.
                    assert!(ctx.attachments.url().is_some());
                    Ok(json!({"id": 5}))
                })
                .action("detail", |_ctx: &mut ActionContext| {
                    Ok(json!({"detail": "via fallback"}))
                })
                .get("export", |_ctx: &mut ActionContext| {
                    Ok(json!({"widgets": [{"id": 1}, {"id": 2}]}))
                })
                .get("rows", |_ctx: &mut ActionContext| {
                    Ok(json!([{"a": 1, "b": "x,y"}, {"a": 2, "b": "z"}]))
                })
                .get("teapot", |_ctx: &mut ActionContext| -> ServerResult<Value> {
                    Err(ServerError::status(999, "not in the table"))
                }),
            formatter: ResponseFormatter::new(),
        }
    }
}

impl Controller for Widgets {
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

struct Main {
    actions: ActionTable,
    formatter: ResponseFormatter,
}

impl Main {
    fn new() -> Main {
        Main {
            actions: ActionTable::new()
                .get("index", |_ctx: &mut ActionContext| Ok(json!({"home": true})))
                .action("exception", |ctx: &mut ActionContext| {
                    let failure = ctx.attachments.failure();
                    Ok(json!({
                        "error": failure.map(|f| f.status).unwrap_or(500),
                        "message": failure.map(|f| f.message.clone()).unwrap_or_default(),
                    }))
                }),
            formatter: ResponseFormatter::new(),
        }
    }
}

impl Controller for Main {
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

struct Recorder {
    actions: ActionTable,
}

impl Recorder {
    fn new() -> Recorder {
        Recorder {
            actions: ActionTable::new().get("order", |ctx: &mut ActionContext| {
                let kinds: Vec<&str> = ctx
                    .attachments
                    .iter()
                    .map(|attachment| match attachment {
                        Attachment::Url(_) => "url",
                        Attachment::Data(_) => "data",
                        Attachment::Failure(_) => "failure",
                    })
                    .collect();
                Ok(json!(kinds).to_string())
            }),
        }
    }
}

impl Controller for Recorder {
    fn actions(&self) -> &ActionTable {
        &self.actions
    }
}

fn app() -> App {
    let mut app = App::new();
    app.register("main", Main::new());
    app.register("widgets", Widgets::new());
    app
}

#[test]
fn get_show_json_end_to_end() {
    let app = app();
    let url = Url::parse("http://host/Widgets/show.json");
    let response = app
        .response_for_url(&url, Method::GET, Vec::new())
        .expect("routes");
    assert_eq!(response.status(), 200);
    assert_eq!(response.header("Content-Type"), Some("application/json"));
    assert_eq!(response.body().to_string(), r#"{"id":5}"#);
}

#[test]
fn the_action_prefix_is_the_universal_fallback() {
    let app = app();
    let url = Url::parse("http://host/widgets/detail");
    for method in [Method::GET, Method::POST, Method::DELETE] {
        let response = app
            .response_for_url(&url, method, Vec::new())
            .expect("routes");
        assert_eq!(
            response.body().to_string(),
            r#"{"detail":"via fallback"}"#
        );
    }
}

#[test]
fn the_root_url_routes_to_the_default_controller_index() {
    let app = app();
    let url = Url::parse("http://host/");
    let response = app
        .response_for_url(&url, Method::GET, Vec::new())
        .expect("routes");
    assert_eq!(response.body().to_string(), r#"{"home":true}"#);
}

#[test]
fn an_identity_filter_exposes_the_routers_refusal_of_empty_paths() {
    let mut app = app();
    app.url_filter(|url: Url| url);
    let result = app.response_for_url(&Url::parse("http://host/"), Method::GET, Vec::new());
    assert!(matches!(result, Err(ServerError::NotFound)));
}

#[test]
fn unknown_controllers_and_unknown_actions_stay_distinguishable() {
    let app = app();
    let no_controller =
        app.response_for_url(&Url::parse("http://host/gadgets"), Method::GET, Vec::new());
    assert!(matches!(no_controller, Err(ServerError::NotFound)));

    let no_action = app.response_for_url(
        &Url::parse("http://host/widgets/missing"),
        Method::GET,
        Vec::new(),
    );
    assert!(matches!(no_action, Err(ServerError::RouteNotFound(_))));
}

#[test]
fn errors_are_rerouted_to_the_exception_action() {
    let app = app();
    let response = app.response_for_error(&ServerError::NotFound, Method::GET, None);
    assert_eq!(response.status(), 404);
    assert_eq!(response.header("Content-Type"), Some("application/json"));
    let body: Value = serde_json::from_str(&response.body().to_string()).expect("json body");
    assert_eq!(body["error"], json!(404));
}

#[test]
fn the_minimal_fallback_covers_a_failing_error_page() {
    // No `main` controller here, so the exception re-route itself 404s.
    let mut app = App::new();
    app.register("widgets", Widgets::new());
    let response = app.response_for_error(&ServerError::NotFound, Method::GET, None);
    assert_eq!(response.status(), 404);
    assert_eq!(response.header("Content-Type"), None);
    assert_eq!(response.body().to_string(), "Not found");
}

#[test]
fn out_of_table_statuses_surface_as_500() {
    let app = app();
    let url = Url::parse("http://host/widgets/teapot");
    let error = match app.response_for_url(&url, Method::GET, Vec::new()) {
        Err(error) => error,
        Ok(response) => panic!("expected an error, got status {}", response.status()),
    };
    let response = app.response_for_error(&error, Method::GET, None);
    assert_eq!(response.status(), 500);
    assert!(response.status_line().starts_with("HTTP/1.0 500"));
}

#[test]
fn a_shallow_controller_shadows_a_nested_one() {
    // First matching prefix wins; the nested registration is unreachable.
    let mut app = App::new();
    app.register("main", Main::new());
    app.register("admin", Widgets::new());
    app.register("admin/widgets", Main::new());

    let url = Url::parse("http://host/admin/show");
    let response = app
        .response_for_url(&url, Method::GET, Vec::new())
        .expect("routes");
    assert_eq!(response.body().to_string(), r#"{"id":5}"#);

    // `/admin/widgets` resolves `admin` with action `widgets`, which the
    // shallow controller cannot route.
    let nested = app.response_for_url(
        &Url::parse("http://host/admin/widgets"),
        Method::GET,
        Vec::new(),
    );
    assert!(matches!(nested, Err(ServerError::RouteNotFound(_))));
}

#[test]
fn xml_negotiation_singularizes_list_items() {
    let app = app();
    let url = Url::parse("http://host/widgets/export.xml");
    let response = app
        .response_for_url(&url, Method::GET, Vec::new())
        .expect("routes");
    assert_eq!(response.header("Content-Type"), Some("application/xml"));
    assert_eq!(
        response.body().to_string(),
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <widgets><widget><id>1</id></widget><widget><id>2</id></widget></widgets>"
    );
}

#[test]
fn csv_negotiation_quotes_only_what_needs_quoting() {
    let app = app();
    let url = Url::parse("http://host/widgets/rows.csv");
    let response = app
        .response_for_url(&url, Method::GET, Vec::new())
        .expect("routes");
    assert_eq!(response.header("Content-Type"), Some("text/csv"));
    assert_eq!(response.body().to_string(), "a,b\r\n1,\"x,y\"\r\n2,z");
}

#[test]
fn non_web_schemes_get_native_values_back() {
    let app = app();
    let url = Url::parse("task:/widgets/detail");
    let response = app
        .response_for_url(&url, Method::CLI, Vec::new())
        .expect("routes");
    assert_eq!(response.header("Content-Type"), None);
    assert_eq!(
        response.body(),
        &Payload::Data(json!({"detail": "via fallback"}))
    );
}

#[test]
fn attachments_arrive_in_calling_convention_order() {
    let mut app = App::new();
    app.register("recorder", Recorder::new());
    app.attach(Attachment::Data(json!("app-level")));

    let url = Url::parse("http://host/recorder/order");
    let response = app
        .response_for_url(
            &url,
            Method::GET,
            vec![Attachment::Data(json!("call-level"))],
        )
        .expect("routes");
    // URL first, then the call site's, then the app-level ones.
    assert_eq!(response.body().to_string(), r#"["url","data","data"]"#);
}
