//! Hello world example for Caravel
//!
//! Demonstrates the smallest possible app: one controller, one index
//! action, default stringify formatting.

use caravel::app::App;
use caravel::controller::{ActionContext, ActionTable, Controller};
use caravel::json;

struct MainController {
    actions: ActionTable,
}

impl MainController {
    fn new() -> Self {
        Self {
            actions: ActionTable::new()
                .get("index", |_ctx: &mut ActionContext| {
                    Ok("Welcome to the Caravel demo server!")
                })
                .get("greet", |ctx: &mut ActionContext| {
                    let name = ctx.url.query_value("name").unwrap_or("world");
                    Ok(format!("Hello, {}!", name))
                })
                .action("exception", |ctx: &mut ActionContext| {
                    let status = ctx
                        .attachments
                        .failure()
                        .map(|failure| failure.status)
                        .unwrap_or(500);
                    Ok(json!({ "error": status }).to_string())
                }),
        }
    }
}

impl Controller for MainController {
    fn actions(&self) -> &ActionTable {
        &self.actions
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let mut app = App::new();
    app.register("main", MainController::new());

    // http://127.0.0.1:3000/          -> index
    // http://127.0.0.1:3000/main/greet?name=sam
    // http://127.0.0.1:3000/nowhere   -> routed 404 page
    app.listen("127.0.0.1:3000").expect("Server failed to start")
}
