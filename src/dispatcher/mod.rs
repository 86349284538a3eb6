//! Verb-prefix action dispatch.
//!
//! Given a resolved controller and an action name, the dispatcher tries the
//! request method's prefix first and the universal `action` prefix second,
//! invokes the first match with a fresh response, and runs the controller's
//! formatting hook over the raw return value. Errors raised inside an
//! action propagate to the caller unmodified.

use crate::controller::{ActionContext, ActionFn, Attachments, Controller};
use crate::error::{ServerError, ServerResult};
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::url::Url;
use tracing::{debug, info};

/// Prefix tried after the request method's own.
const FALLBACK_PREFIX: &str = "action";

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn resolve(
    controller: &dyn Controller,
    action: &str,
    method: Method,
) -> Option<(String, ActionFn)> {
    for prefix in [method.prefix(), FALLBACK_PREFIX] {
        if let Some(handler) = controller.actions().lookup(prefix, action) {
            return Some((format!("{}{}", prefix, capitalize(action)), handler.clone()));
        }
    }
    None
}

/// Pure predicate form of dispatch resolution. When this returns `true`,
/// [`dispatch`] with the same arguments cannot fail with `RouteNotFound`.
pub fn can_route(controller: &dyn Controller, action: &str, method: Method) -> bool {
    resolve(controller, action, method).is_some()
}

/// Find and invoke the action method for `action`, producing a response.
///
/// The resolved method name (e.g. `getShow`) is passed to the
/// `will_handle_url`/`did_handle_url` hooks. A fresh [`Response`] is built
/// for every call, so nothing leaks between dispatches even when the same
/// controller instance serves them all.
pub fn dispatch(
    controller: &dyn Controller,
    action: &str,
    method: Method,
    url: &Url,
    request: Option<&Request>,
    attachments: &Attachments,
) -> ServerResult<Response> {
    let (method_name, handler) = resolve(controller, action, method)
        .ok_or_else(|| ServerError::RouteNotFound(action.to_string()))?;
    debug!(action = %action, method_name = %method_name, "action resolved");

    controller.will_handle_url(url, &method_name);

    let mut response = Response::new();
    let body = {
        let mut ctx = ActionContext {
            url,
            method,
            request,
            attachments,
            response: &mut response,
        };
        handler(&mut ctx)?
    };

    let formatted = controller.format_body(body, attachments, &mut response)?;
    response.set_body(formatted);

    controller.did_handle_url(url, &method_name, &mut response);
    info!(method_name = %method_name, status = response.status(), "action handled");
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ActionTable;
    use crate::http::response::Payload;
    use serde_json::json;
    use std::sync::Mutex;

    struct Widgets {
        actions: ActionTable,
        calls: Mutex<Vec<String>>,
    }

    impl Widgets {
        fn new() -> Widgets {
            Widgets {
                actions: ActionTable::new()
                    .get("widgets", |_ctx: &mut ActionContext| Ok(json!("via get")))
                    .action("widgets", |_ctx: &mut ActionContext| Ok(json!("via action")))
                    .action("show", |_ctx: &mut ActionContext| Ok(json!({"id": 5})))
                    .get("create", |ctx: &mut ActionContext| {
                        ctx.response.set_status(201);
                        ctx.response.set_header("Location", "/widgets/5");
                        Ok(Payload::Empty)
                    })
                    .get("broken", |_ctx: &mut ActionContext| -> ServerResult<Payload> {
                        Err(ServerError::status(403, "no entry"))
                    }),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl Controller for Widgets {
        fn actions(&self) -> &ActionTable {
            &self.actions
        }

        fn will_handle_url(&self, _url: &Url, method_name: &str) {
            self.calls
                .lock()
                .expect("lock")
                .push(format!("will:{}", method_name));
        }

        fn did_handle_url(&self, _url: &Url, method_name: &str, _response: &mut Response) {
            self.calls
                .lock()
                .expect("lock")
                .push(format!("did:{}", method_name));
        }
    }

    fn dispatch_action(controller: &Widgets, action: &str, method: Method) -> ServerResult<Response> {
        let url = Url::parse("/Widgets/show");
        let attachments = Attachments::new();
        dispatch(controller, action, method, &url, None, &attachments)
    }

    #[test]
    fn the_method_prefix_is_tried_before_the_fallback() {
        let controller = Widgets::new();
        let response = dispatch_action(&controller, "widgets", Method::GET).expect("dispatches");
        assert_eq!(response.body().to_string(), "via get");

        // POST has no postWidgets, so the fallback wins.
        let response = dispatch_action(&controller, "widgets", Method::POST).expect("dispatches");
        assert_eq!(response.body().to_string(), "via action");
    }

    #[test]
    fn unresolvable_actions_are_route_not_found() {
        let controller = Widgets::new();
        let result = dispatch_action(&controller, "missing", Method::GET);
        assert!(matches!(result, Err(ServerError::RouteNotFound(_))));
    }

    #[test]
    fn can_route_agrees_with_dispatch() {
        let controller = Widgets::new();
        for (action, method) in [
            ("widgets", Method::GET),
            ("widgets", Method::DELETE),
            ("show", Method::POST),
            ("missing", Method::GET),
            ("create", Method::POST),
        ] {
            let predicted = can_route(&controller, action, method);
            let outcome = dispatch_action(&controller, action, method);
            match outcome {
                Err(ServerError::RouteNotFound(_)) => assert!(!predicted),
                _ => assert!(predicted),
            }
        }
    }

    #[test]
    fn hooks_receive_the_resolved_method_name_in_order() {
        let controller = Widgets::new();
        dispatch_action(&controller, "show", Method::GET).expect("dispatches");
        let calls = controller.calls.lock().expect("lock");
        assert_eq!(
            calls.as_slice(),
            &["will:actionShow".to_string(), "did:actionShow".to_string()]
        );
    }

    #[test]
    fn actions_mutate_their_own_response() {
        let controller = Widgets::new();
        let response = dispatch_action(&controller, "create", Method::GET).expect("dispatches");
        assert_eq!(response.status(), 201);
        assert_eq!(response.header("Location"), Some("/widgets/5"));
    }

    #[test]
    fn action_errors_propagate_unmodified() {
        let controller = Widgets::new();
        let result = dispatch_action(&controller, "broken", Method::GET);
        match result {
            Err(ServerError::Status(code, _)) => assert_eq!(code, 403),
            other => panic!("unexpected outcome: {:?}", other.map(|r| r.status())),
        }
    }

    #[test]
    fn consecutive_dispatches_start_from_a_clean_response() {
        let controller = Widgets::new();
        let first = dispatch_action(&controller, "create", Method::GET).expect("dispatches");
        assert_eq!(first.status(), 201);
        let second = dispatch_action(&controller, "show", Method::GET).expect("dispatches");
        assert_eq!(second.status(), 200);
    }
}
