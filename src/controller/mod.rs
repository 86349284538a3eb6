//! The controller capability.
//!
//! A controller claims action names and produces response bodies. The
//! verb-prefix convention (`getShow` before `actionShow` for a GET request
//! to `show`) is realized as a lookup table built when the controller is
//! constructed, not by inspecting method names at request time: each entry
//! is keyed by a `(prefix, action)` pair, and the dispatcher walks the
//! prefixes in order.

use crate::error::ServerResult;
use crate::http::request::{Method, Request};
use crate::http::response::{Payload, Response};
use crate::url::Url;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A positional extra argument delivered to a routed action. The routed URL
/// is always the first attachment.
#[derive(Debug, Clone)]
pub enum Attachment {
    Url(Url),
    Data(Value),
    Failure(Failure),
}

/// The error that triggered an exception re-route, in attachable form.
#[derive(Debug, Clone)]
pub struct Failure {
    pub status: u16,
    pub message: String,
}

/// The ordered attachment list for one dispatch.
#[derive(Debug, Clone, Default)]
pub struct Attachments {
    items: Vec<Attachment>,
}

impl Attachments {
    pub fn new() -> Attachments {
        Attachments { items: Vec::new() }
    }

    pub fn push(&mut self, attachment: Attachment) {
        self.items.push(attachment);
    }

    pub fn get(&self, index: usize) -> Option<&Attachment> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attachment> {
        self.items.iter()
    }

    /// The routed URL, when the calling convention was honored (URL first).
    pub fn url(&self) -> Option<&Url> {
        match self.items.first() {
            Some(Attachment::Url(url)) => Some(url),
            _ => None,
        }
    }

    /// The first attached failure, if any.
    pub fn failure(&self) -> Option<&Failure> {
        self.items.iter().find_map(|attachment| match attachment {
            Attachment::Failure(failure) => Some(failure),
            _ => None,
        })
    }
}

/// Per-call state handed to an action: the routed URL, the request context
/// when one exists, the attachments, and the response under construction.
pub struct ActionContext<'a> {
    pub url: &'a Url,
    pub method: Method,
    pub request: Option<&'a Request>,
    pub attachments: &'a Attachments,
    pub response: &'a mut Response,
}

pub type ActionFn = Arc<dyn Fn(&mut ActionContext) -> ServerResult<Payload> + Send + Sync>;

/// Conversion of action return values into a response payload.
pub trait IntoPayload {
    fn into_payload(self) -> Payload;
}

impl IntoPayload for Payload {
    fn into_payload(self) -> Payload {
        self
    }
}

impl IntoPayload for Value {
    fn into_payload(self) -> Payload {
        Payload::Data(self)
    }
}

impl IntoPayload for String {
    fn into_payload(self) -> Payload {
        Payload::Text(self)
    }
}

impl IntoPayload for &str {
    fn into_payload(self) -> Payload {
        Payload::Text(self.to_string())
    }
}

impl IntoPayload for () {
    fn into_payload(self) -> Payload {
        Payload::Empty
    }
}

/// The table of routable actions, keyed by `(prefix, action)` with both
/// parts case-normalized. Built once at controller construction.
#[derive(Clone, Default)]
pub struct ActionTable {
    actions: HashMap<(String, String), ActionFn>,
}

impl ActionTable {
    pub fn new() -> ActionTable {
        ActionTable {
            actions: HashMap::new(),
        }
    }

    /// Register an action under an arbitrary prefix.
    pub fn on<F, P>(mut self, prefix: &str, name: &str, handler: F) -> Self
    where
        F: Fn(&mut ActionContext) -> ServerResult<P> + Send + Sync + 'static,
        P: IntoPayload,
    {
        let action: ActionFn =
            Arc::new(move |ctx: &mut ActionContext| handler(ctx).map(IntoPayload::into_payload));
        self.actions
            .insert((prefix.to_lowercase(), name.to_lowercase()), action);
        self
    }

    pub fn get<F, P>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&mut ActionContext) -> ServerResult<P> + Send + Sync + 'static,
        P: IntoPayload,
    {
        self.on("get", name, handler)
    }

    pub fn post<F, P>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&mut ActionContext) -> ServerResult<P> + Send + Sync + 'static,
        P: IntoPayload,
    {
        self.on("post", name, handler)
    }

    pub fn put<F, P>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&mut ActionContext) -> ServerResult<P> + Send + Sync + 'static,
        P: IntoPayload,
    {
        self.on("put", name, handler)
    }

    pub fn delete<F, P>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&mut ActionContext) -> ServerResult<P> + Send + Sync + 'static,
        P: IntoPayload,
    {
        self.on("delete", name, handler)
    }

    pub fn head<F, P>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&mut ActionContext) -> ServerResult<P> + Send + Sync + 'static,
        P: IntoPayload,
    {
        self.on("head", name, handler)
    }

    pub fn options<F, P>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&mut ActionContext) -> ServerResult<P> + Send + Sync + 'static,
        P: IntoPayload,
    {
        self.on("options", name, handler)
    }

    pub fn patch<F, P>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&mut ActionContext) -> ServerResult<P> + Send + Sync + 'static,
        P: IntoPayload,
    {
        self.on("patch", name, handler)
    }

    pub fn cli<F, P>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&mut ActionContext) -> ServerResult<P> + Send + Sync + 'static,
        P: IntoPayload,
    {
        self.on("cli", name, handler)
    }

    /// Register an action under the universal fallback prefix, reachable
    /// from any request method.
    pub fn action<F, P>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&mut ActionContext) -> ServerResult<P> + Send + Sync + 'static,
        P: IntoPayload,
    {
        self.on("action", name, handler)
    }

    pub fn lookup(&self, prefix: &str, name: &str) -> Option<&ActionFn> {
        self.actions
            .get(&(prefix.to_lowercase(), name.to_lowercase()))
    }

    pub fn contains(&self, prefix: &str, name: &str) -> bool {
        self.lookup(prefix, name).is_some()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl fmt::Debug for ActionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&(String, String)> = self.actions.keys().collect();
        keys.sort();
        f.debug_struct("ActionTable").field("actions", &keys).finish()
    }
}

/// A capability that can claim an action name and produce a response body.
pub trait Controller: Send + Sync {
    /// The table of routable actions, built once when the controller is
    /// constructed.
    fn actions(&self) -> &ActionTable;

    /// Hook for pre-formatting the response body. The default implementation
    /// stringifies the raw value; REST-style controllers delegate to a
    /// [`ResponseFormatter`](crate::format::ResponseFormatter) instead.
    fn format_body(
        &self,
        body: Payload,
        attachments: &Attachments,
        response: &mut Response,
    ) -> ServerResult<Payload> {
        let _ = (attachments, response);
        Ok(Payload::Text(body.to_string()))
    }

    /// Called just before a resolved action runs. `method_name` is the
    /// prefixed name the dispatcher settled on (e.g. `getShow`).
    fn will_handle_url(&self, url: &Url, method_name: &str) {
        let _ = (url, method_name);
    }

    /// Called after the action ran and the body was formatted.
    fn did_handle_url(&self, url: &Url, method_name: &str, response: &mut Response) {
        let _ = (url, method_name, response);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn table_lookup_is_case_insensitive() {
        let table = ActionTable::new().get("Show", |_ctx: &mut ActionContext| Ok(json!(1)));
        assert!(table.contains("GET", "show"));
        assert!(table.contains("get", "SHOW"));
        assert!(!table.contains("post", "show"));
    }

    #[test]
    fn actions_register_under_their_own_prefix() {
        let table = ActionTable::new()
            .get("widgets", |_ctx: &mut ActionContext| Ok(json!([])))
            .post("widgets", |_ctx: &mut ActionContext| Ok(json!({})))
            .action("index", |_ctx: &mut ActionContext| Ok("home"));
        assert!(table.contains("get", "widgets"));
        assert!(table.contains("post", "widgets"));
        assert!(table.contains("action", "index"));
        assert!(!table.contains("action", "widgets"));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn the_url_attachment_is_positional() {
        let mut attachments = Attachments::new();
        attachments.push(Attachment::Url(Url::parse("/Widgets/show")));
        attachments.push(Attachment::Data(json!({"extra": true})));
        assert_eq!(
            attachments.url().map(|u| u.path().as_str()),
            Some("/Widgets/show")
        );

        // A list that does not lead with a URL has no routed URL.
        let mut reversed = Attachments::new();
        reversed.push(Attachment::Data(json!(1)));
        reversed.push(Attachment::Url(Url::parse("/Widgets/show")));
        assert!(reversed.url().is_none());
    }

    #[test]
    fn failures_are_found_anywhere_in_the_list() {
        let mut attachments = Attachments::new();
        attachments.push(Attachment::Url(Url::parse("exception:/404")));
        attachments.push(Attachment::Failure(Failure {
            status: 404,
            message: "Not found".to_string(),
        }));
        assert_eq!(attachments.failure().map(|f| f.status), Some(404));
    }

    #[test]
    fn payload_conversions() {
        assert_eq!("hi".into_payload(), Payload::Text("hi".to_string()));
        assert_eq!(().into_payload(), Payload::Empty);
        assert_eq!(json!(5).into_payload(), Payload::Data(json!(5)));
    }
}
