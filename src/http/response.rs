use serde_json::Value;
use std::fmt;

/// The untyped body of a response.
///
/// Actions return a `Payload`; the formatting pass turns it into `Text`,
/// and emission coerces whatever is left to a string.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    Text(String),
    Data(Value),
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Empty => Ok(()),
            Payload::Text(text) => f.write_str(text),
            Payload::Data(Value::String(text)) => f.write_str(text),
            Payload::Data(value) => write!(f, "{}", value),
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Payload {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Payload {
        Payload::Text(text.to_string())
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Payload {
        Payload::Data(value)
    }
}

impl From<()> for Payload {
    fn from(_: ()) -> Payload {
        Payload::Empty
    }
}

/// The default HTTP/1.0 reason phrase for a status code, or `None` when the
/// code is outside the known table.
pub fn reason_phrase(code: u16) -> Option<&'static str> {
    match code {
        100 => Some("Continue"),
        101 => Some("Switching Protocols"),
        200 => Some("OK"),
        201 => Some("Created"),
        202 => Some("Accepted"),
        203 => Some("Non-Authoritative Information"),
        204 => Some("No Content"),
        205 => Some("Reset Content"),
        206 => Some("Partial Content"),
        300 => Some("Multiple Choices"),
        301 => Some("Moved Permanently"),
        302 => Some("Moved Temporarily"),
        303 => Some("See Other"),
        304 => Some("Not Modified"),
        305 => Some("Use Proxy"),
        400 => Some("Bad Request"),
        401 => Some("Unauthorized"),
        402 => Some("Payment Required"),
        403 => Some("Forbidden"),
        404 => Some("Not Found"),
        405 => Some("Method Not Allowed"),
        406 => Some("Not Acceptable"),
        407 => Some("Proxy Authentication Required"),
        408 => Some("Request Time-out"),
        409 => Some("Conflict"),
        410 => Some("Gone"),
        411 => Some("Length Required"),
        412 => Some("Precondition Failed"),
        413 => Some("Request Entity Too Large"),
        414 => Some("Request-URI Too Large"),
        415 => Some("Unsupported Media Type"),
        500 => Some("Internal Server Error"),
        501 => Some("Not Implemented"),
        502 => Some("Bad Gateway"),
        503 => Some("Service Unavailable"),
        504 => Some("Gateway Time-out"),
        505 => Some("HTTP Version not supported"),
        _ => None,
    }
}

/// An accumulating HTTP response: status code, ordered headers, body.
///
/// One instance exists per routed call; it is built up by the action and the
/// formatting pass, then emitted and discarded. Header insertion order is
/// preserved, and setting an existing header updates it in place.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Payload,
}

impl Response {
    pub fn new() -> Response {
        Response {
            status: 200,
            headers: Vec::new(),
            body: Payload::Empty,
        }
    }

    pub fn of<B: Into<Payload>>(body: B, status: u16) -> Response {
        let mut response = Response::new();
        response.set_status(status);
        response.set_body(body);
        response
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Set the HTTP status. Codes outside the known table are coerced to
    /// 500 (Internal Server Error) rather than rejected.
    pub fn set_status(&mut self, code: u16) -> &mut Self {
        self.status = if reason_phrase(code).is_some() {
            code
        } else {
            500
        };
        self
    }

    pub fn set_header<K: AsRef<str>, V: AsRef<str>>(&mut self, key: K, value: V) -> &mut Self {
        let key = key.as_ref();
        let value = value.as_ref().to_string();
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
        {
            Some(entry) => entry.1 = value,
            None => self.headers.push((key.to_string(), value)),
        }
        self
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn clear_header(&mut self, key: &str) -> &mut Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(key));
        self
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &Payload {
        &self.body
    }

    pub fn set_body<B: Into<Payload>>(&mut self, body: B) -> &mut Self {
        self.body = body.into();
        self
    }

    /// The HTTP/1.0 status line synthesized from the status code.
    pub fn status_line(&self) -> String {
        format!(
            "HTTP/1.0 {} {}",
            self.status,
            reason_phrase(self.status).unwrap_or("")
        )
    }

    /// All header lines in emission order, status line first.
    pub fn header_lines(&self) -> Vec<String> {
        let mut lines = vec![self.status_line()];
        for (key, value) in &self.headers {
            lines.push(format!("{}: {}", key, value));
        }
        lines
    }
}

impl Default for Response {
    fn default() -> Self {
        Response::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_status_codes_are_coerced_to_500() {
        let mut response = Response::new();
        response.set_status(999);
        assert_eq!(response.status(), 500);
        assert_eq!(response.status_line(), "HTTP/1.0 500 Internal Server Error");
    }

    #[test]
    fn known_status_codes_keep_their_phrase() {
        let mut response = Response::new();
        response.set_status(404);
        assert_eq!(response.status_line(), "HTTP/1.0 404 Not Found");
        response.set_status(302);
        assert_eq!(response.status_line(), "HTTP/1.0 302 Moved Temporarily");
    }

    #[test]
    fn header_order_is_preserved_and_updates_happen_in_place() {
        let mut response = Response::new();
        response
            .set_header("X-First", "1")
            .set_header("X-Second", "2")
            .set_header("x-first", "one");
        assert_eq!(
            response.headers(),
            &[
                ("X-First".to_string(), "one".to_string()),
                ("X-Second".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn header_lines_start_with_the_status_line() {
        let mut response = Response::new();
        response.set_header("Content-Type", "text/csv");
        let lines = response.header_lines();
        assert_eq!(lines[0], "HTTP/1.0 200 OK");
        assert_eq!(lines[1], "Content-Type: text/csv");
    }

    #[test]
    fn clear_header_is_case_insensitive() {
        let mut response = Response::new();
        response.set_header("Location", "/elsewhere");
        response.clear_header("location");
        assert_eq!(response.header("Location"), None);
    }

    #[test]
    fn payload_coercion_to_string() {
        assert_eq!(Payload::Empty.to_string(), "");
        assert_eq!(Payload::Text("hi".into()).to_string(), "hi");
        assert_eq!(Payload::Data(json!("hi")).to_string(), "hi");
        assert_eq!(Payload::Data(json!({"id":5})).to_string(), r#"{"id":5}"#);
    }
}
