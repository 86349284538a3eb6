use crate::url::Url;
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Eq, Hash, PartialEq, Copy, Clone, Debug)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    HEAD,
    CONNECT,
    OPTIONS,
    TRACE,
    PATCH,
    /// Non-HTTP invocation (command line, internal re-dispatch).
    CLI,
}

impl Method {
    pub fn from_string(s: &str) -> Method {
        match s {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "HEAD" => Method::HEAD,
            "CONNECT" => Method::CONNECT,
            "OPTIONS" => Method::OPTIONS,
            "TRACE" => Method::TRACE,
            "PATCH" => Method::PATCH,
            "CLI" => Method::CLI,
            _ => Method::GET,
        }
    }

    /// The lowercase prefix tried first when resolving an action method.
    pub fn prefix(&self) -> &'static str {
        match self {
            Method::GET => "get",
            Method::POST => "post",
            Method::PUT => "put",
            Method::DELETE => "delete",
            Method::HEAD => "head",
            Method::CONNECT => "connect",
            Method::OPTIONS => "options",
            Method::TRACE => "trace",
            Method::PATCH => "patch",
            Method::CLI => "cli",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Body {
    pub(crate) content_type: String,
    pub(crate) data: Vec<u8>,
}

impl Body {
    pub fn new() -> Body {
        Body {
            content_type: String::new(),
            data: Vec::new(),
        }
    }

    pub fn from_string(s: &str) -> Body {
        Body {
            content_type: "text/plain".to_string(),
            data: s.as_bytes().to_vec(),
        }
    }

    pub fn from_bytes(b: Vec<u8>) -> Body {
        Body {
            content_type: "application/octet-stream".to_string(),
            data: b,
        }
    }

    pub(crate) fn with_content_type(content_type: String, data: Vec<u8>) -> Body {
        Body { content_type, data }
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn as_string(&self) -> String {
        String::from_utf8_lossy(&self.data).to_string()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn json<T>(&self) -> Option<T>
    where
        T: serde::de::DeserializeOwned,
    {
        if self.content_type.starts_with("application/json") {
            serde_json::from_slice(&self.data).ok()
        } else {
            None
        }
    }

    /// Decode a flat `application/x-www-form-urlencoded` body.
    pub fn form<T>(&self) -> Option<T>
    where
        T: serde::de::DeserializeOwned,
    {
        if !self
            .content_type
            .starts_with("application/x-www-form-urlencoded")
        {
            return None;
        }
        let text = String::from_utf8_lossy(&self.data).into_owned();
        let mut fields = Map::new();
        for pair in text.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = urlencoding::decode(key).ok()?.into_owned();
            let value = urlencoding::decode(value).ok()?.into_owned();
            fields.insert(key, Value::String(value));
        }
        serde_json::from_value(Value::Object(fields)).ok()
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::new()
    }
}

impl From<Vec<u8>> for Body {
    fn from(b: Vec<u8>) -> Body {
        Body::from_bytes(b)
    }
}

/// The immutable context of one incoming request. Header names are
/// lowercased at parse time.
#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HashMap<String, String>,
    pub body: Body,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Request {
        Request {
            method,
            url,
            headers: HashMap::new(),
            body: Body::new(),
        }
    }

    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers.get(&key.to_lowercase()).map(String::as_str)
    }
}
