//! Response body formatting and content negotiation.
//!
//! The format is selected once per response, from the routed URL's
//! extension when it has one and from the controller's configured default
//! otherwise, and fixes both the `Content-Type` header and the encoding
//! algorithm. Only web-facing schemes (`http`, `https`, `exception`) are
//! rendered; everything else gets the native value back unchanged, which
//! is what internal invocations want.

mod inflect;

pub use inflect::singular_of;

use crate::controller::Attachments;
use crate::error::{ServerError, ServerResult};
use crate::http::response::{Payload, Response};
use serde_json::Value;
use tracing::debug;

/// Output encoding selected per response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Xml,
    Csv,
    /// Serialized native value for trusted internal transport.
    Native,
    /// No encoding; the body passes through untouched.
    Raw,
}

impl Format {
    /// Map a URL extension to a format. Unknown extensions map to nothing,
    /// which the formatter treats as a raw passthrough.
    pub fn from_extension(extension: &str) -> Option<Format> {
        match extension.to_lowercase().as_str() {
            "json" => Some(Format::Json),
            "xml" => Some(Format::Xml),
            "csv" => Some(Format::Csv),
            "native" => Some(Format::Native),
            _ => None,
        }
    }

    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            Format::Json => Some("application/json"),
            Format::Xml => Some("application/xml"),
            Format::Csv => Some("text/csv"),
            Format::Native => Some("application/octet-stream"),
            Format::Raw => None,
        }
    }
}

/// Converts raw action return values into wire-format bodies for
/// REST-style controllers.
#[derive(Debug, Clone)]
pub struct ResponseFormatter {
    pub default_format: Format,
    pub xml_root: String,
}

impl Default for ResponseFormatter {
    fn default() -> Self {
        ResponseFormatter {
            default_format: Format::Json,
            xml_root: "data".to_string(),
        }
    }
}

impl ResponseFormatter {
    pub fn new() -> ResponseFormatter {
        ResponseFormatter::default()
    }

    pub fn default_format(mut self, format: Format) -> Self {
        self.default_format = format;
        self
    }

    pub fn xml_root<S: Into<String>>(mut self, root: S) -> Self {
        self.xml_root = root.into();
        self
    }

    /// Serialize `body` according to the negotiated format, setting the
    /// matching `Content-Type` header on `response` as a side effect.
    ///
    /// The routed URL is taken from the first attachment. A missing URL or
    /// a scheme other than `http`/`https`/`exception` returns the body
    /// unchanged.
    pub fn format_body(
        &self,
        body: Payload,
        attachments: &Attachments,
        response: &mut Response,
    ) -> ServerResult<Payload> {
        let url = match attachments.url() {
            Some(url) if matches!(url.scheme(), "http" | "https" | "exception") => url,
            _ => return Ok(body),
        };
        let format = match url.path().extension() {
            Some(extension) => Format::from_extension(extension).unwrap_or(Format::Raw),
            None => self.default_format,
        };
        debug!(?format, path = %url.path(), "response format selected");

        if let Some(content_type) = format.content_type() {
            response.set_header("Content-Type", content_type);
        }
        match format {
            Format::Json | Format::Native => {
                let encoded = serde_json::to_string(&primitive_of(&body))?;
                Ok(Payload::Text(encoded))
            }
            Format::Xml => Ok(Payload::Text(xml_encode(
                &primitive_of(&body),
                &self.xml_root,
            )?)),
            Format::Csv => Ok(Payload::Text(csv_encode(&primitive_of(&body)))),
            Format::Raw => Ok(body),
        }
    }
}

/// Normalize a payload into a plain `Value` tree ahead of encoding.
pub fn primitive_of(body: &Payload) -> Value {
    match body {
        Payload::Empty => Value::Null,
        Payload::Text(text) => Value::String(text.clone()),
        Payload::Data(value) => value.clone(),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Encode a value as an XML document.
///
/// A single-entry top-level map contributes its key as the root element
/// name (the unwrap-one-level rule); otherwise `default_root` is used.
/// Maps become child elements, list items are named with the singular of
/// their enclosing element, and scalars become entity-escaped text.
pub fn xml_encode(data: &Value, default_root: &str) -> ServerResult<String> {
    let mut root = default_root;
    let mut data = data;
    if let Value::Object(map) = data {
        if map.len() == 1 {
            if let Some((key, value)) = map.iter().next() {
                root = key;
                data = value;
            }
        }
    }
    let mut document = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    encode_element(&mut document, root, data)?;
    Ok(document)
}

// Element names keep ASCII letters only; anything left empty cannot be
// encoded and fails the response.
fn element_name(name: &str) -> ServerResult<String> {
    let sanitized: String = name.chars().filter(|c| c.is_ascii_alphabetic()).collect();
    if sanitized.is_empty() {
        return Err(ServerError::FormatError(format!(
            "key `{}` has no characters usable as an XML element name",
            name
        )));
    }
    Ok(sanitized)
}

fn encode_element(out: &mut String, name: &str, value: &Value) -> ServerResult<()> {
    let name = element_name(name)?;
    match value {
        Value::Object(map) => {
            *out += &format!("<{}>", name);
            for (key, child) in map {
                encode_element(out, key, child)?;
            }
            *out += &format!("</{}>", name);
        }
        Value::Array(items) => {
            *out += &format!("<{}>", name);
            let item_name = singular_of(&name);
            for item in items {
                encode_element(out, &item_name, item)?;
            }
            *out += &format!("</{}>", name);
        }
        scalar => {
            *out += &format!("<{}>{}</{}>", name, escape_xml(&scalar_text(scalar)), name);
        }
    }
    Ok(())
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Encode a value as CSV text.
///
/// A single map (or a top-level scalar) is treated as a one-row table. The
/// header row is computed from the first row only: string keys verbatim,
/// positional rows as empty cells. `null` fields render as the literal
/// `null`, non-scalar fields are skipped entirely, and fields containing a
/// comma, a quote or whitespace are quoted with internal quotes doubled.
/// Rows are CRLF-joined, header first. Rows of differing shapes are
/// encoded independently; no schema union is attempted.
pub fn csv_encode(data: &Value) -> String {
    let rows: Vec<&Value> = match data {
        Value::Object(_) => vec![data],
        Value::Array(items) => items.iter().collect(),
        scalar => return scalar_text(scalar),
    };

    let mut keys: Vec<String> = Vec::new();
    let mut lines: Vec<String> = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        let fields: Vec<(Option<&str>, &Value)> = match row {
            Value::Object(map) => map.iter().map(|(k, v)| (Some(k.as_str()), v)).collect(),
            Value::Array(items) => items.iter().map(|v| (None, v)).collect(),
            _ => Vec::new(),
        };
        let mut output: Vec<String> = Vec::new();
        for (key, field) in fields {
            match field {
                Value::Null => output.push("null".to_string()),
                Value::Object(_) | Value::Array(_) => continue,
                scalar => {
                    let text = scalar_text(scalar);
                    if text.contains(',') || text.contains('"') || text.contains(char::is_whitespace)
                    {
                        output.push(format!("\"{}\"", text.replace('"', "\"\"")));
                    } else {
                        output.push(text);
                    }
                }
            }
            if index == 0 {
                keys.push(key.unwrap_or("").to_string());
            }
        }
        lines.push(output.join(","));
    }
    lines.insert(0, keys.join(","));
    lines.join("\r\n")
}
