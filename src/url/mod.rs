//! URL and path value objects.
//!
//! `UrlPath` is a normalized path string with component-level accessors;
//! `Url` is the full address the framework routes on. Both are pure values:
//! parsing is lenient and never fails, and nothing here touches the
//! filesystem or the network.

use std::collections::HashMap;
use std::fmt;

/// A normalized URL path.
///
/// Repeated slashes are collapsed, surrounding whitespace and trailing
/// slashes are trimmed, and a leading slash is preserved. The empty path
/// normalizes to `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPath {
    path: String,
}

impl UrlPath {
    pub fn new(path: &str) -> UrlPath {
        let trimmed = path.trim();
        let absolute = trimmed.starts_with('/');
        let joined = trimmed
            .split('/')
            .filter(|segment| !segment.trim().is_empty())
            .collect::<Vec<_>>()
            .join("/");
        let path = match (absolute, joined.is_empty()) {
            (_, true) => "/".to_string(),
            (true, false) => format!("/{}", joined),
            (false, false) => joined,
        };
        UrlPath { path }
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// The path segments, in order. `/` has no components.
    pub fn components(&self) -> Vec<&str> {
        self.path.split('/').filter(|c| !c.is_empty()).collect()
    }

    pub fn component_at(&self, index: usize) -> Option<&str> {
        self.components().get(index).copied()
    }

    pub fn last_component(&self) -> Option<&str> {
        self.components().last().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.components().is_empty()
    }

    /// The characters following the last `.` of the last component, or
    /// `None` when the last component has no (or an empty) extension.
    pub fn extension(&self) -> Option<&str> {
        let last = self.last_component()?;
        match last.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => Some(ext),
            _ => None,
        }
    }

    /// The last component with its extension removed.
    pub fn filename(&self) -> Option<&str> {
        let last = self.last_component()?;
        match last.rsplit_once('.') {
            Some((stem, ext)) if !ext.is_empty() => Some(stem),
            _ => Some(last),
        }
    }

    /// A copy of the path with the last component's extension stripped.
    pub fn without_extension(&self) -> UrlPath {
        match self.extension() {
            Some(ext) => {
                let end = self.path.len() - ext.len() - 1;
                UrlPath {
                    path: self.path[..end].to_string(),
                }
            }
            None => self.clone(),
        }
    }

    pub fn join(&self, component: &str) -> UrlPath {
        UrlPath::new(&format!("{}/{}", self.path, component))
    }
}

impl fmt::Display for UrlPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl Default for UrlPath {
    fn default() -> Self {
        UrlPath::new("/")
    }
}

/// A parsed URL: scheme, optional authority, path, query and fragment.
///
/// The `exception:/{code}` form is recognized as the carrier of the
/// exception-to-URL convention and parses to scheme `exception` with the
/// code as the only path component.
#[derive(Debug, Clone)]
pub struct Url {
    scheme: String,
    host: Option<String>,
    port: Option<u16>,
    path: UrlPath,
    query: HashMap<String, String>,
    fragment: Option<String>,
}

impl Url {
    /// Parse a URL string. Parsing is lenient: a missing scheme defaults to
    /// `http`, and malformed pieces are dropped rather than rejected.
    pub fn parse(input: &str) -> Url {
        let input = input.trim();

        // Exception URLs are an... exception.
        if let Some(rest) = input.strip_prefix("exception:") {
            let code = rest.trim_start_matches('/');
            if !code.is_empty() && code.chars().all(|c| c.is_ascii_digit()) {
                return Url {
                    scheme: "exception".to_string(),
                    host: None,
                    port: None,
                    path: UrlPath::new(&format!("/{}", code)),
                    query: HashMap::new(),
                    fragment: None,
                };
            }
        }

        let (scheme, rest) = match input.find(':') {
            Some(pos) if is_scheme(&input[..pos]) => {
                (input[..pos].to_lowercase(), &input[pos + 1..])
            }
            _ => ("http".to_string(), input),
        };

        let mut host = None;
        let mut port = None;
        let rest = match rest.strip_prefix("//") {
            Some(stripped) => {
                let end = stripped
                    .find(|c| c == '/' || c == '?' || c == '#')
                    .unwrap_or(stripped.len());
                let authority = &stripped[..end];
                // Userinfo is tolerated and discarded.
                let authority = authority
                    .rsplit_once('@')
                    .map(|(_, h)| h)
                    .unwrap_or(authority);
                let (h, p) = match authority.rsplit_once(':') {
                    Some((h, p)) if !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()) => {
                        (h, p.parse::<u16>().ok())
                    }
                    _ => (authority, None),
                };
                if !h.is_empty() {
                    host = Some(h.to_string());
                }
                port = p;
                &stripped[end..]
            }
            None => rest,
        };

        let mut fragment = None;
        let rest = match rest.split_once('#') {
            Some((before, frag)) => {
                if !frag.is_empty() {
                    fragment = Some(frag.to_string());
                }
                before
            }
            None => rest,
        };

        let mut query = HashMap::new();
        let rest = match rest.split_once('?') {
            Some((before, raw)) => {
                query = parse_query(raw);
                before
            }
            None => rest,
        };

        Url {
            scheme,
            host,
            port,
            path: UrlPath::new(if rest.is_empty() { "/" } else { rest }),
            query,
            fragment,
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn path(&self) -> &UrlPath {
        &self.path
    }

    pub fn set_path(&mut self, path: UrlPath) {
        self.path = path;
    }

    pub fn query(&self) -> &HashMap<String, String> {
        &self.query
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.scheme)?;
        if let Some(host) = &self.host {
            write!(f, "//{}", host)?;
            if let Some(port) = self.port {
                write!(f, ":{}", port)?;
            }
        }
        write!(f, "{}", self.path)?;
        if !self.query.is_empty() {
            let encoded = self
                .query
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            write!(f, "?{}", encoded)?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{}", fragment)?;
        }
        Ok(())
    }
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
        }
        _ => false,
    }
}

pub(crate) fn parse_query(raw: &str) -> HashMap<String, String> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = urlencoding::decode(key).ok()?.into_owned();
            let value = urlencoding::decode(value).ok()?.into_owned();
            Some((key, value))
        })
        .collect()
}
