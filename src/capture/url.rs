//! Minimal URI handling: RFC 3986 reference resolution and host extraction.

use std::sync::LazyLock;

use regex::Regex;

/// RFC 3986 appendix B.
static URI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:([^:/?#]+):)?(?://([^/?#]*))?([^?#]*)(?:\?([^#]*))?(?:#(.*))?$").unwrap()
});

static ABSOLUTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:[a-z][a-z0-9+.\-]*:)?//").unwrap());

/// A URI reference split into its five components.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UriParts {
    pub scheme: Option<String>,
    pub authority: Option<String>,
    pub path: String,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

impl UriParts {
    pub fn parse(s: &str) -> Self {
        let Some(caps) = URI_RE.captures(s) else {
            return Self::default();
        };
        let get = |i: usize| caps.get(i).map(|m| m.as_str().to_string());
        Self {
            scheme: get(1),
            authority: get(2),
            path: get(3).unwrap_or_default(),
            query: get(4),
            fragment: get(5),
        }
    }

    /// Hostname without userinfo or port, lowercased.
    pub fn host(&self) -> Option<String> {
        let authority = self.authority.as_deref()?;
        let host_port = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
        let host = if host_port.starts_with('[') {
            host_port.split_inclusive(']').next().unwrap_or(host_port)
        } else {
            host_port.split(':').next().unwrap_or(host_port)
        };
        Some(host.to_ascii_lowercase())
    }

    /// "scheme://authority", when both are present.
    pub fn origin(&self) -> Option<String> {
        match (&self.scheme, &self.authority) {
            (Some(scheme), Some(authority)) if !authority.is_empty() => {
                let authority = authority.rsplit_once('@').map_or(authority.as_str(), |(_, h)| h);
                Some(format!("{}://{}", scheme, authority))
            }
            _ => None,
        }
    }

    fn compose(&self) -> String {
        let mut out = String::new();
        if let Some(scheme) = &self.scheme {
            out.push_str(scheme);
            out.push(':');
        }
        if let Some(authority) = &self.authority {
            out.push_str("//");
            out.push_str(authority);
        }
        out.push_str(&self.path);
        if let Some(query) = &self.query {
            out.push('?');
            out.push_str(query);
        }
        if let Some(fragment) = &self.fragment {
            out.push('#');
            out.push_str(fragment);
        }
        out
    }
}

/// Hostname of `url`, if it has an authority component.
pub fn hostname(url: &str) -> Option<String> {
    UriParts::parse(url.trim()).host().filter(|h| !h.is_empty())
}

/// Resolve `reference` against the absolute URI `base` (RFC 3986 section 5.2).
/// Returns `None` when `base` has no scheme.
pub fn resolve_reference(base: &str, reference: &str) -> Option<String> {
    let base = UriParts::parse(base.trim());
    base.scheme.as_ref()?;
    let r = UriParts::parse(reference.trim());

    let target = if r.scheme.is_some() {
        UriParts {
            path: remove_dot_segments(&r.path),
            ..r
        }
    } else if r.authority.is_some() {
        UriParts {
            scheme: base.scheme.clone(),
            path: remove_dot_segments(&r.path),
            ..r
        }
    } else if r.path.is_empty() {
        UriParts {
            scheme: base.scheme.clone(),
            authority: base.authority.clone(),
            path: base.path.clone(),
            query: r.query.or_else(|| base.query.clone()),
            fragment: r.fragment,
        }
    } else {
        let path = if r.path.starts_with('/') {
            remove_dot_segments(&r.path)
        } else {
            remove_dot_segments(&merge_paths(&base, &r.path))
        };
        UriParts {
            scheme: base.scheme.clone(),
            authority: base.authority.clone(),
            path,
            query: r.query,
            fragment: r.fragment,
        }
    };

    Some(target.compose())
}

/// Section 5.2.3.
fn merge_paths(base: &UriParts, reference_path: &str) -> String {
    if base.authority.is_some() && base.path.is_empty() {
        return format!("/{}", reference_path);
    }
    match base.path.rfind('/') {
        Some(idx) => format!("{}{}", &base.path[..=idx], reference_path),
        None => reference_path.to_string(),
    }
}

/// Section 5.2.4.
pub fn remove_dot_segments(path: &str) -> String {
    let mut input = path;
    let mut output: Vec<&str> = Vec::new();

    while !input.is_empty() {
        if let Some(rest) = input.strip_prefix("../") {
            input = rest;
        } else if let Some(rest) = input.strip_prefix("./") {
            input = rest;
        } else if input.starts_with("/./") {
            input = &input[2..];
        } else if input == "/." {
            input = "/";
        } else if input.starts_with("/../") {
            input = &input[3..];
            output.pop();
        } else if input == "/.." {
            input = "/";
            output.pop();
        } else if input == "." || input == ".." {
            input = "";
        } else {
            // Move the first segment, including its leading "/", to the output.
            let start = usize::from(input.starts_with('/'));
            let end = input[start..].find('/').map_or(input.len(), |i| i + start);
            output.push(&input[..end]);
            input = &input[end..];
        }
    }

    output.concat()
}

/// Turn an image reference scraped from page metadata into an absolute URL.
///
/// Scheme-qualified and network-path references pass through unchanged,
/// root-relative ones are joined to the page origin, everything else is
/// resolved against the page URL. Malformed input yields an empty string.
pub fn resolve_relative_image_url(candidate: &str, page_url: &str) -> String {
    let candidate = candidate.trim();
    if candidate.is_empty() || ABSOLUTE_RE.is_match(candidate) {
        return candidate.to_string();
    }
    if candidate.starts_with('/') {
        return match UriParts::parse(page_url.trim()).origin() {
            Some(origin) => format!("{}{}", origin, candidate),
            None => String::new(),
        };
    }
    resolve_reference(page_url, candidate).unwrap_or_default()
}
