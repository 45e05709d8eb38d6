// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Capability Value Object
//!
//! A [`Capability`] is one permission tuple granted to an identity: an HTTP method,
//! an API path template and the resource module it belongs to
//! (`{GET, "/roles/:id", "ROLES"}`).
//!
//! ## Path Normalization
//!
//! Granted paths are templates (`/roles/:id`), requested paths are concrete
//! (`/roles/64f9a3`). Both are brought to one comparable shape by
//! [`normalize_api_path`], which replaces every dynamic segment with
//! [`DYNAMIC_SEGMENT_MARKER`]. A segment is dynamic when it is:
//!
//! - a placeholder: `:id`, `{id}`, `[id]`
//! - all ASCII digits: `42`, `000000`
//! - a hyphenated UUID
//! - a hex identifier of at least 6 characters containing a digit: `64f9a3`,
//!   `64f9a3c2e1b0a9d8c7b6a5f4` (Mongo object ids)
//!
//! Query strings and fragments are dropped, and empty segments collapse, so
//! `roles/1/`, `/roles/1?x=y` and `/roles/:id` all normalize to `/roles/:id`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical replacement for every dynamic path segment.
pub const DYNAMIC_SEGMENT_MARKER: &str = ":id";

const MIN_HEX_IDENTIFIER_LEN: usize = 6;

/// HTTP methods a capability can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported HTTP method: '{0}'")]
pub struct UnknownMethod(pub String);

impl FromStr for HttpMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            _ => Err(UnknownMethod(s.to_string())),
        }
    }
}

impl TryFrom<String> for HttpMethod {
    type Error = UnknownMethod;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HttpMethod> for String {
    fn from(method: HttpMethod) -> Self {
        method.as_str().to_string()
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One permission tuple, as granted by the identity service or requested by a caller.
///
/// Wire form uses `apiPath` (the identity service's casing); `api_path` is accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capability {
    pub method: HttpMethod,
    #[serde(alias = "api_path")]
    pub api_path: String,
    pub module: String,
}

impl Capability {
    pub fn new(method: HttpMethod, api_path: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            method,
            api_path: api_path.into(),
            module: module.into(),
        }
    }

    /// Comparison-only view with the path normalized and the module upper-cased.
    pub fn normalized(&self) -> NormalizedCapability {
        NormalizedCapability {
            method: self.method,
            path: normalize_api_path(&self.api_path),
            module: normalize_module(&self.module),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} [{}]", self.method, self.api_path, self.module)
    }
}

/// Derived view of a [`Capability`] used only for matching.
///
/// Two capabilities match iff their normalized views are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedCapability {
    pub method: HttpMethod,
    pub path: String,
    pub module: String,
}

impl NormalizedCapability {
    /// A blank module or path can never match anything.
    pub fn is_well_formed(&self) -> bool {
        !self.module.is_empty() && self.path != "/"
    }
}

/// Case-normalized module name.
pub fn normalize_module(module: &str) -> String {
    module.trim().to_uppercase()
}

/// Replace every dynamic segment of `path` with [`DYNAMIC_SEGMENT_MARKER`].
pub fn normalize_api_path(path: &str) -> String {
    let route = path.trim().split(['?', '#']).next().unwrap_or_default();

    let segments: Vec<&str> = route
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            if is_dynamic_segment(segment) {
                DYNAMIC_SEGMENT_MARKER
            } else {
                segment
            }
        })
        .collect();

    format!("/{}", segments.join("/"))
}

fn is_dynamic_segment(segment: &str) -> bool {
    is_placeholder(segment) || is_numeric(segment) || is_uuid(segment) || is_hex_identifier(segment)
}

fn is_placeholder(segment: &str) -> bool {
    if let Some(name) = segment.strip_prefix(':') {
        return !name.is_empty();
    }
    let wrapped = |open: char, close: char| {
        segment.len() > 2 && segment.starts_with(open) && segment.ends_with(close)
    };
    wrapped('{', '}') || wrapped('[', ']')
}

fn is_numeric(segment: &str) -> bool {
    segment.bytes().all(|b| b.is_ascii_digit())
}

fn is_uuid(segment: &str) -> bool {
    segment.len() == 36
        && segment.char_indices().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_hexdigit(),
        })
}

fn is_hex_identifier(segment: &str) -> bool {
    segment.len() >= MIN_HEX_IDENTIFIER_LEN
        && segment.bytes().all(|b| b.is_ascii_hexdigit())
        && segment.bytes().any(|b| b.is_ascii_digit())
}
