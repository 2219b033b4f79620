//! Operation routes and the identifiers generated from them.
//!
//! An operation is addressed by an HTTP method and a path template. The
//! platform expects every operation to carry a stable identifier; it is
//! derived from the method, the handler's defining module and function name,
//! and the path:
//!
//! ```text
//! GET.app.getWidget.widgets_{id}
//! ```

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::handler::Handler;

/// Errors raised while validating a loosely typed operation route.
///
/// These are configuration errors: they surface at registration time and are
/// not recoverable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum RouteError {
    /// `path` was given as something other than a list.
    #[error("`path` must be a list, got {0}")]
    PathNotList(&'static str),

    /// `methods` was given as something other than a list.
    #[error("`methods` must be a list, got {0}")]
    MethodsNotList(&'static str),

    /// A method name outside the supported verb set.
    #[error("unsupported HTTP method: {0}")]
    UnknownMethod(String),

    /// A path element that is neither a literal nor `{"name": ...}`.
    #[error("invalid path segment at position {index}: {segment}")]
    InvalidSegment { index: usize, segment: String },
}

/// HTTP verbs an operation can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// All supported verbs.
    pub const ALL: [Method; 5] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Patch,
        Method::Delete,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| RouteError::UnknownMethod(s.to_string()))
    }
}

/// One element of an operation path template.
///
/// Literals serialize as plain strings and parameters as `{"name": "..."}`,
/// which is the shape the platform reads from the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Literal(String),
    Parameter { name: String },
}

impl PathSegment {
    pub fn literal(value: impl Into<String>) -> Self {
        PathSegment::Literal(value.into())
    }

    pub fn param(name: impl Into<String>) -> Self {
        PathSegment::Parameter { name: name.into() }
    }

    /// Parses a template such as `/Patient/{id}/$summary`.
    ///
    /// Segments wrapped in braces become parameters; empty segments (leading,
    /// trailing or doubled slashes) are dropped.
    pub fn parse_path(template: &str) -> Vec<PathSegment> {
        template
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) if !name.is_empty() => PathSegment::param(name),
                _ => PathSegment::literal(s),
            })
            .collect()
    }

    /// Rendering used inside operation identifiers.
    fn id_fragment(&self) -> String {
        match self {
            PathSegment::Literal(value) => value.clone(),
            PathSegment::Parameter { name } => format!("{{{name}}}"),
        }
    }

    fn from_json(index: usize, value: &JsonValue) -> Result<Self, RouteError> {
        match value {
            JsonValue::String(s) => Ok(PathSegment::literal(s.as_str())),
            JsonValue::Object(map) => match map.get("name") {
                Some(JsonValue::String(name)) => Ok(PathSegment::param(name.as_str())),
                _ => Err(RouteError::InvalidSegment {
                    index,
                    segment: value.to_string(),
                }),
            },
            _ => Err(RouteError::InvalidSegment {
                index,
                segment: value.to_string(),
            }),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(value: &str) -> Self {
        PathSegment::literal(value)
    }
}

/// The `{method, path}` pair stored for every operation id in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    pub method: Method,
    pub path: Vec<PathSegment>,
}

/// The methods and path template an operation handler is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRoute {
    methods: Vec<Method>,
    path: Vec<PathSegment>,
}

impl OperationRoute {
    pub fn new(
        methods: impl IntoIterator<Item = Method>,
        path: impl IntoIterator<Item = PathSegment>,
    ) -> Self {
        Self {
            methods: methods.into_iter().collect(),
            path: path.into_iter().collect(),
        }
    }

    /// Shorthand for a single-method route parsed from a template.
    pub fn single(method: Method, template: &str) -> Self {
        Self::new([method], PathSegment::parse_path(template))
    }

    /// Builds a route from loosely typed values, such as those read from a
    /// project file.
    ///
    /// `path` is checked before `methods`.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::PathNotList`] or [`RouteError::MethodsNotList`]
    /// when either argument is not an array, [`RouteError::UnknownMethod`] for
    /// a method outside [`Method::ALL`] (or not a string), and
    /// [`RouteError::InvalidSegment`] for a malformed path element.
    pub fn from_json(methods: &JsonValue, path: &JsonValue) -> Result<Self, RouteError> {
        let JsonValue::Array(path) = path else {
            return Err(RouteError::PathNotList(json_kind(path)));
        };
        let JsonValue::Array(methods) = methods else {
            return Err(RouteError::MethodsNotList(json_kind(methods)));
        };

        let path = path
            .iter()
            .enumerate()
            .map(|(index, value)| PathSegment::from_json(index, value))
            .collect::<Result<Vec<_>, _>>()?;

        let methods = methods
            .iter()
            .map(|value| match value {
                JsonValue::String(s) => s.parse(),
                other => Err(RouteError::UnknownMethod(other.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { methods, path })
    }

    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    #[must_use]
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    /// Identifier of this route for one method and handler.
    #[must_use]
    pub fn operation_id(&self, method: Method, handler: &Handler) -> String {
        let joined = self
            .path
            .iter()
            .map(PathSegment::id_fragment)
            .collect::<Vec<_>>()
            .join("_");
        format!(
            "{method}.{}.{}.{joined}",
            handler.module(),
            handler.name()
        )
    }

    pub(crate) fn descriptor(&self, method: Method) -> OperationDescriptor {
        OperationDescriptor {
            method,
            path: self.path.clone(),
        }
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "a list",
        JsonValue::Object(_) => "a map",
    }
}
