//! Value Objects - Immutable domain primitives
//!
//! Tenants and operations come from closed catalogs. Anything outside a
//! catalog (including a missing attribute) collapses to `Unknown`, which
//! keeps metric label cardinality bounded.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Label value used when a tenant or operation is missing or unrecognized.
pub const UNKNOWN: &str = "unknown";

/// Customer identity driving per-request behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tenant {
    Alpha,
    Beta,
    Gamma,
    Delta,
    Epsilon,
    /// Sentinel for absent or out-of-catalog tenants. Never selected for a spike.
    Unknown,
}

impl Tenant {
    /// The closed catalog. `Unknown` is deliberately not part of it.
    pub const CATALOG: [Tenant; 5] = [
        Tenant::Alpha,
        Tenant::Beta,
        Tenant::Gamma,
        Tenant::Delta,
        Tenant::Epsilon,
    ];

    /// Parse a tenant name. Matching is case-insensitive; anything else is `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "alpha" => Self::Alpha,
            "beta" => Self::Beta,
            "gamma" => Self::Gamma,
            "delta" => Self::Delta,
            "epsilon" => Self::Epsilon,
            _ => Self::Unknown,
        }
    }

    /// Parse an optional attribute, defaulting to `Unknown` when absent.
    pub fn from_attribute(value: Option<&str>) -> Self {
        value.map(Self::parse).unwrap_or(Self::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alpha => "Alpha",
            Self::Beta => "Beta",
            Self::Gamma => "Gamma",
            Self::Delta => "Delta",
            Self::Epsilon => "Epsilon",
            Self::Unknown => UNKNOWN,
        }
    }

    /// Pick a tenant uniformly from the catalog.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        *Self::CATALOG.choose(rng).unwrap_or(&Self::Alpha)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for Tenant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of simulated request, orthogonal to `Tenant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    List,
    Search,
    Export,
    Import,
    Analyze,
    Report,
    Unknown,
}

impl Operation {
    pub const CATALOG: [Operation; 10] = [
        Operation::Create,
        Operation::Read,
        Operation::Update,
        Operation::Delete,
        Operation::List,
        Operation::Search,
        Operation::Export,
        Operation::Import,
        Operation::Analyze,
        Operation::Report,
    ];

    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Self::Create,
            "read" => Self::Read,
            "update" => Self::Update,
            "delete" => Self::Delete,
            "list" => Self::List,
            "search" => Self::Search,
            "export" => Self::Export,
            "import" => Self::Import,
            "analyze" => Self::Analyze,
            "report" => Self::Report,
            _ => Self::Unknown,
        }
    }

    pub fn from_attribute(value: Option<&str>) -> Self {
        value.map(Self::parse).unwrap_or(Self::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Read => "Read",
            Self::Update => "Update",
            Self::Delete => "Delete",
            Self::List => "List",
            Self::Search => "Search",
            Self::Export => "Export",
            Self::Import => "Import",
            Self::Analyze => "Analyze",
            Self::Report => "Report",
            Self::Unknown => UNKNOWN,
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        *Self::CATALOG.choose(rng).unwrap_or(&Self::Read)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Client-visible classification of a simulated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    Ok,
    /// The pool could not hand out a connection in time.
    Unavailable,
    /// A fault was injected after the connection was acquired.
    InternalError,
}

impl StatusClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Unavailable => "unavailable",
            Self::InternalError => "internal_error",
        }
    }

    /// HTTP status code carried on the wire.
    pub fn http_code(&self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Unavailable => 503,
            Self::InternalError => 500,
        }
    }

    /// Inverse of [`StatusClass::http_code`]. Codes the simulator never emits map to `None`.
    pub fn from_http_code(code: u16) -> Option<Self> {
        match code {
            200 => Some(Self::Ok),
            503 => Some(Self::Unavailable),
            500 => Some(Self::InternalError),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Ok)
    }
}

impl std::fmt::Display for StatusClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cause label for the error counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCause {
    DbConnectionTimeout,
    InternalServerError,
}

impl ErrorCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DbConnectionTimeout => "db_connection_timeout",
            Self::InternalServerError => "internal_server_error",
        }
    }
}

impl std::fmt::Display for ErrorCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
