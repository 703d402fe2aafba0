use thiserror::Error;

use crate::access::Route;
use crate::models::Role;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Reasons a session may not see or do something.
///
/// These are expected outcomes, shown to the user along with where they get
/// sent instead. They never abort the process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("not signed in")]
    Unauthenticated,

    #[error("role {role} may not open {route}")]
    Forbidden { role: Role, route: Route },

    #[error("role {role} has no data scope (missing school affiliation or unsupported role)")]
    NoScope { role: Role },

    #[error("no user with email {0}")]
    UnknownIdentity(String),
}

impl AccessError {
    /// Where navigation lands after this denial.
    pub fn redirect(&self) -> Route {
        match self {
            AccessError::Unauthenticated | AccessError::UnknownIdentity(_) => Route::Login,
            AccessError::Forbidden { .. } | AccessError::NoScope { .. } => Route::Dashboard,
        }
    }
}

/// Rejected form input, before anything reaches the backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("student {0} is already placed")]
    StudentAlreadyPlaced(String),

    #[error("company {0} is not an active collaborator")]
    CompanyInactive(String),

    #[error("{kind} {id} is not visible to this session")]
    NotInScope { kind: &'static str, id: uuid::Uuid },
}
