//! # Access Engine Errors
//!
//! Every failure the engine reports falls into one of four categories:
//!
//! - **Validation**: malformed identifiers, unknown principals, or sharing
//!   requested on an organization-independent node
//! - **Authorization**: the actor lacks the grant the operation requires
//! - **State**: the node is in the wrong attach state, its owner grant is
//!   missing, or a request disagrees with the stored owner grant
//! - **Dependency**: a mandatory store call failed
//!
//! Validation, authorization and state errors are always raised before any
//! grant is written.

use thiserror::Error;

use crate::stores::StoreError;

/// Coarse classification of an [`AccessError`] for request layers that map
/// errors onto status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Authorization,
    State,
    Dependency,
}

#[derive(Error, Debug)]
pub enum AccessError {
    // ========== Validation Errors ==========
    /// An identifier does not have the expected format
    #[error("Invalid {kind} id '{id}'")]
    InvalidIdentifier { kind: String, id: String },

    /// A referenced user or team does not exist
    #[error("Unknown {kind} '{id}'")]
    UnknownPrincipal { kind: String, id: String },

    /// Sharing was requested for a node without an organization
    #[error("Node {node_uuid} is organization-independent and cannot be shared")]
    IndependentNodeSharing { node_uuid: String },

    /// An operation that needs an organization id was given none
    #[error("Organization id is required for {operation}")]
    MissingOrganization { operation: String },

    // ========== Authorization Errors ==========
    #[error("Forbidden: user {actor_id} may not {operation} node {node_uuid}")]
    Forbidden {
        actor_id: String,
        operation: String,
        node_uuid: String,
    },

    // ========== State Errors ==========
    #[error("Node {node_uuid} already belongs to organization {organization_id}")]
    AlreadyHasOrganization {
        node_uuid: String,
        organization_id: String,
    },

    #[error("Node {node_uuid} is already organization-independent")]
    AlreadyIndependent { node_uuid: String },

    /// No owner grant exists for the node
    #[error("Node {node_uuid} has no owner grant")]
    MissingOwner { node_uuid: String },

    /// A scope change named someone other than the stored owner
    #[error("Node {node_uuid} is owned by {owner_id}, not {requested}")]
    OwnerMismatch {
        node_uuid: String,
        owner_id: String,
        requested: String,
    },

    /// A scope change named an organization the node is not bound to
    #[error("Node {node_uuid} belongs to organization '{organization_id}', not '{requested}'")]
    OrganizationMismatch {
        node_uuid: String,
        organization_id: String,
        requested: String,
    },

    // ========== Dependency Errors ==========
    #[error("Grant store failed during {operation}: {source}")]
    Store {
        operation: String,
        #[source]
        source: StoreError,
    },

    #[error("Identity store failed during {operation}: {source}")]
    Identity {
        operation: String,
        #[source]
        source: StoreError,
    },
}

impl AccessError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            AccessError::InvalidIdentifier { .. }
            | AccessError::UnknownPrincipal { .. }
            | AccessError::IndependentNodeSharing { .. }
            | AccessError::MissingOrganization { .. } => ErrorCategory::Validation,
            AccessError::Forbidden { .. } => ErrorCategory::Authorization,
            AccessError::AlreadyHasOrganization { .. }
            | AccessError::AlreadyIndependent { .. }
            | AccessError::MissingOwner { .. }
            | AccessError::OwnerMismatch { .. }
            | AccessError::OrganizationMismatch { .. } => ErrorCategory::State,
            AccessError::Store { .. } | AccessError::Identity { .. } => ErrorCategory::Dependency,
        }
    }

    pub fn forbidden(
        actor_id: impl Into<String>,
        operation: impl Into<String>,
        node_uuid: impl Into<String>,
    ) -> Self {
        AccessError::Forbidden {
            actor_id: actor_id.into(),
            operation: operation.into(),
            node_uuid: node_uuid.into(),
        }
    }

    /// Adapter for `map_err` on grant-store calls.
    pub fn store(operation: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| AccessError::Store {
            operation: operation.to_string(),
            source,
        }
    }

    /// Adapter for `map_err` on identity-store calls.
    pub fn identity(operation: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| AccessError::Identity {
            operation: operation.to_string(),
            source,
        }
    }
}

pub type AccessResult<T> = Result<T, AccessError>;
