//! Error taxonomy for configuration, entity lifecycle and grid sweeps.

use crate::entity::EntityState;
use crate::medium::SweepStats;
use thiserror::Error;

/// Problems found while reading a configuration tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("missing attribute \"{attribute}\" in <{tag}>")]
    MissingAttribute { tag: String, attribute: String },

    #[error("malformed attribute \"{attribute}\" = \"{value}\" in <{tag}>: {reason}")]
    MalformedAttribute {
        tag: String,
        attribute: String,
        value: String,
        reason: String,
    },

    #[error("unrecognized tag <{tag}>")]
    UnknownTag { tag: String },

    #[error("<{tag}> has no children")]
    NoChildren { tag: String },

    #[error("\"{parent}\" has no component \"{component}\"")]
    MissingComponent { parent: String, component: String },

    #[error("body \"{body}\" has no anchor \"{anchor}\"")]
    UnknownAnchor { body: String, anchor: String },

    #[error("anchor \"{anchor}\" is already registered on body \"{body}\"")]
    DuplicateAnchor { body: String, anchor: String },

    #[error("malformed configuration document: {reason}")]
    Document { reason: String },
}

/// Errors raised by entities and their components.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EntityError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("data size does not match, expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("index out of bounds: index = {index}, len = {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("anchor handle no longer refers to a live anchor")]
    StaleAnchor,

    #[error("entity handle is not live")]
    UnknownEntity,

    #[error("\"{entity}\" has no parent")]
    NoParent { entity: String },

    #[error("\"{entity}\" cannot go from {from:?} to {to:?}")]
    InvalidTransition {
        entity: String,
        from: EntityState,
        to: EntityState,
    },

    #[error("{context}")]
    Initialization {
        context: String,
        #[source]
        source: Box<EntityError>,
    },
}

impl EntityError {
    /// Wrap `self` with context from an enclosing composite.
    pub fn nested(self, context: impl Into<String>) -> Self {
        EntityError::Initialization {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error of a nested chain.
    pub fn root_cause(&self) -> &EntityError {
        match self {
            EntityError::Initialization { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Every message in the chain, outermost first, joined with `": "`.
    pub fn chain_message(&self) -> String {
        match self {
            EntityError::Initialization { context, source } => {
                format!("{}: {}", context, source.chain_message())
            }
            other => other.to_string(),
        }
    }
}

/// A single RAB entity that could not be registered during a sweep.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("while updating the RAB entity grid for RAB entity \"{path}\"")]
pub struct EntityUpdateError {
    pub path: String,
    #[source]
    pub source: EntityError,
}

/// Batch report of a sweep in which at least one entity failed.
///
/// The sweep itself ran to completion; `stats` describes what was registered.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} RAB entities failed to register during the sweep", .failures.len())]
pub struct SweepError {
    pub failures: Vec<EntityUpdateError>,
    pub stats: SweepStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_errors_keep_the_whole_chain() {
        let err = EntityError::from(ConfigError::MissingAttribute {
            tag: "rab".into(),
            attribute: "range".into(),
        })
        .nested("Error initializing a range and bearing entity \"rab\"")
        .nested("Failed to initialize \"robot0\"");

        assert_eq!(
            err.chain_message(),
            "Failed to initialize \"robot0\": Error initializing a range and bearing entity \"rab\": missing attribute \"range\" in <rab>"
        );
        assert!(matches!(
            err.root_cause(),
            EntityError::Config(ConfigError::MissingAttribute { .. })
        ));
    }

    #[test]
    fn size_mismatch_message_names_both_sizes() {
        let err = EntityError::SizeMismatch {
            expected: 8,
            actual: 4,
        };
        assert_eq!(err.to_string(), "data size does not match, expected 8, got 4");
    }
}
