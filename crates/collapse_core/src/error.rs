//! Error types for collapse runs and catalog/config IO.

use crate::grid::Position;
use std::fmt;

/// Errors raised by the collapse algorithm itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollapseError {
    /// The run cannot begin (empty catalog, zero dimensions, zero round cap, bad catalog).
    InvalidConfiguration(String),
    /// A weighted pick was asked to choose among zero candidates.
    EmptyCandidateSet,
    /// A cell's candidate set became empty.
    ContradictionDetected { position: Position },
    /// The round cap was reached while cells were still uncollapsed.
    IterationCapReached { remaining: usize },
    /// A round was requested before the run was started.
    NotStarted,
    /// A tile name was referenced but never declared.
    UnknownTile(String),
}

impl CollapseError {
    /// Grid position the error is tied to, if any.
    pub fn position(&self) -> Option<Position> {
        match self {
            CollapseError::ContradictionDetected { position } => Some(*position),
            _ => None,
        }
    }
}

impl fmt::Display for CollapseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollapseError::InvalidConfiguration(msg) => {
                write!(f, "invalid configuration: {}", msg)
            }
            CollapseError::EmptyCandidateSet => {
                write!(f, "weighted pick called with no candidates")
            }
            CollapseError::ContradictionDetected { position } => {
                write!(f, "contradiction: cell {} has no remaining candidates", position)
            }
            CollapseError::IterationCapReached { remaining } => {
                write!(f, "round cap reached with {} uncollapsed cells", remaining)
            }
            CollapseError::NotStarted => write!(f, "run has not been started"),
            CollapseError::UnknownTile(name) => write!(f, "unknown tile: {}", name),
        }
    }
}

impl std::error::Error for CollapseError {}

/// Errors raised while loading catalogs, configs or snapshots.
#[derive(Debug)]
pub enum LoadError {
    /// File system error
    Io(std::io::Error),
    /// JSON (de)serialization error
    Json(String),
    /// XML parsing error
    Xml(String),
    /// Missing required attribute
    MissingAttribute { element: String, attribute: String },
    /// Invalid attribute value
    InvalidAttribute {
        element: String,
        attribute: String,
        value: String,
    },
    /// The definitions parsed but do not form a valid catalog
    Catalog(CollapseError),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "IO error: {}", e),
            LoadError::Json(msg) => write!(f, "JSON error: {}", msg),
            LoadError::Xml(msg) => write!(f, "XML error: {}", msg),
            LoadError::MissingAttribute { element, attribute } => {
                write!(f, "missing attribute '{}' in <{}>", attribute, element)
            }
            LoadError::InvalidAttribute {
                element,
                attribute,
                value,
            } => write!(
                f,
                "invalid value '{}' for attribute '{}' in <{}>",
                value, attribute, element
            ),
            LoadError::Catalog(e) => write!(f, "catalog error: {}", e),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(e) => Some(e),
            LoadError::Catalog(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadError::Io(e)
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(e: serde_json::Error) -> Self {
        LoadError::Json(e.to_string())
    }
}

impl From<CollapseError> for LoadError {
    fn from(e: CollapseError) -> Self {
        LoadError::Catalog(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contradiction_carries_position() {
        let err = CollapseError::ContradictionDetected {
            position: Position::new(2, 3),
        };
        assert_eq!(err.position(), Some(Position::new(2, 3)));
        assert!(err.to_string().contains("(2, 3)"));
        assert_eq!(CollapseError::EmptyCandidateSet.position(), None);
    }

    #[test]
    fn test_load_error_wraps_catalog_error() {
        let err: LoadError = CollapseError::UnknownTile("lava".to_string()).into();
        assert!(err.to_string().contains("lava"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
