//! Outcome of a transform run: created/removed schemas and data-quality warnings.

use serde::{Deserialize, Serialize};

/// What a [`transform`](crate::transform) run changed and what it could not make sense of.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Synthesized schemas (union wrappers and self-reference helpers), in creation order.
    pub created: Vec<String>,
    /// Schemas deleted by the unused-schema stage.
    pub removed: Vec<String>,
    /// Schemas whose `discriminator` was removed.
    pub stripped_discriminators: Vec<String>,
    /// Data-quality warnings; none of them interrupted the run.
    pub warnings: Vec<Warning>,
}

impl Report {
    /// `true` when the run produced no warnings.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// A recoverable problem found in a discriminator mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// Schema declaring the discriminator.
    pub schema: String,
    /// JSON pointer of the offending mapping entry.
    pub location: String,
    /// Classification of the warning.
    pub kind: WarningKind,
    /// Human-readable description.
    pub message: String,
}

/// Classification of mapping warnings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WarningKind {
    /// The mapping value is not a local schema reference (or bare schema name).
    ///
    /// The entry stays in the mapping and is ignored by the engine.
    MalformedMappingRef {
        /// Discriminator value of the entry.
        value: String,
    },
    /// The mapping value points at a schema that does not exist.
    ///
    /// The entry stays in the mapping and is ignored by the engine.
    MissingMappingTarget {
        /// Discriminator value of the entry.
        value: String,
        /// Name of the missing schema.
        target: String,
    },
    /// The mapped schema does not inherit from the discriminator's owner.
    ///
    /// The entry stays in the mapping but is left out of the union.
    NotInherited {
        /// Discriminator value of the entry.
        value: String,
        /// Name of the mapped schema.
        child: String,
    },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}
