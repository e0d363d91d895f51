//! Mechanism identity and requirement sets.
//!
//! A mechanism is the unit of mutual exclusion: an exclusive-access
//! controllable resource such as the drivetrain or the elevator. The core
//! never talks to hardware itself; it only tracks which action currently
//! owns each mechanism.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Strongly-typed mechanism ID.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct MechanismId(pub String);

impl MechanismId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MechanismId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for MechanismId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&MechanismId> for MechanismId {
    fn from(value: &MechanismId) -> Self {
        value.clone()
    }
}

impl fmt::Display for MechanismId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for MechanismId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// The set of mechanisms an action must own to run.
///
/// Ordered so that acquisition and release walk mechanisms in a stable order.
pub type MechanismSet = BTreeSet<MechanismId>;

/// Build a requirement set from anything ID-like.
pub fn requires<I, T>(ids: I) -> MechanismSet
where
    I: IntoIterator<Item = T>,
    T: Into<MechanismId>,
{
    ids.into_iter().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_deduplicates_and_orders() {
        let set = requires(["wrist", "elevator", "wrist"]);
        assert_eq!(set.len(), 2);
        let ids: Vec<&str> = set.iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["elevator", "wrist"]);
    }

    #[test]
    fn test_mechanism_id_display_round_trip() {
        let id = MechanismId::from("drivetrain");
        assert_eq!(id.to_string(), "drivetrain");
        assert_eq!(MechanismId::from(id.to_string()), id);
    }
}
