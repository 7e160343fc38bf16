//! Opaque identity of one in-flight operation.
//!
//! An [`OperationKey`] is created when request processing begins and is
//! used to correlate the pre- and post-phase passes of that single request.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Newtype wrapper around [`uuid::Uuid`] identifying one in-flight operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationKey(pub Uuid);

impl OperationKey {
    /// Create a new random key.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a key from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Return the inner UUID value.
    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for OperationKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OperationKey {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for OperationKey {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}
