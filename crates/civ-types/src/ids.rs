//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Agents and memory items carry strongly-typed IDs so the two cannot be
//! mixed up at compile time. Memory ids use UUID v7 (time-ordered). Agent
//! ids can also be derived from the run seed and the agent's name, so a
//! restarted simulation finds the memories its agents wrote before. Events
//! and epochs are keyed by store-assigned sequence numbers instead and have
//! no wrapper here.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }

            /// Parse an identifier from its hyphenated string form.
            ///
            /// # Errors
            ///
            /// Returns [`uuid::Error`] if the string is not a valid UUID.
            pub fn parse(value: &str) -> Result<Self, uuid::Error> {
                Uuid::parse_str(value).map(Self)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Stable identifier for an agent, fixed at creation.
    AgentId
}

/// Namespace for name-derived agent ids.
const AGENT_NAMESPACE: Uuid = Uuid::from_u128(0x6a1c_2f0e_94d3_4b7a_8e25_c0f1_d3b9_7e41);

impl AgentId {
    /// Deterministic id (UUID v5) for the agent called `name` in a run with
    /// `seed`. Unseeded runs share one namespace keyed by name alone.
    pub fn derived(seed: Option<u64>, name: &str) -> Self {
        let key = match seed {
            Some(seed) => format!("{seed}/{name}"),
            None => format!("unseeded/{name}"),
        };
        Self(Uuid::new_v5(&AGENT_NAMESPACE, key.as_bytes()))
    }
}

define_id! {
    /// Identifier for a memory item; doubles as its vector-store document key.
    MemoryId
}
