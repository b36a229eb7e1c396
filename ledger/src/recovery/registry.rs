//! # Node & User Registries
//!
//! Two flat maps. Nodes are machines running the guardian agent; they
//! self-register with a public key and are never deleted. Users are
//! keyed by their recovery key — an external identifier distinct from
//! the identity that owns the funds — and carry the three guardian
//! descriptors chosen at registration.
//!
//! Listing order is hash-map iteration order, which is unspecified.
//! Callers that need determinism sort; tests compare as sets.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GUARDIAN_COUNT;

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A machine eligible to witness recoveries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// The node's identity principal.
    pub id: String,
    /// The node's public key, as opaque text supplied at registration.
    pub public_key: String,
}

/// All registered guardian nodes, keyed by identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRegistry {
    nodes: HashMap<String, Node>,
}

impl NodeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Registers a node, replacing any prior key for the same identity.
    /// Idempotent: re-registering with the same key changes nothing
    /// observable.
    pub fn register(&mut self, id: &str, public_key: &str) {
        debug!(id, "node registered");
        self.nodes.insert(
            id.to_string(),
            Node {
                id: id.to_string(),
                public_key: public_key.to_string(),
            },
        );
    }

    /// Looks up a node by identity.
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// All registered nodes. Order is unspecified.
    pub fn list(&self) -> Vec<Node> {
        self.nodes.values().cloned().collect()
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no node has registered yet.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over all nodes in map order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// One of the three guardian descriptors configured per user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guardian {
    /// Opaque condition tag describing how this guardian verifies the
    /// user off-ledger (e.g., email challenge vs. hardware token). The
    /// ledger stores it and never interprets it.
    pub condition: u8,
    /// The guardian node's identity principal.
    pub node_id: String,
}

/// A registered user and their guardian configuration. Immutable after
/// registration except by whole-record replacement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// The identity that owns the funds and may start recoveries.
    pub uid: String,
    /// The external recovery key — primary key for this record and its
    /// paired recovery record.
    pub recovery_key: String,
    /// The three guardians, in registration order.
    pub guardians: [Guardian; GUARDIAN_COUNT],
}

/// All registered users, keyed by recovery key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRegistry {
    users: HashMap<String, UserRecord>,
}

impl UserRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            users: HashMap::new(),
        }
    }

    /// Registers a user, replacing any prior record under the same
    /// recovery key. Replace-on-conflict is deliberate: the caller that
    /// re-registers a key abandons the old guardian set, and the facade
    /// resets the paired recovery record in the same call.
    pub fn register(&mut self, record: UserRecord) {
        debug!(uid = %record.uid, key = %record.recovery_key, "user registered");
        self.users.insert(record.recovery_key.clone(), record);
    }

    /// Looks up a user by recovery key.
    pub fn get(&self, recovery_key: &str) -> Option<&UserRecord> {
        self.users.get(recovery_key)
    }

    /// Number of registered users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Returns `true` if no user has registered yet.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Iterates over all user records in map order.
    pub fn iter(&self) -> impl Iterator<Item = &UserRecord> {
        self.users.values()
    }
}
