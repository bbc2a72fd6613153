//! Peer snapshots and view membership.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::contact::NodeProfile;
use crate::location::GpsLocation;

/// Immutable snapshot of a peer: identity, contact, and position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub profile: NodeProfile,
    pub location: GpsLocation,
}

impl NodeInfo {
    pub fn new(profile: NodeProfile, location: GpsLocation) -> Self {
        Self { profile, location }
    }

    pub fn id(&self) -> &crate::id::NodeId {
        &self.profile.id
    }
}

impl fmt::Display for NodeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.profile, self.location)
    }
}

/// Which of the two disjoint views a stored peer belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationType {
    /// World-spread view: peers kept apart by the bubble repulsion rule.
    Colleague,
    /// Peers geographically close to self.
    Neighbour,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Colleague => "colleague",
            Self::Neighbour => "neighbour",
        }
    }
}

/// Which side of the admission handshake a stored peer was on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleType {
    /// We asked the peer for permission before storing it.
    Initiator,
    /// The peer asked us; only local admission rules apply.
    Acceptor,
}

/// Selection predicate for spatial queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NeighboursFilter {
    /// Draw from Colleague ∪ Neighbour.
    Included,
    /// Colleagues only.
    Excluded,
    /// Neighbours only.
    NeighboursOnly,
}

impl NeighboursFilter {
    /// Whether an entry with the given relation passes this filter.
    pub fn matches(&self, relation: RelationType) -> bool {
        match self {
            Self::Included => true,
            Self::Excluded => relation == RelationType::Colleague,
            Self::NeighboursOnly => relation == RelationType::Neighbour,
        }
    }
}

/// What is actually persisted for a peer: the snapshot plus its view
/// membership and handshake role.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeDbEntry {
    pub info: NodeInfo,
    pub relation: RelationType,
    pub role: RoleType,
}

impl NodeDbEntry {
    pub fn new(info: NodeInfo, relation: RelationType, role: RoleType) -> Self {
        Self {
            info,
            relation,
            role,
        }
    }
}
