//! Spatial storage for the meridian overlay.
//!
//! The [`SpatialDatabase`] trait is the authoritative local view of both
//! relations plus the geometric queries on top of them. The rest of the
//! workspace depends only on the trait; [`MemorySpatialDb`] is the bundled
//! backend, and a persistent backend would implement the same contract.

pub mod error;
pub mod geo;
pub mod memory;

pub use error::StoreError;
pub use memory::MemorySpatialDb;

use meridian_types::{Distance, GpsLocation, NeighboursFilter, NodeDbEntry, NodeId, NodeInfo, RelationType};

/// Authoritative local view of the Colleague and Neighbour relations.
///
/// Implementations must serialize mutating operations; readers observe a
/// consistent snapshot.
pub trait SpatialDatabase: Send + Sync {
    /// Insert or overwrite an entry. Returns whether the entry was stored.
    fn store(&self, entry: NodeDbEntry) -> Result<bool, StoreError>;

    /// Look up a stored peer snapshot by identity.
    fn load(&self, id: &NodeId) -> Result<Option<NodeInfo>, StoreError>;

    /// Replace a stored entry's snapshot, preserving relation and role.
    /// Returns `false` when the peer is not stored.
    fn update(&self, info: &NodeInfo) -> Result<bool, StoreError>;

    /// Remove a stored peer. Returns `false` when the peer is not stored.
    fn remove(&self, id: &NodeId) -> Result<bool, StoreError>;

    /// Number of stored peers with the given relation.
    fn node_count(&self, relation: RelationType) -> Result<usize, StoreError>;

    /// Maximum self-distance over all current Neighbours, 0 if there are none.
    fn neighbourhood_radius_km(&self) -> Result<Distance, StoreError>;

    /// Up to `max_count` peers sampled uniformly without replacement.
    fn random_nodes(
        &self,
        max_count: usize,
        filter: NeighboursFilter,
    ) -> Result<Vec<NodeInfo>, StoreError>;

    /// Peers within `radius_km` of `center`, ascending by distance with ties
    /// broken by id, truncated to `max_count`.
    fn closest_nodes(
        &self,
        center: &GpsLocation,
        radius_km: Distance,
        max_count: usize,
        filter: NeighboursFilter,
    ) -> Result<Vec<NodeInfo>, StoreError>;

    /// Great-circle distance between two locations.
    fn distance_km(&self, a: &GpsLocation, b: &GpsLocation) -> Distance {
        geo::distance_km(a, b)
    }
}
