//! The meridian node — maintains the two views and enforces admission.
//!
//! A node keeps Neighbours (geographically close peers, bounded radius and
//! count) and Colleagues (world-spread peers kept apart by the bubble
//! repulsion rule) in a shared spatial database, answers the remote
//! operation surface, and hosts the application services registry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use meridian_network::{ConnectionFactory, RemoteNode};
use meridian_store::SpatialDatabase;
use meridian_types::{
    Distance, GpsLocation, NeighboursFilter, NetworkContact, NodeDbEntry, NodeId, NodeInfo,
    NodeProfile, RelationType, RoleType, ServiceProfile, ServiceType,
};

use crate::error::NodeError;

/// Neighbours must be strictly closer than this to self.
pub const NEIGHBOURHOOD_MAX_RANGE_KM: Distance = 100.0;

/// Upper bound on the Neighbour view.
pub const NEIGHBOURHOOD_MAX_NODE_COUNT: usize = 100;

/// How many random candidates to request from a peer during world discovery.
pub const INIT_WORLD_RANDOM_NODE_COUNT: usize = 100;

/// World discovery aims to fill this fraction of the seed's world size.
pub const INIT_WORLD_NODE_FILL_TARGET_RATE: f64 = 0.75;

/// How many closest nodes to request per peer during neighbourhood discovery.
pub const INIT_NEIGHBOURHOOD_QUERY_NODE_COUNT: usize = 10;

/// The compiled-in seed peers contacted on first start.
pub fn default_seed_nodes() -> Vec<NodeInfo> {
    vec![
        NodeInfo::new(
            NodeProfile::new(
                NodeId::new("FirstSeedNodeId"),
                NetworkContact::ipv4("1.2.3.4:5555".parse().expect("valid seed address")),
            ),
            GpsLocation::new(1.0, 2.0),
        ),
        NodeInfo::new(
            NodeProfile::new(
                NodeId::new("SecondSeedNodeId"),
                NetworkContact::ipv4("6.7.8.9:5555".parse().expect("valid seed address")),
            ),
            GpsLocation::new(3.0, 4.0),
        ),
    ]
}

/// A running overlay node.
pub struct Node {
    info: NodeInfo,
    db: Arc<dyn SpatialDatabase>,
    connections: Arc<dyn ConnectionFactory>,
    seeds: Vec<NodeInfo>,
    services: RwLock<HashMap<ServiceType, ServiceProfile>>,
}

impl Node {
    /// Create a node over a spatial database and a connection factory.
    ///
    /// Call [`bootstrap`](crate::Node::bootstrap) afterwards to run network
    /// discovery when the world view is empty.
    pub fn new(
        info: NodeInfo,
        db: Arc<dyn SpatialDatabase>,
        connections: Arc<dyn ConnectionFactory>,
        seeds: Vec<NodeInfo>,
    ) -> Result<Self, NodeError> {
        if !info.profile.contact.has_endpoint() {
            return Err(NodeError::Config(
                "node contact needs at least one address family".into(),
            ));
        }
        if !info.location.is_valid() {
            return Err(NodeError::Config(format!(
                "invalid node location {}",
                info.location
            )));
        }
        Ok(Self {
            info,
            db,
            connections,
            seeds,
            services: RwLock::new(HashMap::new()),
        })
    }

    /// This node's own immutable snapshot.
    pub fn info(&self) -> &NodeInfo {
        &self.info
    }

    pub(crate) fn seeds(&self) -> &[NodeInfo] {
        &self.seeds
    }

    pub(crate) fn db(&self) -> &Arc<dyn SpatialDatabase> {
        &self.db
    }

    // ── Services registry ───────────────────────────────────────────────

    /// Snapshot of the currently registered services.
    pub fn services(&self) -> HashMap<ServiceType, ServiceProfile> {
        self.services.read().expect("services lock").clone()
    }

    /// Register an application service. Fails if the type is already taken;
    /// the registry is left unchanged in that case.
    pub fn register_service(
        &self,
        service: ServiceType,
        profile: ServiceProfile,
    ) -> Result<(), NodeError> {
        let mut services = self.services.write().expect("services lock");
        if services.contains_key(&service) {
            return Err(NodeError::ServiceAlreadyRegistered(service));
        }
        services.insert(service, profile);
        Ok(())
    }

    /// Remove a registered service. Fails if the type was never registered.
    pub fn remove_service(&self, service: ServiceType) -> Result<(), NodeError> {
        let mut services = self.services.write().expect("services lock");
        if services.remove(&service).is_none() {
            return Err(NodeError::ServiceNotRegistered(service));
        }
        Ok(())
    }

    // ── Remote operation surface ────────────────────────────────────────

    /// Acceptor side of the colleague handshake: run our admission rules on
    /// the requester and store it on success.
    pub async fn accept_colleague(&self, requester: NodeInfo) -> Result<bool, NodeError> {
        Ok(self
            .safe_store_node(
                NodeDbEntry::new(requester, RelationType::Colleague, RoleType::Acceptor),
                None,
            )
            .await)
    }

    /// Acceptor side of the neighbour handshake.
    pub async fn accept_neighbour(&self, requester: NodeInfo) -> Result<bool, NodeError> {
        Ok(self
            .safe_store_node(
                NodeDbEntry::new(requester, RelationType::Neighbour, RoleType::Acceptor),
                None,
            )
            .await)
    }

    /// Liveness refresh. Accepted only when the presented location equals
    /// the stored one: a moved node would invalidate the bubble geometry,
    /// so renewal under a changed location is rejected.
    pub fn renew_node_connection(&self, updated: NodeInfo) -> Result<bool, NodeError> {
        match self.db.load(updated.id())? {
            Some(stored) if stored.location == updated.location => {
                Ok(self.db.update(&updated)?)
            }
            Some(_) => {
                tracing::debug!(peer = %updated.id(), "renewal rejected: location changed");
                Ok(false)
            }
            None => Ok(false),
        }
    }

    pub fn node_count(&self, relation: RelationType) -> Result<usize, NodeError> {
        Ok(self.db.node_count(relation)?)
    }

    pub fn neighbourhood_radius_km(&self) -> Result<Distance, NodeError> {
        Ok(self.db.neighbourhood_radius_km()?)
    }

    pub fn random_nodes(
        &self,
        max_count: usize,
        filter: NeighboursFilter,
    ) -> Result<Vec<NodeInfo>, NodeError> {
        Ok(self.db.random_nodes(max_count, filter)?)
    }

    pub fn closest_nodes(
        &self,
        location: &GpsLocation,
        radius_km: Distance,
        max_count: usize,
        filter: NeighboursFilter,
    ) -> Result<Vec<NodeInfo>, NodeError> {
        Ok(self.db.closest_nodes(location, radius_km, max_count, filter)?)
    }

    // ── Bubble geometry ─────────────────────────────────────────────────

    /// Repulsion radius around a location: grows logarithmically with the
    /// distance from self, so distant colleagues are spaced farther apart.
    pub fn bubble_size_km(&self, location: &GpsLocation) -> Distance {
        let distance = self.db.distance_km(&self.info.location, location);
        (distance + 2500.0).log10() * 500.0 - 1700.0
    }

    /// Whether a new colleague at `location` would overlap the bubble of the
    /// closest already-stored colleague. Touching bubbles count as overlap:
    /// admission requires strict separation.
    pub fn bubble_overlaps(&self, location: &GpsLocation) -> Result<bool, NodeError> {
        let closest = self.db.closest_nodes(
            location,
            Distance::MAX,
            1,
            NeighboursFilter::Excluded,
        )?;
        // No colleague stored yet: nothing to overlap.
        let Some(closest) = closest.first() else {
            return Ok(false);
        };

        let closest_bubble = self.bubble_size_km(&closest.location);
        let candidate_bubble = self.bubble_size_km(location);
        let gap = self.db.distance_km(location, &closest.location);
        Ok(closest_bubble + candidate_bubble >= gap)
    }

    // ── Admission ───────────────────────────────────────────────────────

    /// Connect to a peer, converting every failure into `None`. Connecting
    /// to ourselves is pointless and always yields `None`.
    pub(crate) async fn safe_connect(&self, profile: &NodeProfile) -> Option<Arc<dyn RemoteNode>> {
        if profile.id == self.info.profile.id {
            return None;
        }
        match self.connections.connect(profile).await {
            Ok(connection) => Some(connection),
            Err(e) => {
                tracing::warn!(peer = %profile, error = %e, "failed to connect");
                None
            }
        }
    }

    /// Admission gate for both views.
    ///
    /// Pre-checks local acceptability, then — for the Initiator role —
    /// obtains the candidate's permission over `connection` (dialling one
    /// when none is given), and finally stores the entry. Every failure
    /// along the way is a rejection, never an error of the surrounding
    /// operation.
    pub(crate) async fn safe_store_node(
        &self,
        entry: NodeDbEntry,
        connection: Option<Arc<dyn RemoteNode>>,
    ) -> bool {
        match self.try_store_node(entry, connection).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "unexpected error storing node");
                false
            }
        }
    }

    async fn try_store_node(
        &self,
        entry: NodeDbEntry,
        mut connection: Option<Arc<dyn RemoteNode>>,
    ) -> Result<bool, NodeError> {
        // Self is never a member of either view.
        if entry.info.id() == self.info.id() {
            return Ok(false);
        }

        match entry.relation {
            RelationType::Neighbour => {
                let count = self.db.node_count(RelationType::Neighbour)?;
                let distance = self
                    .db
                    .distance_km(&self.info.location, &entry.info.location);
                if count >= NEIGHBOURHOOD_MAX_NODE_COUNT || distance >= NEIGHBOURHOOD_MAX_RANGE_KM
                {
                    tracing::debug!(
                        peer = %entry.info.id(),
                        count,
                        distance,
                        "neighbour candidate rejected locally"
                    );
                    return Ok(false);
                }
            }
            RelationType::Colleague => {
                if self.bubble_overlaps(&entry.info.location)? {
                    tracing::debug!(
                        peer = %entry.info.id(),
                        location = %entry.info.location,
                        "colleague candidate rejected: bubble overlap"
                    );
                    return Ok(false);
                }
            }
        }

        if entry.role == RoleType::Initiator {
            if connection.is_none() {
                connection = self.safe_connect(&entry.info.profile).await;
            }
            let Some(connection) = connection else {
                return Ok(false);
            };

            // Ask for the candidate's permission to add it.
            let permitted = match entry.relation {
                RelationType::Colleague => {
                    connection.accept_colleague(self.info.clone()).await?
                }
                RelationType::Neighbour => {
                    connection.accept_neighbour(self.info.clone()).await?
                }
            };
            if !permitted {
                tracing::debug!(peer = %entry.info.id(), "candidate refused the handshake");
                return Ok(false);
            }
        }

        Ok(self.db.store(entry)?)
    }
}
