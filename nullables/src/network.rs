//! Nullable peers — scripted remote nodes behind a scripted factory.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use meridian_network::{ConnectionFactory, NetworkError, RemoteNode};
use meridian_types::{
    Distance, GpsLocation, NeighboursFilter, NodeId, NodeInfo, NodeProfile, RelationType,
};

/// A scripted peer: every query answers from fixed data, every handshake
/// answers with a fixed verdict, and all invocations are counted.
pub struct NullRemoteNode {
    colleague_count: u64,
    neighbour_count: u64,
    random_nodes: Vec<NodeInfo>,
    closest_nodes: Vec<NodeInfo>,
    accept_colleague: bool,
    accept_neighbour: bool,
    renew: bool,

    accept_colleague_calls: AtomicUsize,
    accept_neighbour_calls: AtomicUsize,
    renew_calls: AtomicUsize,
}

impl NullRemoteNode {
    pub fn new() -> Self {
        Self {
            colleague_count: 0,
            neighbour_count: 0,
            random_nodes: Vec::new(),
            closest_nodes: Vec::new(),
            accept_colleague: true,
            accept_neighbour: true,
            renew: true,
            accept_colleague_calls: AtomicUsize::new(0),
            accept_neighbour_calls: AtomicUsize::new(0),
            renew_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_colleague_count(mut self, count: u64) -> Self {
        self.colleague_count = count;
        self
    }

    pub fn with_neighbour_count(mut self, count: u64) -> Self {
        self.neighbour_count = count;
        self
    }

    /// Nodes served by `random_nodes`, truncated to the requested count.
    pub fn with_random_nodes(mut self, nodes: Vec<NodeInfo>) -> Self {
        self.random_nodes = nodes;
        self
    }

    /// Nodes served by `closest_nodes` (already in the scripted order),
    /// truncated to the requested count.
    pub fn with_closest_nodes(mut self, nodes: Vec<NodeInfo>) -> Self {
        self.closest_nodes = nodes;
        self
    }

    pub fn refusing_colleagues(mut self) -> Self {
        self.accept_colleague = false;
        self
    }

    pub fn refusing_neighbours(mut self) -> Self {
        self.accept_neighbour = false;
        self
    }

    pub fn refusing_renewals(mut self) -> Self {
        self.renew = false;
        self
    }

    pub fn accept_colleague_calls(&self) -> usize {
        self.accept_colleague_calls.load(Ordering::SeqCst)
    }

    pub fn accept_neighbour_calls(&self) -> usize {
        self.accept_neighbour_calls.load(Ordering::SeqCst)
    }

    pub fn renew_calls(&self) -> usize {
        self.renew_calls.load(Ordering::SeqCst)
    }

    /// Total handshake requests this peer has answered.
    pub fn handshake_calls(&self) -> usize {
        self.accept_colleague_calls() + self.accept_neighbour_calls()
    }
}

impl Default for NullRemoteNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteNode for NullRemoteNode {
    async fn accept_colleague(&self, _requester: NodeInfo) -> Result<bool, NetworkError> {
        self.accept_colleague_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.accept_colleague)
    }

    async fn accept_neighbour(&self, _requester: NodeInfo) -> Result<bool, NetworkError> {
        self.accept_neighbour_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.accept_neighbour)
    }

    async fn renew_node_connection(&self, _requester: NodeInfo) -> Result<bool, NetworkError> {
        self.renew_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.renew)
    }

    async fn node_count(&self, relation: RelationType) -> Result<u64, NetworkError> {
        Ok(match relation {
            RelationType::Colleague => self.colleague_count,
            RelationType::Neighbour => self.neighbour_count,
        })
    }

    async fn random_nodes(
        &self,
        max_count: u32,
        _filter: NeighboursFilter,
    ) -> Result<Vec<NodeInfo>, NetworkError> {
        Ok(self
            .random_nodes
            .iter()
            .take(max_count as usize)
            .cloned()
            .collect())
    }

    async fn closest_nodes(
        &self,
        _location: GpsLocation,
        _radius_km: Distance,
        max_count: u32,
        _filter: NeighboursFilter,
    ) -> Result<Vec<NodeInfo>, NetworkError> {
        Ok(self
            .closest_nodes
            .iter()
            .take(max_count as usize)
            .cloned()
            .collect())
    }
}

/// A factory serving scripted peers by id. Unregistered peers are
/// unreachable, which is how tests model dead seeds and dial failures.
pub struct NullConnectionFactory {
    nodes: Mutex<HashMap<NodeId, Arc<NullRemoteNode>>>,
    attempts: Mutex<Vec<NodeId>>,
}

impl NullConnectionFactory {
    pub fn new() -> Self {
        Self {
            nodes: Mutex::new(HashMap::new()),
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Make a scripted peer reachable under its id.
    pub fn register(&self, id: NodeId, node: Arc<NullRemoteNode>) {
        self.nodes.lock().unwrap().insert(id, node);
    }

    /// Every id a connection was attempted to, in order.
    pub fn connect_attempts(&self) -> Vec<NodeId> {
        self.attempts.lock().unwrap().clone()
    }

    /// Number of connection attempts to one id.
    pub fn attempts_to(&self, id: &NodeId) -> usize {
        self.attempts.lock().unwrap().iter().filter(|a| *a == id).count()
    }
}

impl Default for NullConnectionFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectionFactory for NullConnectionFactory {
    async fn connect(&self, profile: &NodeProfile) -> Result<Arc<dyn RemoteNode>, NetworkError> {
        self.attempts.lock().unwrap().push(profile.id.clone());
        let node = self.nodes.lock().unwrap().get(&profile.id).cloned();
        match node {
            Some(node) => Ok(node),
            None => Err(NetworkError::Unreachable(profile.to_string())),
        }
    }
}
