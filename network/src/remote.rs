//! The remote-callable operation surface of a peer.
//!
//! [`RemoteNode`] is the capability a connected peer exposes;
//! [`RemoteNodeClient`] implements it by translating each method into a wire
//! call through a [`RequestDispatcher`]. [`ConnectionFactory`] produces these
//! proxies on demand; the TCP factory chains
//! session → dispatcher → client, a linear ownership chain with no cycles.

use std::sync::Arc;

use async_trait::async_trait;

use meridian_messages::{Call, Response};
use meridian_types::{
    Distance, GpsLocation, NeighboursFilter, NodeInfo, NodeProfile, RelationType,
};

use crate::dispatcher::{RequestDispatcher, SessionDispatcher};
use crate::error::NetworkError;
use crate::session::Session;

/// Operations a peer answers over the wire.
#[async_trait]
pub trait RemoteNode: Send + Sync {
    /// Ask the peer to store us as a colleague. The peer runs its own
    /// admission rules and replies.
    async fn accept_colleague(&self, requester: NodeInfo) -> Result<bool, NetworkError>;

    /// Ask the peer to store us as a neighbour.
    async fn accept_neighbour(&self, requester: NodeInfo) -> Result<bool, NetworkError>;

    /// Liveness refresh; the peer accepts only if our stored location matches.
    async fn renew_node_connection(&self, requester: NodeInfo) -> Result<bool, NetworkError>;

    async fn node_count(&self, relation: RelationType) -> Result<u64, NetworkError>;

    async fn random_nodes(
        &self,
        max_count: u32,
        filter: NeighboursFilter,
    ) -> Result<Vec<NodeInfo>, NetworkError>;

    async fn closest_nodes(
        &self,
        location: GpsLocation,
        radius_km: Distance,
        max_count: u32,
        filter: NeighboursFilter,
    ) -> Result<Vec<NodeInfo>, NetworkError>;
}

/// Dials peers and hands out [`RemoteNode`] proxies.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn connect(&self, profile: &NodeProfile) -> Result<Arc<dyn RemoteNode>, NetworkError>;
}

/// Proxy exposing the node operation surface of a remote peer.
pub struct RemoteNodeClient {
    dispatcher: Arc<dyn RequestDispatcher>,
}

impl RemoteNodeClient {
    pub fn new(dispatcher: Arc<dyn RequestDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl RemoteNode for RemoteNodeClient {
    async fn accept_colleague(&self, requester: NodeInfo) -> Result<bool, NetworkError> {
        match self
            .dispatcher
            .dispatch(Call::AcceptColleague { requester })
            .await?
        {
            Response::AcceptColleague { accepted } => Ok(accepted),
            _ => Err(NetworkError::InvalidResponse),
        }
    }

    async fn accept_neighbour(&self, requester: NodeInfo) -> Result<bool, NetworkError> {
        match self
            .dispatcher
            .dispatch(Call::AcceptNeighbour { requester })
            .await?
        {
            Response::AcceptNeighbour { accepted } => Ok(accepted),
            _ => Err(NetworkError::InvalidResponse),
        }
    }

    async fn renew_node_connection(&self, requester: NodeInfo) -> Result<bool, NetworkError> {
        match self
            .dispatcher
            .dispatch(Call::RenewNodeConnection { requester })
            .await?
        {
            Response::RenewNodeConnection { accepted } => Ok(accepted),
            _ => Err(NetworkError::InvalidResponse),
        }
    }

    async fn node_count(&self, relation: RelationType) -> Result<u64, NetworkError> {
        match self
            .dispatcher
            .dispatch(Call::GetNodeCount { relation })
            .await?
        {
            Response::GetNodeCount { count } => Ok(count),
            _ => Err(NetworkError::InvalidResponse),
        }
    }

    async fn random_nodes(
        &self,
        max_count: u32,
        filter: NeighboursFilter,
    ) -> Result<Vec<NodeInfo>, NetworkError> {
        match self
            .dispatcher
            .dispatch(Call::GetRandomNodes { max_count, filter })
            .await?
        {
            Response::GetRandomNodes { nodes } => Ok(nodes),
            _ => Err(NetworkError::InvalidResponse),
        }
    }

    async fn closest_nodes(
        &self,
        location: GpsLocation,
        radius_km: Distance,
        max_count: u32,
        filter: NeighboursFilter,
    ) -> Result<Vec<NodeInfo>, NetworkError> {
        match self
            .dispatcher
            .dispatch(Call::GetClosestNodes {
                location,
                radius_km,
                max_count,
                filter,
            })
            .await?
        {
            Response::GetClosestNodes { nodes } => Ok(nodes),
            _ => Err(NetworkError::InvalidResponse),
        }
    }
}

/// Production factory: one fresh TCP session per [`connect`] call.
///
/// [`connect`]: ConnectionFactory::connect
pub struct TcpConnectionFactory;

impl TcpConnectionFactory {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TcpConnectionFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectionFactory for TcpConnectionFactory {
    async fn connect(&self, profile: &NodeProfile) -> Result<Arc<dyn RemoteNode>, NetworkError> {
        tracing::debug!(peer = %profile, "connecting");
        let session = Session::connect(&profile.contact).await?;
        let dispatcher = Arc::new(SessionDispatcher::new(session));
        Ok(Arc::new(RemoteNodeClient::new(dispatcher)))
    }
}
