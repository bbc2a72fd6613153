//! Server-side dispatcher: maps wire calls onto the node operation surface.

use std::sync::Arc;

use async_trait::async_trait;

use meridian_messages::{Call, Response};
use meridian_network::{NetworkError, RequestDispatcher};

use crate::error::NodeError;
use crate::node::Node;

/// Serves the local [`Node`] behind the transport.
pub struct NodeDispatcher {
    node: Arc<Node>,
}

impl NodeDispatcher {
    pub fn new(node: Arc<Node>) -> Self {
        Self { node }
    }
}

fn internal(e: NodeError) -> NetworkError {
    NetworkError::Dispatch(e.to_string())
}

#[async_trait]
impl RequestDispatcher for NodeDispatcher {
    async fn dispatch(&self, call: Call) -> Result<Response, NetworkError> {
        Ok(match call {
            Call::AcceptColleague { requester } => Response::AcceptColleague {
                accepted: self
                    .node
                    .accept_colleague(requester)
                    .await
                    .map_err(internal)?,
            },
            Call::AcceptNeighbour { requester } => Response::AcceptNeighbour {
                accepted: self
                    .node
                    .accept_neighbour(requester)
                    .await
                    .map_err(internal)?,
            },
            Call::RenewNodeConnection { requester } => Response::RenewNodeConnection {
                accepted: self.node.renew_node_connection(requester).map_err(internal)?,
            },
            Call::GetNodeCount { relation } => Response::GetNodeCount {
                count: self.node.node_count(relation).map_err(internal)? as u64,
            },
            Call::GetNeighbourhoodRadiusKm => Response::GetNeighbourhoodRadiusKm {
                radius_km: self.node.neighbourhood_radius_km().map_err(internal)?,
            },
            Call::GetRandomNodes { max_count, filter } => Response::GetRandomNodes {
                nodes: self
                    .node
                    .random_nodes(max_count as usize, filter)
                    .map_err(internal)?,
            },
            Call::GetClosestNodes {
                location,
                radius_km,
                max_count,
                filter,
            } => Response::GetClosestNodes {
                nodes: self
                    .node
                    .closest_nodes(&location, radius_km, max_count as usize, filter)
                    .map_err(internal)?,
            },
            Call::RegisterService { service, profile } => {
                let registered = match self.node.register_service(service, profile) {
                    Ok(()) => true,
                    Err(NodeError::ServiceAlreadyRegistered(_)) => false,
                    Err(e) => return Err(internal(e)),
                };
                Response::RegisterService { registered }
            }
            Call::RemoveService { service } => {
                let removed = match self.node.remove_service(service) {
                    Ok(()) => true,
                    Err(NodeError::ServiceNotRegistered(_)) => false,
                    Err(e) => return Err(internal(e)),
                };
                Response::RemoveService { removed }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_nullables::NullConnectionFactory;
    use meridian_store::MemorySpatialDb;
    use meridian_types::{
        GpsLocation, NetworkContact, NodeId, NodeInfo, NodeProfile, RelationType, ServiceProfile,
        ServiceType,
    };
    use std::net::{Ipv4Addr, SocketAddrV4};

    fn info(id: &str, lat: f64, lon: f64) -> NodeInfo {
        NodeInfo::new(
            NodeProfile::new(
                NodeId::new(id),
                NetworkContact::ipv4(SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), 5555)),
            ),
            GpsLocation::new(lat, lon),
        )
    }

    fn dispatcher() -> NodeDispatcher {
        let db = Arc::new(MemorySpatialDb::new(GpsLocation::new(0.0, 0.0)));
        let node = Node::new(
            info("self", 0.0, 0.0),
            db,
            Arc::new(NullConnectionFactory::new()),
            Vec::new(),
        )
        .unwrap();
        NodeDispatcher::new(Arc::new(node))
    }

    #[tokio::test]
    async fn acceptor_handshake_stores_the_requester() {
        let d = dispatcher();
        let response = d
            .dispatch(Call::AcceptNeighbour {
                requester: info("peer", 0.0, 0.5),
            })
            .await
            .unwrap();
        assert_eq!(response, Response::AcceptNeighbour { accepted: true });

        let response = d
            .dispatch(Call::GetNodeCount {
                relation: RelationType::Neighbour,
            })
            .await
            .unwrap();
        assert_eq!(response, Response::GetNodeCount { count: 1 });
    }

    #[tokio::test]
    async fn out_of_range_neighbour_is_a_negative_result() {
        let d = dispatcher();
        let response = d
            .dispatch(Call::AcceptNeighbour {
                requester: info("peer", 40.0, 40.0),
            })
            .await
            .unwrap();
        assert_eq!(response, Response::AcceptNeighbour { accepted: false });
    }

    #[tokio::test]
    async fn duplicate_service_registration_is_a_negative_result() {
        let d = dispatcher();
        let profile = ServiceProfile::new(
            "svc",
            NetworkContact::ipv4(SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), 7000)),
        );
        let first = d
            .dispatch(Call::RegisterService {
                service: ServiceType::Token,
                profile: profile.clone(),
            })
            .await
            .unwrap();
        assert_eq!(first, Response::RegisterService { registered: true });

        let second = d
            .dispatch(Call::RegisterService {
                service: ServiceType::Token,
                profile,
            })
            .await
            .unwrap();
        assert_eq!(second, Response::RegisterService { registered: false });

        let removed = d
            .dispatch(Call::RemoveService {
                service: ServiceType::Token,
            })
            .await
            .unwrap();
        assert_eq!(removed, Response::RemoveService { removed: true });

        let again = d
            .dispatch(Call::RemoveService {
                service: ServiceType::Token,
            })
            .await
            .unwrap();
        assert_eq!(again, Response::RemoveService { removed: false });
    }

    #[tokio::test]
    async fn renewal_round_trips_through_the_dispatcher() {
        let d = dispatcher();
        d.dispatch(Call::AcceptNeighbour {
            requester: info("peer", 0.0, 0.5),
        })
        .await
        .unwrap();

        let same = d
            .dispatch(Call::RenewNodeConnection {
                requester: info("peer", 0.0, 0.5),
            })
            .await
            .unwrap();
        assert_eq!(same, Response::RenewNodeConnection { accepted: true });

        let moved = d
            .dispatch(Call::RenewNodeConnection {
                requester: info("peer", 3.0, 3.0),
            })
            .await
            .unwrap();
        assert_eq!(moved, Response::RenewNodeConnection { accepted: false });
    }
}
