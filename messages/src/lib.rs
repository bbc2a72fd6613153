//! Wire message types for meridian node-to-node communication.
//!
//! Every frame body on the wire is a bincode-serialized [`Message`]: either a
//! versioned [`Request`] or a [`Response`]. The 5-byte transport header that
//! precedes the body belongs to the framing codec, not to this crate.

use serde::{Deserialize, Serialize};

use meridian_types::{
    Distance, GpsLocation, NeighboursFilter, NodeInfo, RelationType, ServiceProfile, ServiceType,
};

/// Protocol version tag carried by every request.
pub const PROTOCOL_VERSION: &str = "1";

/// Top-level envelope: a frame body is exactly one of these.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Message {
    Request(Request),
    Response(Response),
}

/// A remote invocation of the node operation surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Protocol version string; this implementation always sends `"1"`.
    pub version: String,
    pub call: Call,
}

impl Request {
    /// Wrap a call with the current protocol version.
    pub fn new(call: Call) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            call,
        }
    }
}

/// The remotely callable node operations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Call {
    /// Handshake: the sender asks to be stored as a colleague of the receiver.
    AcceptColleague { requester: NodeInfo },
    /// Handshake: the sender asks to be stored as a neighbour of the receiver.
    AcceptNeighbour { requester: NodeInfo },
    /// Liveness refresh; accepted only if the stored location matches.
    RenewNodeConnection { requester: NodeInfo },
    GetNodeCount { relation: RelationType },
    GetNeighbourhoodRadiusKm,
    GetRandomNodes {
        max_count: u32,
        filter: NeighboursFilter,
    },
    GetClosestNodes {
        location: GpsLocation,
        radius_km: Distance,
        max_count: u32,
        filter: NeighboursFilter,
    },
    RegisterService {
        service: ServiceType,
        profile: ServiceProfile,
    },
    RemoveService { service: ServiceType },
}

/// Reply to a [`Call`], one variant per operation.
///
/// Admission and registry rejections are legitimate negative results here,
/// never transport errors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Response {
    AcceptColleague { accepted: bool },
    AcceptNeighbour { accepted: bool },
    RenewNodeConnection { accepted: bool },
    GetNodeCount { count: u64 },
    GetNeighbourhoodRadiusKm { radius_km: Distance },
    GetRandomNodes { nodes: Vec<NodeInfo> },
    GetClosestNodes { nodes: Vec<NodeInfo> },
    RegisterService { registered: bool },
    RemoveService { removed: bool },
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_types::{NetworkContact, NodeId, NodeProfile};
    use std::net::{Ipv4Addr, SocketAddrV4};

    fn sample_info(id: &str) -> NodeInfo {
        NodeInfo::new(
            NodeProfile::new(
                NodeId::new(id),
                NetworkContact::ipv4(SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 7), 5555)),
            ),
            GpsLocation::new(47.4979, 19.0402),
        )
    }

    fn roundtrip(msg: &Message) -> Message {
        let bytes = bincode::serialize(msg).unwrap();
        bincode::deserialize(&bytes).unwrap()
    }

    #[test]
    fn request_carries_protocol_version() {
        let req = Request::new(Call::GetNeighbourhoodRadiusKm);
        assert_eq!(req.version, "1");
    }

    #[test]
    fn accept_colleague_roundtrip() {
        let msg = Message::Request(Request::new(Call::AcceptColleague {
            requester: sample_info("alpha"),
        }));
        assert_eq!(roundtrip(&msg), msg);
    }

    #[test]
    fn closest_nodes_roundtrip() {
        let msg = Message::Request(Request::new(Call::GetClosestNodes {
            location: GpsLocation::new(1.0, 2.0),
            radius_km: f64::MAX,
            max_count: 10,
            filter: NeighboursFilter::Included,
        }));
        assert_eq!(roundtrip(&msg), msg);
    }

    #[test]
    fn random_nodes_response_roundtrip() {
        let msg = Message::Response(Response::GetRandomNodes {
            nodes: vec![sample_info("a"), sample_info("b")],
        });
        assert_eq!(roundtrip(&msg), msg);
    }

    #[test]
    fn rejection_response_roundtrip() {
        let msg = Message::Response(Response::AcceptNeighbour { accepted: false });
        assert_eq!(roundtrip(&msg), msg);
    }

    #[test]
    fn register_service_roundtrip() {
        let msg = Message::Request(Request::new(Call::RegisterService {
            service: ServiceType::Proximity,
            profile: ServiceProfile::new(
                "proximity-1",
                NetworkContact::ipv4(SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 7), 7777)),
            ),
        }));
        assert_eq!(roundtrip(&msg), msg);
    }

    #[test]
    fn corrupt_bytes_rejected_gracefully() {
        let garbage = vec![0xFF, 0x00, 0xDE, 0xAD, 0xBE, 0xEF];
        assert!(bincode::deserialize::<Message>(&garbage).is_err());
    }

    #[test]
    fn truncated_message_rejected() {
        let msg = Message::Request(Request::new(Call::AcceptColleague {
            requester: sample_info("alpha"),
        }));
        let bytes = bincode::serialize(&msg).unwrap();
        assert!(bincode::deserialize::<Message>(&bytes[..bytes.len() / 2]).is_err());
    }

    #[test]
    fn empty_bytes_rejected() {
        assert!(bincode::deserialize::<Message>(&[]).is_err());
    }
}
