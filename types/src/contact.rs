//! Network contact information for reaching a peer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{SocketAddr, SocketAddrV4, SocketAddrV6};

use crate::id::NodeId;

/// How a peer can be reached over TCP.
///
/// Either address family may be absent, but a contact with no endpoint at all
/// is invalid and rejected at configuration time.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkContact {
    pub ipv4: Option<SocketAddrV4>,
    pub ipv6: Option<SocketAddrV6>,
}

impl NetworkContact {
    /// Contact with only an IPv4 endpoint.
    pub fn ipv4(addr: SocketAddrV4) -> Self {
        Self {
            ipv4: Some(addr),
            ipv6: None,
        }
    }

    /// Contact with only an IPv6 endpoint.
    pub fn ipv6(addr: SocketAddrV6) -> Self {
        Self {
            ipv4: None,
            ipv6: Some(addr),
        }
    }

    /// Whether at least one address family is present.
    pub fn has_endpoint(&self) -> bool {
        self.ipv4.is_some() || self.ipv6.is_some()
    }

    /// All concrete socket addresses, IPv4 first.
    pub fn endpoints(&self) -> Vec<SocketAddr> {
        let mut out = Vec::with_capacity(2);
        if let Some(v4) = self.ipv4 {
            out.push(SocketAddr::V4(v4));
        }
        if let Some(v6) = self.ipv6 {
            out.push(SocketAddr::V6(v6));
        }
        out
    }
}

impl fmt::Display for NetworkContact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.ipv4, &self.ipv6) {
            (Some(v4), Some(v6)) => write!(f, "{v4} / {v6}"),
            (Some(v4), None) => write!(f, "{v4}"),
            (None, Some(v6)) => write!(f, "{v6}"),
            (None, None) => write!(f, "<unreachable>"),
        }
    }
}

/// A peer's identity together with how to reach it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeProfile {
    pub id: NodeId,
    pub contact: NetworkContact,
}

impl NodeProfile {
    pub fn new(id: NodeId, contact: NetworkContact) -> Self {
        Self { id, contact }
    }
}

impl fmt::Display for NodeProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.id, self.contact)
    }
}
