//! Application-layer service registrations.

use serde::{Deserialize, Serialize};

use crate::contact::NetworkContact;

/// Application services a node can host on top of the overlay.
///
/// At most one profile can be registered per type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceType {
    Unstructured,
    Content,
    Latency,
    Location,
    Token,
    Profile,
    Proximity,
    Relay,
    Minting,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unstructured => "unstructured",
            Self::Content => "content",
            Self::Latency => "latency",
            Self::Location => "location",
            Self::Token => "token",
            Self::Profile => "profile",
            Self::Proximity => "proximity",
            Self::Relay => "relay",
            Self::Minting => "minting",
        }
    }
}

/// Contact details of a registered application service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceProfile {
    /// Service instance identifier, unique within the hosting node.
    pub id: String,
    /// Where clients reach the service.
    pub contact: NetworkContact,
}

impl ServiceProfile {
    pub fn new(id: impl Into<String>, contact: NetworkContact) -> Self {
        Self {
            id: id.into(),
            contact,
        }
    }
}
