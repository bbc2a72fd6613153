//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddrV4, SocketAddrV6};
use std::path::PathBuf;

use meridian_types::{GpsLocation, NetworkContact, NodeId, NodeInfo, NodeProfile};

use crate::node::default_seed_nodes;
use crate::NodeError;

/// Configuration for a meridian node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or built
/// programmatically (e.g. for tests). The identity fields have no defaults:
/// a file missing any of them fails to parse, surfacing a configuration
/// error before bootstrap.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// This node's identity.
    pub node_id: String,

    /// Public IP address peers use to reach this node.
    pub address: String,

    /// TCP port to listen on.
    pub port: u16,

    /// Fixed latitude of this node, in degrees.
    pub latitude: f64,

    /// Fixed longitude of this node, in degrees.
    pub longitude: f64,

    /// Where the spatial database backend keeps its data.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Seed peers used for bootstrap. Empty means the compiled-in seed list.
    #[serde(default)]
    pub seeds: Vec<SeedConfig>,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// One seed peer in the configuration file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeedConfig {
    pub node_id: String,
    pub address: String,
    pub port: u16,
    pub latitude: f64,
    pub longitude: f64,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_db_path() -> PathBuf {
    PathBuf::from("./meridian_data")
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("NodeConfig is always serializable to TOML")
    }

    /// Check every identity field before bootstrap.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.node_id.is_empty() {
            return Err(NodeError::Config("node_id must not be empty".into()));
        }
        if self.port == 0 {
            return Err(NodeError::Config("port must not be zero".into()));
        }
        self.address
            .parse::<IpAddr>()
            .map_err(|e| NodeError::Config(format!("invalid address {:?}: {e}", self.address)))?;
        if !GpsLocation::new(self.latitude, self.longitude).is_valid() {
            return Err(NodeError::Config(format!(
                "invalid coordinates ({}, {})",
                self.latitude, self.longitude
            )));
        }
        for seed in &self.seeds {
            seed.address.parse::<IpAddr>().map_err(|e| {
                NodeError::Config(format!("invalid seed address {:?}: {e}", seed.address))
            })?;
        }
        Ok(())
    }

    /// Build this node's own immutable snapshot.
    pub fn self_info(&self) -> Result<NodeInfo, NodeError> {
        self.validate()?;
        let contact = contact_from(&self.address, self.port)?;
        Ok(NodeInfo::new(
            NodeProfile::new(NodeId::new(self.node_id.clone()), contact),
            GpsLocation::new(self.latitude, self.longitude),
        ))
    }

    /// The seed peers to bootstrap against: the configured list, or the
    /// compiled-in defaults when none are configured.
    pub fn seed_nodes(&self) -> Result<Vec<NodeInfo>, NodeError> {
        if self.seeds.is_empty() {
            return Ok(default_seed_nodes());
        }
        self.seeds
            .iter()
            .map(|seed| {
                let contact = contact_from(&seed.address, seed.port)?;
                Ok(NodeInfo::new(
                    NodeProfile::new(NodeId::new(seed.node_id.clone()), contact),
                    GpsLocation::new(seed.latitude, seed.longitude),
                ))
            })
            .collect()
    }
}

fn contact_from(address: &str, port: u16) -> Result<NetworkContact, NodeError> {
    let ip = address
        .parse::<IpAddr>()
        .map_err(|e| NodeError::Config(format!("invalid address {address:?}: {e}")))?;
    Ok(match ip {
        IpAddr::V4(v4) => NetworkContact::ipv4(SocketAddrV4::new(v4, port)),
        IpAddr::V6(v6) => NetworkContact::ipv6(SocketAddrV6::new(v6, port, 0, 0)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        node_id = "alpha"
        address = "10.0.0.1"
        port = 5555
        latitude = 47.4979
        longitude = 19.0402
    "#;

    #[test]
    fn minimal_toml_parses_with_defaults() {
        let config = NodeConfig::from_toml_str(MINIMAL).expect("should parse");
        assert_eq!(config.node_id, "alpha");
        assert_eq!(config.log_format, "human");
        assert_eq!(config.log_level, "info");
        assert!(config.seeds.is_empty());
        config.validate().expect("should validate");
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = NodeConfig::from_toml_str(MINIMAL).unwrap();
        let parsed = NodeConfig::from_toml_str(&config.to_toml_string()).expect("should parse");
        assert_eq!(parsed.node_id, config.node_id);
        assert_eq!(parsed.port, config.port);
        assert_eq!(parsed.latitude, config.latitude);
    }

    #[test]
    fn missing_identity_field_is_a_config_error() {
        let without_port = r#"
            node_id = "alpha"
            address = "10.0.0.1"
            latitude = 1.0
            longitude = 2.0
        "#;
        assert!(matches!(
            NodeConfig::from_toml_str(without_port),
            Err(NodeError::Config(_))
        ));
    }

    #[test]
    fn malformed_address_is_rejected() {
        let mut config = NodeConfig::from_toml_str(MINIMAL).unwrap();
        config.address = "not-an-ip".into();
        assert!(matches!(config.validate(), Err(NodeError::Config(_))));
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        let mut config = NodeConfig::from_toml_str(MINIMAL).unwrap();
        config.latitude = 91.0;
        assert!(matches!(config.validate(), Err(NodeError::Config(_))));
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = NodeConfig::from_toml_file("/nonexistent/meridian.toml");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }

    #[test]
    fn empty_seed_list_falls_back_to_compiled_defaults() {
        let config = NodeConfig::from_toml_str(MINIMAL).unwrap();
        let seeds = config.seed_nodes().unwrap();
        assert!(!seeds.is_empty());
        assert_eq!(seeds[0].id().as_str(), "FirstSeedNodeId");
    }

    #[test]
    fn configured_seeds_override_defaults() {
        let with_seed = format!(
            "{MINIMAL}\n[[seeds]]\nnode_id = \"s1\"\naddress = \"10.0.0.9\"\nport = 5555\nlatitude = 1.0\nlongitude = 2.0\n"
        );
        let config = NodeConfig::from_toml_str(&with_seed).unwrap();
        let seeds = config.seed_nodes().unwrap();
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].id().as_str(), "s1");
    }

    #[test]
    fn self_info_builds_a_reachable_profile() {
        let config = NodeConfig::from_toml_str(MINIMAL).unwrap();
        let info = config.self_info().unwrap();
        assert_eq!(info.id().as_str(), "alpha");
        assert!(info.profile.contact.has_endpoint());
        assert_eq!(info.location, GpsLocation::new(47.4979, 19.0402));
    }
}
