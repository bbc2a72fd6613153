//! The meridian overlay node.
//!
//! Wires the spatial database and the transport into the discovery engine:
//! - maintains the Neighbour and Colleague views under the admission rules
//! - bootstraps against seed peers (world + neighbourhood discovery)
//! - serves the remote operation surface through [`NodeDispatcher`]
//! - hosts the application services registry

pub mod config;
pub mod discovery;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod node;

pub use config::{NodeConfig, SeedConfig};
pub use dispatcher::NodeDispatcher;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use node::{
    default_seed_nodes, Node, INIT_NEIGHBOURHOOD_QUERY_NODE_COUNT,
    INIT_WORLD_NODE_FILL_TARGET_RATE, INIT_WORLD_RANDOM_NODE_COUNT, NEIGHBOURHOOD_MAX_NODE_COUNT,
    NEIGHBOURHOOD_MAX_RANGE_KM,
};
