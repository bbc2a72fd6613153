use thiserror::Error;

use meridian_types::ServiceType;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("store error: {0}")]
    Store(#[from] meridian_store::StoreError),

    #[error("network error: {0}")]
    Network(#[from] meridian_network::NetworkError),

    #[error("config error: {0}")]
    Config(String),

    #[error("service type {} is already registered", .0.as_str())]
    ServiceAlreadyRegistered(ServiceType),

    #[error("service type {} was not registered", .0.as_str())]
    ServiceNotRegistered(ServiceType),

    #[error("network discovery failed: {0}")]
    Discovery(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
