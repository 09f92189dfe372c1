pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_from_str};
pub use schema::{
    CacheConfig, CancellationConfig, Config, DatabaseConfig, DetectionConfig, HttpConfig,
    ReadFailurePolicy, ServerConfig, ServiceEndpoint, ServicesConfig,
};
