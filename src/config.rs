use serde::Deserialize;

use crate::{image_store::ImageStoreConfig, quantize_service::QuantizeServiceConfig};

pub const PATH: &str = "medcut.toml";

#[derive(Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub quantize_service: QuantizeServiceConfig,
    pub image_store: ImageStoreConfig,
}

#[derive(Deserialize)]
pub struct ServerConfig {
    /// The port under which medcut should serve.
    pub port: u16,
    /// The root URL that's shown on the documentation website.
    pub root: String,
    /// Uploads larger than this many bytes are rejected.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: usize,
}

fn default_max_upload_size() -> usize {
    16 * 1024 * 1024
}
