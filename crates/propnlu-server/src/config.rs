//! Process configuration from flags, falling back to environment variables.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "propnlu", version, about = "Intent and entity prediction service")]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "PROPNLU_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    #[arg(long, env = "PROPNLU_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Directory holding model.onnx, tokenizer.json and labels.json.
    #[arg(long, env = "PROPNLU_MODEL_DIR", default_value = "./real_estate_model")]
    pub model_dir: PathBuf,

    /// Upper bound on a single analyzer call.
    #[arg(
        long,
        env = "PROPNLU_TIMEOUT_SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout_secs: u64,
}

impl Config {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
