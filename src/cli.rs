use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::paths;

#[derive(Parser, Debug)]
#[command(name = "sharescribe", about = "Share-to-transcription daemon")]
pub struct Cli {
    /// Address the gateway listens on
    #[arg(long, default_value = "127.0.0.1:7868")]
    pub addr: SocketAddr,

    /// Origin to fetch uncached assets from, e.g. https://app.example.com.
    /// Without one, cache misses are 404s.
    #[arg(long, env = "SHARESCRIBE_UPSTREAM")]
    pub upstream: Option<String>,

    /// Directory for the credential and history files
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// Root directory for the cache buckets
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Scratch directory for conversion temporaries
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,

    /// Save this OpenAI API key to the credential store and exit
    #[arg(long)]
    pub save_key: Option<String>,
}

impl Cli {
    pub fn config_dir(&self) -> PathBuf {
        self.config_dir
            .clone()
            .unwrap_or_else(paths::default_config_dir)
    }

    pub fn cache_root(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(paths::default_cache_root)
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(paths::default_scratch_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse() {
        let cli = Cli::parse_from(["sharescribe"]);
        assert_eq!(cli.addr.port(), 7868);
        assert!(cli.upstream.is_none());
    }

    #[test]
    fn explicit_dirs_override_defaults() {
        let cli = Cli::parse_from(["sharescribe", "--config-dir", "/tmp/cfg"]);
        assert_eq!(cli.config_dir(), PathBuf::from("/tmp/cfg"));
    }
}
