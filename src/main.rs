//! Fieldwire demo service.
//!
//! Configures a small service record from command-line arguments,
//! environment variables and an optional YAML/JSON file named by
//! `FIELDWIRE_CONFIG_PATH`, then prints the result. `--help` lists every
//! key.

use anyhow::{Result, bail};
use fieldwire::logging::{self, LogTarget};
use fieldwire::{
    ArgsProvider, Context, EnvProvider, FileProvider, Fieldwire, Initialize, Outcome, Record,
    parser,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable naming an optional configuration file.
const CONFIG_PATH_VAR: &str = "FIELDWIRE_CONFIG_PATH";

#[derive(Debug, Default, Record)]
pub struct ServiceConfig {
    #[fieldwire(
        key = "log",
        default = "2",
        description = "Logging output: 0/off, 1/stdout, 2/stderr, or filename"
    )]
    pub log: LogTarget,

    #[fieldwire(key = "verbose", default = "false", description = "Enable verbose logging")]
    pub verbose: bool,

    #[fieldwire(key = "workers", default = "4", description = "Number of worker threads")]
    pub workers: u32,

    #[fieldwire(key = "host", default = "127.0.0.1", description = "Address to listen on")]
    pub host: String,

    #[fieldwire(key = "port", default = "8080", description = "Port to listen on", example = "9000")]
    pub port: u16,

    #[fieldwire(key = "database", inject_as = "database")]
    pub database: Arc<DatabaseConfig>,

    #[fieldwire(key = "cache")]
    pub cache: CacheConfig,
}

#[derive(Debug, Default, Record)]
#[fieldwire(init)]
pub struct DatabaseConfig {
    #[fieldwire(key = "url", default = "sqlite://fieldwire.db", description = "Database URL")]
    pub url: String,

    #[fieldwire(key = "pool-size", default = "8", description = "Connection pool size")]
    pub pool_size: u32,

    #[fieldwire(key = "timeout", default = "5s", description = "Connection timeout")]
    pub timeout: Duration,
}

impl Initialize for DatabaseConfig {
    fn init(&mut self, _ctx: &Context) -> Result<()> {
        if self.pool_size == 0 {
            bail!("pool size must be at least 1");
        }
        debug!(url = %self.url, pool_size = self.pool_size, "Database settings validated");
        Ok(())
    }
}

#[derive(Debug, Default, Record)]
pub struct CacheConfig {
    #[fieldwire(key = "ttl", default = "1m", description = "Entry time-to-live")]
    pub ttl: Duration,

    #[fieldwire(key = "hosts", default = "localhost", description = "Comma-separated cache hosts")]
    pub hosts: Vec<String>,

    #[fieldwire(inject = "database")]
    pub database: Option<Arc<DatabaseConfig>>,
}

fn main() -> Result<()> {
    let mut builder = Fieldwire::builder()
        .args(ArgsProvider::from_env())
        .env(EnvProvider::from_env())
        .parser(parser::from_str::<LogTarget>());

    if let Ok(path) = std::env::var(CONFIG_PATH_VAR) {
        builder = builder.provider(FileProvider::load(&path)?);
    }

    let fieldwire = builder.build();
    let mut config = ServiceConfig::default();
    if fieldwire.configure(&mut config)? == Outcome::HelpDisplayed {
        return Ok(());
    }

    logging::init(&config.log, config.verbose)?;
    info!(
        workers = config.workers,
        listen = %format!("{}:{}", config.host, config.port),
        database = %config.database.url,
        "Service configured"
    );

    println!("{config:#?}");
    Ok(())
}
