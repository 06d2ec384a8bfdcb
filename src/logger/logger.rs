use anyhow::{Result, anyhow};
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

const BOOTSTRAP_FILTER: &str = "info";

pub struct LogConfig {
    pub filter: String,
}

/// Process-wide tracing subscriber whose filter can be swapped once settings
/// are loaded.
pub struct Logger {
    reload_handle: reload::Handle<EnvFilter, Registry>,
}

impl Logger {
    /// Installs the subscriber. `RUST_LOG` wins over the bootstrap filter.
    /// Output goes to stderr so rendered recipes on stdout stay clean.
    pub fn new_bootstrap() -> Self {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(BOOTSTRAP_FILTER));
        let (filter, reload_handle) = reload::Layer::new(filter);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .init();

        Self { reload_handle }
    }

    pub fn reload_from_config(&self, config: &LogConfig) -> Result<()> {
        if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
            return Ok(());
        }
        let filter = EnvFilter::try_new(&config.filter).map_err(|e| anyhow!(e))?;
        self.reload_handle.reload(filter).map_err(|e| anyhow!(e))?;
        Ok(())
    }
}
