use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub struct Observability;

impl Observability {
    /// Install the global subscriber. `RUST_LOG` overrides the default filter;
    /// `LOG_FORMAT=json` switches to structured output.
    pub fn init() -> Result<Self> {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "api=debug,request_validator=debug,tower_http=debug".into());

        let json = std::env::var("LOG_FORMAT")
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let registry = tracing_subscriber::registry().with(env_filter);
        if json {
            registry.with(tracing_subscriber::fmt::layer().json()).try_init()?;
        } else {
            registry.with(tracing_subscriber::fmt::layer()).try_init()?;
        }

        tracing::info!(json, "Observability initialized");
        Ok(Self)
    }
}
