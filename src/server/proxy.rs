use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use warp::Filter;

use crate::config::{Config, RelayConfig};
use crate::handlers::RequestContext;
use crate::logging::LogConfig;
use crate::server::handle_rejection;
use crate::server::routes::create_routes;

pub struct RelayServer {
    pub client: reqwest::Client,
    pub config: Config,
    pub relay: Arc<RelayConfig>,
}

impl RelayServer {
    /// Fails when the provider credential is missing.
    pub fn new(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        let relay = Arc::new(RelayConfig::from_cli(&config)?);

        // no overall request timeout: streams are bounded by the session budget
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(32)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            config,
            relay,
        })
    }

    pub fn context(&self) -> RequestContext {
        RequestContext {
            client: self.client.clone(),
            relay: self.relay.clone(),
        }
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let addr: SocketAddr = self.config.listen.parse()?;
        let server = Arc::new(self);

        let routes = create_routes(server.clone()).recover(handle_rejection);

        let cors = warp::cors()
            .allow_any_origin()
            .allow_headers(vec![
                "Content-Type",
                "Authorization",
                "Accept",
                "Origin",
                "X-Requested-With",
            ])
            .allow_methods(vec!["GET", "POST", "OPTIONS"]);

        let routes_with_cors = routes.with(cors);

        if LogConfig::get().debug_enabled {
            log::info!("starting relay server on {} (debug mode)", addr);
        } else {
            log::info!("starting relay server on {}", addr);
        }
        log::info!(
            "MiniMax provider: {} (model: {}, stream timeout: {})",
            server.relay.endpoint,
            server.relay.model_id,
            humantime::format_duration(server.relay.timeout_budget)
        );

        warp::serve(routes_with_cors).run(addr).await;

        Ok(())
    }
}
