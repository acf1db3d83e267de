//! Builder for assembling a [`Hub`] with its external collaborators.

use std::sync::Arc;

use crate::broker::Broker;
use crate::core::config::HubConfig;
use crate::core::dedup::DedupTracker;
use crate::core::hub::Hub;
use crate::core::registry::WatchRegistry;
use crate::error::HubError;
use crate::events::Bus;
use crate::provider::ProviderClient;
use crate::relay::ClusterRelay;

/// Builder for constructing a [`Hub`].
///
/// Both collaborators are required: the broker carries cluster fan-out, the
/// provider backs `wait_for_terminal` pre-checks and charge completion.
///
/// ```rust,ignore
/// let hub = Hub::builder(HubConfig::default())
///     .with_broker(broker)
///     .with_provider(provider)
///     .build()?;
/// ```
pub struct HubBuilder {
    cfg: HubConfig,
    broker: Option<Arc<dyn Broker>>,
    provider: Option<Arc<dyn ProviderClient>>,
}

impl HubBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: HubConfig) -> Self {
        Self {
            cfg,
            broker: None,
            provider: None,
        }
    }

    /// Sets the cluster broker (must already manage its own connection).
    pub fn with_broker(mut self, broker: Arc<dyn Broker>) -> Self {
        self.broker = Some(broker);
        self
    }

    /// Sets the payment-provider capability.
    pub fn with_provider(mut self, provider: Arc<dyn ProviderClient>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Builds the hub, wiring bus, dedup tracker, registry, and relay.
    ///
    /// Fails with [`HubError::Config`] if a collaborator is missing. The hub
    /// is inert until [`Hub::start`] is called.
    pub fn build(self) -> Result<Arc<Hub>, HubError> {
        let broker = self.broker.ok_or_else(|| HubError::Config {
            message: "a broker is required (with_broker)".to_string(),
        })?;
        let provider = self.provider.ok_or_else(|| HubError::Config {
            message: "a provider client is required (with_provider)".to_string(),
        })?;

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let tracker = Arc::new(DedupTracker::new(self.cfg.dedup_capacity_clamped()));
        let registry = Arc::new(WatchRegistry::new(Arc::clone(&provider)));
        let relay = ClusterRelay::new(
            self.cfg.channel.clone(),
            bus.clone(),
            Arc::clone(&tracker),
            broker,
        );

        Ok(Arc::new(Hub::new_internal(
            self.cfg, bus, tracker, registry, relay, provider,
        )))
    }
}
