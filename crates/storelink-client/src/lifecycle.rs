//! Startup and teardown of live store-config synchronization
//!
//! `start()` fires the initial fetch and arms a short startup timer that
//! connects the stream, so the first render never waits on streaming setup.
//! `stop()` cancels whatever is still pending and disconnects.

use crate::api::{ApiClient, ConfigSource};
use crate::auth::TokenStore;
use crate::backoff::ReconnectPolicy;
use crate::channel::{ChannelFactory, HttpChannelFactory};
use crate::connector::{ConnectorEvent, ConnectorHandle, StreamConnector};
use crate::fetch::FetchStep;
use crate::link::Link;
use crate::repository::ConfigRepository;
use crate::timer::TimerHandle;
use std::sync::Arc;
use std::time::Duration;
use storelink_core::{RepositoryState, Result, StoreLinkConfig};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Owns the repository, the fetch step and the connector
///
/// Must be created inside a tokio runtime.
pub struct LiveConfigController {
    repository: Arc<ConfigRepository>,
    fetch: FetchStep,
    connector: ConnectorHandle,
    startup_delay: Duration,
    startup: Option<TimerHandle>,
    fetch_task: Option<JoinHandle<()>>,
}

impl LiveConfigController {
    pub fn new(
        repository: Arc<ConfigRepository>,
        source: Arc<dyn ConfigSource>,
        factory: Arc<dyn ChannelFactory>,
        policy: ReconnectPolicy,
        startup_delay: Duration,
    ) -> Self {
        let fetch = FetchStep::new(source, Arc::clone(&repository));
        let (connector, events) = StreamConnector::new(policy, Arc::clone(&repository), factory);

        Self {
            repository,
            fetch,
            connector: connector.spawn(events),
            startup_delay,
            startup: None,
            fetch_task: None,
        }
    }

    /// Wire the HTTP client and SSE channel from configuration
    pub fn from_config(config: &StoreLinkConfig, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        let client = ApiClient::new(config.api.clone(), tokens)?;
        let factory = HttpChannelFactory::from_client(&client);

        if config.environment.is_development() {
            tracing::info!("API Base URL: {}", config.api.base());
        }

        Ok(Self::new(
            Arc::new(ConfigRepository::new()),
            Arc::new(client),
            Arc::new(factory),
            ReconnectPolicy::from(&config.sync),
            config.sync.startup_connect_delay(),
        ))
    }

    pub fn repository(&self) -> Arc<ConfigRepository> {
        Arc::clone(&self.repository)
    }

    /// Observe repository changes
    pub fn subscribe(&self) -> watch::Receiver<RepositoryState> {
        self.repository.subscribe()
    }

    /// Connector phase and health
    pub fn connection(&self) -> Link {
        self.connector.status()
    }

    /// Observe connector phase and health
    pub fn subscribe_connection(&self) -> watch::Receiver<Link> {
        self.connector.subscribe()
    }

    /// The startup timer is armed and has not fired
    pub fn is_connect_pending(&self) -> bool {
        self.startup.as_ref().is_some_and(|timer| !timer.is_finished())
    }

    /// Fetch now, connect after the startup delay
    ///
    /// Calling `start` again restarts both steps; this is also how a session
    /// that gave up is revived.
    pub fn start(&mut self) {
        self.cancel_pending();

        let fetch = self.fetch.clone();
        self.fetch_task = Some(tokio::spawn(async move { fetch.fetch_initial().await }));

        let inbox = self.connector.sender();
        tracing::debug!("Stream connect scheduled in {:?}", self.startup_delay);
        self.startup = Some(TimerHandle::schedule(self.startup_delay, move || {
            let _ = inbox.send(ConnectorEvent::Connect);
        }));
    }

    /// Cancel pending work and disconnect; safe at any time
    pub fn stop(&mut self) {
        self.cancel_pending();
        self.connector.disconnect();
    }

    /// Stop and wait for the connector to wind down
    pub async fn shutdown(mut self) {
        self.cancel_pending();
        self.connector.shutdown().await;
    }

    fn cancel_pending(&mut self) {
        if let Some(timer) = self.startup.take() {
            timer.cancel();
        }
        if let Some(task) = self.fetch_task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelEvent;
    use crate::link::LinkPhase;
    use crate::testing::{FakeFactory, StaticSource};
    use storelink_core::StoreConfig;

    const STARTUP: Duration = Duration::from_millis(500);

    fn controller(
        source: Arc<StaticSource>,
        factory: Arc<FakeFactory>,
    ) -> (LiveConfigController, Arc<ConfigRepository>) {
        let repo = Arc::new(ConfigRepository::new());
        let controller = LiveConfigController::new(
            repo.clone(),
            source,
            factory,
            ReconnectPolicy::new(Duration::from_millis(1000), Duration::from_millis(30_000), 5),
            STARTUP,
        );
        (controller, repo)
    }

    fn open_shop() -> StoreConfig {
        StoreConfig {
            is_shop_open: true,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_first_then_delayed_connect() {
        let source = Arc::new(StaticSource::ok(open_shop()));
        let factory = Arc::new(FakeFactory::default());
        let (mut controller, repo) = controller(source.clone(), factory.clone());

        controller.start();
        assert!(controller.is_connect_pending());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(source.calls(), 1);
        assert_eq!(repo.get(), Some(open_shop()));
        assert_eq!(factory.opened(), 0);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(factory.opened(), 1);
        assert!(!controller.is_connect_pending());
        assert_eq!(controller.connection().phase, LinkPhase::Connecting);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_does_not_wait_for_slow_fetch() {
        let source = Arc::new(StaticSource::ok(open_shop()).with_delay(Duration::from_secs(10)));
        let factory = Arc::new(FakeFactory::default());
        let (mut controller, repo) = controller(source, factory.clone());

        controller.start();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(factory.opened(), 1);
        assert_eq!(repo.get(), None);

        factory.latest().emit(ChannelEvent::Open);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(repo.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_connect_fires() {
        let source = Arc::new(StaticSource::ok(open_shop()));
        let factory = Arc::new(FakeFactory::default());
        let (mut controller, repo) = controller(source, factory.clone());

        controller.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        controller.stop();
        assert!(!controller.is_connect_pending());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(factory.opened(), 0);
        assert!(!repo.is_connected());
        assert_eq!(controller.connection().phase, LinkPhase::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_start_is_harmless() {
        let source = Arc::new(StaticSource::ok(open_shop()));
        let factory = Arc::new(FakeFactory::default());
        let (mut controller, repo) = controller(source.clone(), factory.clone());

        controller.stop();
        controller.stop();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(source.calls(), 0);
        assert_eq!(factory.opened(), 0);
        assert!(!repo.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_populates_after_fetch_failure() {
        let source = Arc::new(StaticSource::failing());
        let factory = Arc::new(FakeFactory::default());
        let (mut controller, repo) = controller(source, factory.clone());

        controller.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(repo.get(), None);
        assert!(repo
            .error()
            .unwrap()
            .starts_with("Failed to load store status"));

        tokio::time::sleep(Duration::from_millis(500)).await;
        let sink = factory.latest();
        sink.emit(ChannelEvent::Open);
        sink.emit(ChannelEvent::Message(r#"{"isShopOpen":true,"isCooking":true}"#.into()));
        tokio::time::sleep(Duration::from_millis(10)).await;

        let config = repo.get().unwrap();
        assert!(config.is_shop_open);
        assert!(config.is_cooking);
        assert!(repo.is_connected());
        assert_eq!(repo.error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_disconnects_open_stream() {
        let source = Arc::new(StaticSource::ok(open_shop()));
        let factory = Arc::new(FakeFactory::default());
        let (mut controller, repo) = controller(source, factory.clone());

        controller.start();
        tokio::time::sleep(Duration::from_millis(600)).await;
        factory.latest().emit(ChannelEvent::Open);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(repo.is_connected());

        controller.stop();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!repo.is_connected());
        assert_eq!(factory.closed(), 1);
        // Cached snapshot survives teardown
        assert_eq!(repo.get(), Some(open_shop()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_give_up() {
        let source = Arc::new(StaticSource::ok(open_shop()));
        let factory = Arc::new(FakeFactory::default());
        let (mut controller, repo) = controller(source, factory.clone());

        controller.start();
        tokio::time::sleep(Duration::from_millis(600)).await;

        // 1s + 2s + 4s + 8s of backoff between five failures
        for _ in 0..5 {
            factory.latest().emit(ChannelEvent::Error("offline".into()));
            tokio::time::sleep(Duration::from_secs(20)).await;
        }
        assert_eq!(controller.connection().phase, LinkPhase::GaveUp);
        assert_eq!(factory.opened(), 5);
        assert!(repo.error().unwrap().ends_with("using cached data"));

        controller.start();
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(factory.opened(), 6);
        assert_eq!(controller.connection().connection.retry_count, 0);
    }

    #[tokio::test]
    async fn test_shutdown_closes_stream() {
        let source = Arc::new(StaticSource::ok(open_shop()));
        let factory = Arc::new(FakeFactory::default());
        let repo = Arc::new(ConfigRepository::new());
        let mut controller = LiveConfigController::new(
            repo.clone(),
            source,
            factory.clone(),
            ReconnectPolicy::default(),
            Duration::ZERO,
        );

        controller.start();
        let mut link = controller.subscribe_connection();
        link.wait_for(|l| l.phase == LinkPhase::Connecting)
            .await
            .unwrap();

        controller.shutdown().await;
        assert_eq!(factory.closed(), 1);
        assert!(!repo.is_connected());
    }
}
