//! In-process doubles for channel and config-source seams

use crate::api::ConfigSource;
use crate::channel::{ChannelFactory, ChannelSink, EventChannel};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storelink_core::{Result, StoreConfig, StoreLinkError};

/// Records every open/close; events are injected through the captured sinks
#[derive(Default)]
pub(crate) struct FakeFactory {
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
    pub(crate) fail: AtomicBool,
    sinks: Mutex<Vec<ChannelSink>>,
}

struct FakeChannel {
    closed: Arc<AtomicUsize>,
}

impl EventChannel for FakeChannel {
    fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

impl ChannelFactory for FakeFactory {
    fn open(&self, sink: ChannelSink) -> Result<Box<dyn EventChannel>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreLinkError::Channel("refused".to_string()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.sinks.lock().unwrap().push(sink);
        Ok(Box::new(FakeChannel {
            closed: self.closed.clone(),
        }))
    }
}

impl FakeFactory {
    pub(crate) fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn latest(&self) -> ChannelSink {
        self.sinks.lock().unwrap().last().cloned().unwrap()
    }

    pub(crate) fn sink(&self, index: usize) -> ChannelSink {
        self.sinks.lock().unwrap()[index].clone()
    }
}

/// Answers every fetch with the same outcome, optionally after a delay
pub(crate) struct StaticSource {
    config: Option<StoreConfig>,
    delay: Duration,
    calls: AtomicUsize,
}

impl StaticSource {
    pub(crate) fn ok(config: StoreConfig) -> Self {
        Self {
            config: Some(config),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            config: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigSource for StaticSource {
    async fn fetch_config(&self) -> Result<StoreConfig> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.config
            .clone()
            .ok_or_else(|| StoreLinkError::Http("connection refused".to_string()))
    }
}
