//! MQTT connection to the shed controller
//!
//! A supervisor task owns the `rumqttc` event loop. It tries the primary
//! broker first; if the primary never acknowledges a connection it moves to
//! the fallback broker for good. Once a broker has connected, drops are
//! retried against that same broker every `reconnect_period`.

use super::PumpCommandPublisher;
use crate::config::{parse_broker_url, MqttConfig};
use crate::error::{AgriError, Result};
use crate::models::{IngestReading, MistingMode};
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Which broker the supervisor is pointed at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerTarget {
    Primary,
    Fallback,
}

/// Broker choice across connection attempts
#[derive(Debug, Clone)]
pub struct BrokerSelector {
    target: BrokerTarget,
    has_fallback: bool,
    ever_connected: bool,
}

impl BrokerSelector {
    pub fn new(has_fallback: bool) -> Self {
        Self {
            target: BrokerTarget::Primary,
            has_fallback,
            ever_connected: false,
        }
    }

    pub fn current(&self) -> BrokerTarget {
        self.target
    }

    /// Only the very first primary attempt is bounded by the connect timeout
    pub fn connect_deadline_applies(&self) -> bool {
        self.target == BrokerTarget::Primary && !self.ever_connected && self.has_fallback
    }

    pub fn on_connected(&mut self) {
        self.ever_connected = true;
    }

    /// Record a failed or dropped connection; returns true if the target changed
    pub fn on_failure(&mut self) -> bool {
        if self.target == BrokerTarget::Primary && !self.ever_connected && self.has_fallback {
            self.target = BrokerTarget::Fallback;
            return true;
        }
        false
    }
}

enum ConnectionOutcome {
    NeverConnected,
    Dropped,
    Stopped,
}

/// rumqttc-backed publisher and sensor subscriber
pub struct MqttClient {
    config: MqttConfig,
    client: RwLock<Option<AsyncClient>>,
    connected: AtomicBool,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl MqttClient {
    /// Validate the broker URLs and start the supervisor
    ///
    /// Readings received on the sensor topic are forwarded to `inbound`.
    pub fn start(config: MqttConfig, inbound: mpsc::Sender<IngestReading>) -> Result<Arc<Self>> {
        parse_broker_url(&config.primary_url)?;
        if let Some(fallback) = &config.fallback_url {
            parse_broker_url(fallback)?;
        }

        let client = Arc::new(Self {
            config,
            client: RwLock::new(None),
            connected: AtomicBool::new(false),
            supervisor: Mutex::new(None),
        });

        let supervisor = tokio::spawn(client.clone().supervise(inbound));
        if let Ok(mut slot) = client.supervisor.try_lock() {
            *slot = Some(supervisor);
        }

        Ok(client)
    }

    /// Stop the supervisor and disconnect
    pub async fn shutdown(&self) {
        if let Some(handle) = self.supervisor.lock().await.take() {
            handle.abort();
        }
        if let Some(client) = self.client.write().await.take() {
            if let Err(e) = client.disconnect().await {
                debug!("MQTT disconnect failed: {e}");
            }
        }
        self.connected.store(false, Ordering::SeqCst);
        info!("MQTT client stopped");
    }

    fn broker_for(&self, target: BrokerTarget) -> Option<(String, String)> {
        match target {
            BrokerTarget::Primary => Some((
                self.config.primary_url.clone(),
                self.config.client_id.clone(),
            )),
            BrokerTarget::Fallback => self
                .config
                .fallback_url
                .clone()
                .map(|url| (url, format!("{}-fallback", self.config.client_id))),
        }
    }

    async fn supervise(self: Arc<Self>, inbound: mpsc::Sender<IngestReading>) {
        let mut selector = BrokerSelector::new(self.config.fallback_url.is_some());

        loop {
            let target = selector.current();

            let Some((url, client_id)) = self.broker_for(target) else {
                error!("No broker configured for {:?}", target);
                return;
            };

            let (host, port) = match parse_broker_url(&url) {
                Ok(address) => address,
                Err(e) => {
                    error!("Unusable broker URL: {e}");
                    return;
                }
            };

            info!("Connecting to MQTT broker {host}:{port} as {client_id}");
            let mut options = MqttOptions::new(client_id, host, port);
            options.set_keep_alive(self.config.keep_alive);
            options.set_clean_session(true);

            let (client, mut eventloop) = AsyncClient::new(options, 64);
            *self.client.write().await = Some(client.clone());

            let deadline = selector
                .connect_deadline_applies()
                .then(|| Instant::now() + self.config.connect_timeout);

            let outcome = self
                .run_connection(&client, &mut eventloop, deadline, &mut selector, &inbound)
                .await;
            self.connected.store(false, Ordering::SeqCst);

            match outcome {
                ConnectionOutcome::Stopped => return,
                ConnectionOutcome::NeverConnected => {
                    if selector.on_failure() {
                        warn!("Primary MQTT broker never connected, switching to fallback");
                        continue;
                    }
                }
                ConnectionOutcome::Dropped => {
                    warn!(
                        "MQTT connection lost, retrying in {:?}",
                        self.config.reconnect_period
                    );
                }
            }

            tokio::time::sleep(self.config.reconnect_period).await;
        }
    }

    async fn run_connection(
        &self,
        client: &AsyncClient,
        eventloop: &mut EventLoop,
        deadline: Option<Instant>,
        selector: &mut BrokerSelector,
        inbound: &mpsc::Sender<IngestReading>,
    ) -> ConnectionOutcome {
        let sensor_topic = self.config.sensor_topic();
        let mut connected = false;

        loop {
            let polled = match deadline.filter(|_| !connected) {
                Some(deadline) => match tokio::time::timeout_at(deadline, eventloop.poll()).await {
                    Ok(polled) => polled,
                    Err(_) => {
                        warn!(
                            "MQTT broker did not acknowledge within {:?}",
                            self.config.connect_timeout
                        );
                        return ConnectionOutcome::NeverConnected;
                    }
                },
                None => eventloop.poll().await,
            };

            match polled {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    connected = true;
                    selector.on_connected();
                    self.connected.store(true, Ordering::SeqCst);
                    info!("MQTT connected");

                    if let Err(e) = client.subscribe(&sensor_topic, QoS::AtLeastOnce).await {
                        warn!("Failed to subscribe to {sensor_topic}: {e}");
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    if publish.topic != sensor_topic {
                        continue;
                    }
                    match serde_json::from_slice::<IngestReading>(&publish.payload) {
                        Ok(reading) => {
                            if inbound.send(reading).await.is_err() {
                                info!("Reading consumer gone, stopping MQTT supervisor");
                                return ConnectionOutcome::Stopped;
                            }
                        }
                        Err(e) => warn!("Ignoring malformed sensor payload: {e}"),
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("MQTT connection error: {e}");
                    return if connected {
                        ConnectionOutcome::Dropped
                    } else {
                        ConnectionOutcome::NeverConnected
                    };
                }
            }
        }
    }

    async fn publish(&self, topic: String, payload: &'static str) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(AgriError::service_unavailable("MQTT broker not connected"));
        }

        let client = self
            .client
            .read()
            .await
            .clone()
            .ok_or_else(|| AgriError::service_unavailable("MQTT client not started"))?;

        client
            .publish(topic.clone(), QoS::AtLeastOnce, false, payload.as_bytes().to_vec())
            .await
            .map_err(|e| {
                AgriError::service_unavailable(format!("Failed to publish to {topic}: {e}"))
            })?;

        debug!("Published {payload} to {topic}");
        Ok(())
    }
}

#[async_trait]
impl PumpCommandPublisher for MqttClient {
    async fn publish_pump(&self, on: bool) -> Result<()> {
        self.publish(self.config.pump_topic(), if on { "ON" } else { "OFF" })
            .await
    }

    async fn publish_mode(&self, mode: MistingMode) -> Result<()> {
        self.publish(self.config.mode_topic(), mode.as_str()).await
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn transport(&self) -> &'static str {
        "mqtt"
    }
}
