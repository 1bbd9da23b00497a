//! HTTP/SSE/WebSocket transport for the AgriCool dashboard
//!
//! REST endpoints live in the `*_api` submodules; this module owns the
//! shared state, the router, health and the real-time streams.

pub mod cors_middleware;
pub mod misting_api;
pub mod notifications_api;
pub mod reports_api;
pub mod sensors_api;
pub mod thermal_api;
pub mod users_api;

use crate::client::PumpCommandPublisher;
use crate::config::{HttpConfig, ServerConfig};
use crate::error::{AgriError, Result};
use crate::realtime::{RealtimeEvent, RealtimeHub};
use crate::services::{
    AutoController, MistingService, NotificationService, PumpCorrelator, ReportsService,
    ThermalService, UserService,
};
use crate::storage::Database;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post, put},
    Json, Router,
};
use futures_util::{stream, SinkExt, StreamExt};
use serde::Serialize;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Application state shared across all HTTP handlers
pub struct AppState {
    pub db: Database,
    pub hub: RealtimeHub,
    pub publisher: Arc<dyn PumpCommandPublisher>,
    pub correlator: Arc<PumpCorrelator>,
    pub misting: Arc<MistingService>,
    pub notifications: Arc<NotificationService>,
    pub users: UserService,
    pub thermal: ThermalService,
    pub reports: ReportsService,
    pub sse_keepalive: Duration,
}

impl AppState {
    /// Wire every service over one database, hub and publisher
    pub fn new(
        config: &ServerConfig,
        db: Database,
        hub: RealtimeHub,
        publisher: Arc<dyn PumpCommandPublisher>,
    ) -> Self {
        let misting = Arc::new(MistingService::new(db.clone()));
        let notifications = Arc::new(NotificationService::new(
            db.clone(),
            hub.clone(),
            config.notifications.default_limit,
        ));
        let correlator = Arc::new(PumpCorrelator::new(
            db.clone(),
            misting.clone(),
            notifications.clone(),
            hub.clone(),
            publisher.clone(),
            AutoController::new(&config.automation),
        ));

        Self {
            users: UserService::new(db.clone()),
            thermal: ThermalService::new(db.clone()),
            reports: ReportsService::new(misting.clone()),
            sse_keepalive: config.http.sse_keepalive,
            db,
            hub,
            publisher,
            correlator,
            misting,
            notifications,
        }
    }
}

pub type SharedState = Arc<AppState>;

/// Build the complete router
pub fn router(state: SharedState) -> Router {
    let api = Router::new()
        .route(
            "/sensors",
            get(sensors_api::list_readings).post(sensors_api::ingest_reading),
        )
        .route("/sensors/latest", get(sensors_api::latest_reading))
        .route("/misting/start", post(misting_api::start_session))
        .route("/misting/end/:id", put(misting_api::end_session))
        .route("/misting/today", get(misting_api::today))
        .route("/misting/all", get(misting_api::recent))
        .route("/misting/logs", get(misting_api::recent))
        .route("/misting/manual", post(misting_api::manual_control))
        .route("/misting/auto", post(misting_api::switch_to_auto))
        .route("/misting/status", get(misting_api::status))
        .route("/misting/:id", get(misting_api::get_session))
        .route("/notifications", get(notifications_api::list))
        .route("/notifications/unread-count", get(notifications_api::unread_count))
        .route("/notifications/mark-read/:id", post(notifications_api::mark_read))
        .route("/notifications/mark-all-read", post(notifications_api::mark_all_read))
        .route("/users/:id", get(users_api::profile))
        .route("/users/:id/security", put(users_api::update_security))
        .route(
            "/records",
            get(thermal_api::list_records).post(thermal_api::create_record),
        )
        .route("/records/sensor", post(thermal_api::create_sensor_record))
        .route("/simulate-scan", post(thermal_api::simulate_scan))
        .route("/reports", get(reports_api::report))
        .route("/reports/download", get(reports_api::download))
        .route("/events", get(sse_handler));

    Router::new()
        .route("/health", get(health_check))
        .route("/signup", post(users_api::signup))
        .route("/login", post(users_api::login))
        .route("/ws", get(websocket_handler))
        .nest("/api", api)
        .layer(cors_middleware::cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// HTTP server bound to the configured address
pub struct HttpTransportServer {
    state: SharedState,
    host: String,
    port: u16,
}

impl HttpTransportServer {
    pub fn new(state: SharedState, config: &HttpConfig) -> Self {
        Self {
            state,
            host: config.host.clone(),
            port: config.port,
        }
    }

    pub fn create_router(&self) -> Router {
        router(self.state.clone())
    }

    /// Serve until `shutdown` resolves
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.create_router();
        let addr = format!("{}:{}", self.host, self.port);

        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            AgriError::connection(format!("Failed to bind to {addr}: {e}"))
        })?;

        info!("🌐 AgriCool server listening on http://{addr}");
        info!("📡 SSE stream: http://{addr}/api/events");
        info!("🔌 WebSocket: ws://{addr}/ws");
        info!("🏥 Health check: http://{addr}/health");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| AgriError::connection(format!("HTTP server error: {e}")))?;

        info!("HTTP server stopped");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    db: &'static str,
    mqtt: &'static str,
    version: &'static str,
    timestamp: String,
}

/// Health check endpoint
async fn health_check(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Health check requested");

    let db = match state.db.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            warn!("Health check database ping failed: {e}");
            "not connected"
        }
    };

    let mqtt = match (state.publisher.transport(), state.publisher.is_connected()) {
        ("offline", _) => "offline",
        (_, true) => "connected",
        (_, false) => "disconnected",
    };

    Json(HealthResponse {
        status: if db == "connected" { "ok" } else { "degraded" },
        db,
        mqtt,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

fn lag_warning(skipped: u64) -> serde_json::Value {
    serde_json::json!({
        "type": "lag_warning",
        "message": "Client lagged behind event stream",
        "skipped": skipped,
    })
}

/// Server-sent event stream of real-time updates
async fn sse_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let client_id = uuid::Uuid::new_v4().to_string();

    let connection_event = Event::default().event("connection").data(
        serde_json::json!({
            "type": "connection",
            "status": "connected",
            "client_id": client_id,
        })
        .to_string(),
    );

    let receiver = state.hub.subscribe();
    info!(
        subscribers = state.hub.subscriber_count(),
        "SSE connection established for client: {}", client_id
    );
    let live_stream = stream::unfold(receiver, |mut receiver| async move {
        match receiver.recv().await {
            Ok(event) => {
                let sse_event = Event::default()
                    .event(event.event.as_str())
                    .data(serde_json::to_string(&event).unwrap_or_default());
                Some((sse_event, receiver))
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                let lag_event = Event::default()
                    .event("lag_warning")
                    .data(lag_warning(skipped).to_string());
                Some((lag_event, receiver))
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    });

    let complete_stream = stream::once(async move { connection_event })
        .chain(live_stream)
        .map(Ok::<Event, Infallible>);

    Sse::new(complete_stream).keep_alive(
        KeepAlive::new()
            .interval(state.sse_keepalive)
            .text("keep-alive"),
    )
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Push every hub event to the socket as a JSON text frame
async fn handle_websocket(socket: WebSocket, state: SharedState) {
    info!("New WebSocket connection");

    let (mut sender, mut receiver) = socket.split();
    let mut events = state.hub.subscribe();
    debug!(subscribers = state.hub.subscriber_count(), "WebSocket subscribed");

    let hello = RealtimeEvent::new(
        "connection",
        serde_json::json!({ "status": "connected" }),
    );
    if let Ok(json) = serde_json::to_string(&hello) {
        if sender.send(Message::Text(json)).await.is_err() {
            warn!("Failed to send initial frame to WebSocket client");
            return;
        }
    }

    let mut forward = tokio::spawn(async move {
        loop {
            let frame = match events.recv().await {
                Ok(event) => serde_json::to_string(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => serde_json::to_string(
                    &RealtimeEvent::new("lag_warning", lag_warning(skipped)),
                ),
                Err(broadcast::error::RecvError::Closed) => break,
            };

            let Ok(json) = frame else { continue };
            if sender.send(Message::Text(json)).await.is_err() {
                debug!("WebSocket client disconnected");
                break;
            }
        }
    });

    let mut inbound = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => {
                    debug!("WebSocket client requested close");
                    break;
                }
                Ok(Message::Text(text)) => debug!("Ignoring WebSocket message: {}", text),
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket error: {}", e);
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut forward => inbound.abort(),
        _ = &mut inbound => forward.abort(),
    }

    info!("WebSocket connection closed");
}
