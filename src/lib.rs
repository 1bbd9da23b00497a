//! AgriCool livestock-shed climate and misting backend
//!
//! Sensor readings arrive over MQTT or HTTP and pass through the pump
//! transition correlator, which turns each real pump change into exactly one
//! notification and one misting session open/close. Everything that happens
//! is fanned out to dashboards over SSE and WebSocket.
//!
//! # Features
//!
//! - Misting session log with daily, monthly and yearly reports
//! - AUTO threshold control and MANUAL pump commands over MQTT
//! - Notification feed with read tracking and retention
//! - Thermal scan records for individual animals
//! - Dashboard accounts

pub mod client;
pub mod climate;
pub mod config;
pub mod error;
pub mod http_transport;
pub mod logging;
pub mod models;
pub mod realtime;
pub mod services;
pub mod storage;

pub use config::ServerConfig;
pub use error::{AgriError, Result};
