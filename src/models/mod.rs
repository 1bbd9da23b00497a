//! Data models shared by storage, services and the HTTP layer

pub mod misting;
pub mod notification;
pub mod reading;
pub mod thermal;
pub mod user;

pub use misting::{EndSession, MistingMode, MistingSession, StartSession};
pub use notification::{NewNotification, Notification, NotificationKind};
pub use reading::{IngestReading, SensorReading};
pub use thermal::{
    FormattedThermalRecord, HealthStatus, NewThermalRecord, SensorThermalReading, ThermalFilter,
    ThermalRecord,
};
pub use user::{LoginRequest, SecurityUpdate, SignupRequest, User};
