//! Domain services for the AgriCool server
//!
//! Each service wraps the store for one area. The correlator ties them
//! together for pump transitions.

pub mod auto_control;
pub mod correlator;
pub mod misting;
pub mod notifications;
pub mod reports;
pub mod retention;
pub mod thermal;
pub mod users;

pub use auto_control::{AutoController, AutoDecision};
pub use correlator::{
    ControlOutcome, CorrelatorStatus, IngestOutcome, PumpCorrelator, Transition,
};
pub use misting::MistingService;
pub use notifications::NotificationService;
pub use reports::{DailyBreakdown, Report, ReportPeriod, ReportQuery, ReportStats, ReportsService};
pub use retention::NotificationRetention;
pub use thermal::ThermalService;
pub use users::{LoginOutcome, UserService};
