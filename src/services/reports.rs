//! Daily, monthly and yearly misting reports

use crate::climate::{round_to, TemperatureZone};
use crate::error::{AgriError, Result};
use crate::models::{MistingMode, MistingSession};
use crate::services::MistingService;
use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Calendar window a report covers, in local time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "period", rename_all = "lowercase")]
pub enum ReportPeriod {
    Daily { date: NaiveDate },
    Monthly { year: i32, month: u32 },
    Yearly { year: i32 },
}

/// Query string of the report endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    pub period: Option<String>,
    pub date: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl ReportPeriod {
    /// Resolve query parameters, defaulting to the current day/month/year
    pub fn from_query(query: &ReportQuery, today: NaiveDate) -> Result<Self> {
        let year = query.year.unwrap_or(today.year());
        match query.period.as_deref().unwrap_or("daily") {
            "daily" => {
                let date = match query.date.as_deref() {
                    Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
                        AgriError::invalid_input(format!("Invalid report date '{raw}': {e}"))
                    })?,
                    None => today,
                };
                Ok(ReportPeriod::Daily { date })
            }
            "monthly" => {
                let month = query.month.unwrap_or(today.month());
                if !(1..=12).contains(&month) {
                    return Err(AgriError::invalid_input(format!(
                        "Month must be between 1 and 12, got {month}"
                    )));
                }
                Ok(ReportPeriod::Monthly { year, month })
            }
            "yearly" => Ok(ReportPeriod::Yearly { year }),
            other => Err(AgriError::invalid_input(format!(
                "Unknown report period '{other}' (expected daily, monthly or yearly)"
            ))),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ReportPeriod::Daily { .. } => "daily",
            ReportPeriod::Monthly { .. } => "monthly",
            ReportPeriod::Yearly { .. } => "yearly",
        }
    }

    /// `2025-03-01`, `March 2025` or `2025`
    pub fn label(&self) -> String {
        match self {
            ReportPeriod::Daily { date } => date.format("%Y-%m-%d").to_string(),
            ReportPeriod::Monthly { year, month } => {
                format!("{} {year}", MONTH_NAMES[(*month as usize).saturating_sub(1) % 12])
            }
            ReportPeriod::Yearly { year } => year.to_string(),
        }
    }

    /// First and one-past-last local dates
    fn date_bounds(&self) -> Result<(NaiveDate, NaiveDate)> {
        let invalid = || AgriError::invalid_input(format!("Invalid report period {}", self.label()));
        match *self {
            ReportPeriod::Daily { date } => Ok((date, date.succ_opt().ok_or_else(invalid)?)),
            ReportPeriod::Monthly { year, month } => {
                let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
                let end = if month == 12 {
                    NaiveDate::from_ymd_opt(year + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(year, month + 1, 1)
                }
                .ok_or_else(invalid)?;
                Ok((start, end))
            }
            ReportPeriod::Yearly { year } => Ok((
                NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(invalid)?,
                NaiveDate::from_ymd_opt(year + 1, 1, 1).ok_or_else(invalid)?,
            )),
        }
    }

    /// UTC instants `[from, to)` covering the period in `tz`
    pub fn utc_range<Tz: TimeZone>(&self, tz: &Tz) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let (start, end) = self.date_bounds()?;
        let to_utc = |date: NaiveDate| {
            date.and_hms_opt(0, 0, 0)
                .and_then(|midnight| tz.from_local_datetime(&midnight).earliest())
                .map(|dt| dt.with_timezone(&Utc))
                .ok_or_else(|| AgriError::invalid_input(format!("No local midnight on {date}")))
        };
        Ok((to_utc(start)?, to_utc(end)?))
    }
}

/// Aggregates shown on the reports page
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStats {
    pub total_events: usize,
    pub auto_events: usize,
    pub manual_events: usize,
    pub avg_temperature: f64,
    pub avg_humidity: f64,
    pub avg_heat_index: f64,
    pub avg_water_usage: f64,
    pub total_duration_minutes: f64,
    pub avg_duration_minutes: f64,
    pub avg_temp_reduction: f64,
    pub peak_temperature: f64,
    pub lowest_temperature: f64,
    pub safe_events: usize,
    pub warning_events: usize,
    pub danger_events: usize,
    /// Local hour (0-23) with the most session starts
    pub most_active_hour: Option<u32>,
    /// Mean °C drop per minute of misting
    pub efficiency: f64,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Zero readings are treated as sensor dropouts
fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v != 0.0)
}

impl ReportStats {
    pub fn compute<Tz: TimeZone>(sessions: &[MistingSession], tz: &Tz) -> Self {
        if sessions.is_empty() {
            return Self::default();
        }

        let start_temps: Vec<f64> = sessions
            .iter()
            .filter_map(|s| present(s.start_metrics.temperature))
            .collect();
        let start_humidity: Vec<f64> = sessions
            .iter()
            .filter_map(|s| present(s.start_metrics.humidity))
            .collect();
        let start_heat: Vec<f64> = sessions
            .iter()
            .filter_map(|s| present(s.start_metrics.heat_index))
            .collect();

        let water_usage: Vec<f64> = sessions
            .iter()
            .filter_map(|s| {
                let end = s.end_metrics.as_ref()?.water_level?;
                Some(s.start_metrics.water_level?.saturating_sub(end) as f64)
            })
            .collect();

        let durations: Vec<f64> = sessions.iter().map(MistingSession::duration_minutes).collect();

        let temp_drop = |s: &MistingSession| -> Option<f64> {
            let end = s.end_metrics.as_ref()?.temperature?;
            Some(s.start_metrics.temperature? - end)
        };
        let reductions: Vec<f64> = sessions.iter().filter_map(temp_drop).collect();

        let efficiencies: Vec<f64> = sessions
            .iter()
            .map(|s| {
                let drop = temp_drop(s).unwrap_or(0.0);
                let minutes = if s.is_open() { 1.0 } else { s.duration_minutes() };
                if minutes > 0.0 {
                    drop / minutes
                } else {
                    0.0
                }
            })
            .collect();

        let zone_count = |zone: TemperatureZone| {
            start_temps
                .iter()
                .filter(|t| TemperatureZone::classify(**t) == zone)
                .count()
        };

        let mut hours: BTreeMap<u32, usize> = BTreeMap::new();
        for session in sessions {
            *hours
                .entry(session.started_at.with_timezone(tz).hour())
                .or_default() += 1;
        }
        // Earliest hour wins a tie
        let most_active_hour = hours
            .iter()
            .fold(None, |best: Option<(u32, usize)>, (hour, count)| match best {
                Some((_, best_count)) if best_count >= *count => best,
                _ => Some((*hour, *count)),
            })
            .map(|(hour, _)| hour);

        Self {
            total_events: sessions.len(),
            auto_events: sessions
                .iter()
                .filter(|s| s.mode == MistingMode::Auto)
                .count(),
            manual_events: sessions
                .iter()
                .filter(|s| s.mode == MistingMode::Manual)
                .count(),
            avg_temperature: round_to(mean(&start_temps), 1),
            avg_humidity: round_to(mean(&start_humidity), 1),
            avg_heat_index: round_to(mean(&start_heat), 1),
            avg_water_usage: round_to(mean(&water_usage), 1),
            total_duration_minutes: durations.iter().sum::<f64>().round(),
            avg_duration_minutes: round_to(mean(&durations), 1),
            avg_temp_reduction: round_to(mean(&reductions), 1),
            peak_temperature: round_to(start_temps.iter().copied().fold(0.0, f64::max), 1),
            lowest_temperature: round_to(
                start_temps
                    .iter()
                    .copied()
                    .reduce(f64::min)
                    .unwrap_or(0.0),
                1,
            ),
            safe_events: zone_count(TemperatureZone::Safe),
            warning_events: zone_count(TemperatureZone::Warning),
            danger_events: zone_count(TemperatureZone::Danger),
            most_active_hour,
            efficiency: round_to(mean(&efficiencies), 2),
        }
    }
}

/// Per-day roll-up for monthly and yearly reports
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyBreakdown {
    pub date: NaiveDate,
    pub events: usize,
    pub avg_temperature: f64,
    pub avg_humidity: f64,
    pub total_duration_minutes: f64,
}

pub fn daily_breakdown<Tz: TimeZone>(sessions: &[MistingSession], tz: &Tz) -> Vec<DailyBreakdown> {
    let mut days: BTreeMap<NaiveDate, Vec<&MistingSession>> = BTreeMap::new();
    for session in sessions {
        days.entry(session.started_at.with_timezone(tz).date_naive())
            .or_default()
            .push(session);
    }

    days.into_iter()
        .map(|(date, day)| {
            let temps: Vec<f64> = day
                .iter()
                .filter_map(|s| present(s.start_metrics.temperature))
                .collect();
            let hums: Vec<f64> = day
                .iter()
                .filter_map(|s| present(s.start_metrics.humidity))
                .collect();

            DailyBreakdown {
                date,
                events: day.len(),
                avg_temperature: round_to(mean(&temps), 1),
                avg_humidity: round_to(mean(&hums), 1),
                total_duration_minutes: day.iter().map(|s| s.duration_minutes()).sum::<f64>().round(),
            }
        })
        .collect()
}

/// Everything the reports page renders for one period
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub period: ReportPeriod,
    pub label: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub stats: ReportStats,
    pub daily_breakdown: Vec<DailyBreakdown>,
    pub sessions: Vec<MistingSession>,
}

impl Report {
    pub fn build<Tz: TimeZone>(
        period: ReportPeriod,
        sessions: Vec<MistingSession>,
        tz: &Tz,
    ) -> Result<Self> {
        let (from, to) = period.utc_range(tz)?;
        let daily_breakdown = match period {
            ReportPeriod::Daily { .. } => Vec::new(),
            _ => daily_breakdown(&sessions, tz),
        };

        Ok(Self {
            label: period.label(),
            stats: ReportStats::compute(&sessions, tz),
            period,
            from,
            to,
            daily_breakdown,
            sessions,
        })
    }

    pub fn download_filename(&self, generated: NaiveDate) -> String {
        format!(
            "misting-report-{}-{}.txt",
            self.period.kind(),
            generated.format("%Y-%m-%d")
        )
    }

    /// Plain-text report offered as a download
    pub fn render_text(&self, generated_at: &str) -> String {
        const RULE: &str = "═══════════════════════════════════════════════════════════";
        const THIN: &str = "─────────────────────────────────────────────────────────";
        let s = &self.stats;
        let mut out = String::new();

        // Writing into a String cannot fail
        let _ = writeln!(out, "AGRICOOL MISTING SYSTEM REPORT");
        let _ = writeln!(out, "Generated: {generated_at}");
        let _ = writeln!(
            out,
            "Report Period: {} - {}",
            self.period.kind().to_uppercase(),
            self.label
        );
        let _ = writeln!(out, "\n{RULE}\n");

        let _ = writeln!(out, "SUMMARY STATISTICS\n{THIN}");
        let _ = writeln!(out, "Total Misting Events: {}", s.total_events);
        let _ = writeln!(out, "  • Automatic Events: {}", s.auto_events);
        let _ = writeln!(out, "  • Manual Events: {}\n", s.manual_events);

        let _ = writeln!(out, "TEMPERATURE DATA\n{THIN}");
        let _ = writeln!(out, "Average Temperature: {:.1}°C", s.avg_temperature);
        let _ = writeln!(out, "Peak Temperature: {:.1}°C", s.peak_temperature);
        let _ = writeln!(out, "Lowest Temperature: {:.1}°C", s.lowest_temperature);
        let _ = writeln!(out, "Average Temp Reduction: {:.1}°C\n", s.avg_temp_reduction);

        let _ = writeln!(out, "HUMIDITY & ENVIRONMENT\n{THIN}");
        let _ = writeln!(out, "Average Humidity: {:.1}%", s.avg_humidity);
        let _ = writeln!(out, "Average Heat Index: {:.1}°C\n", s.avg_heat_index);

        let _ = writeln!(out, "OPERATIONAL DATA\n{THIN}");
        let _ = writeln!(out, "Total Runtime: {:.0} minutes", s.total_duration_minutes);
        let _ = writeln!(
            out,
            "Average Duration per Event: {:.1} minutes",
            s.avg_duration_minutes
        );
        let _ = writeln!(out, "Average Water Usage: {:.1}%", s.avg_water_usage);
        let _ = writeln!(out, "System Efficiency: {:.2}°C/min\n", s.efficiency);

        let _ = writeln!(out, "SAFETY ANALYSIS\n{THIN}");
        let _ = writeln!(out, "Safe Conditions (<30°C): {} events", s.safe_events);
        let _ = writeln!(out, "Warning Conditions (30-35°C): {} events", s.warning_events);
        let _ = writeln!(out, "Danger Conditions (≥35°C): {} events", s.danger_events);
        let _ = writeln!(
            out,
            "Most Active Hour: {}",
            s.most_active_hour
                .map(|h| format!("{h}:00"))
                .unwrap_or_else(|| "N/A".to_string())
        );

        if !self.daily_breakdown.is_empty() {
            let _ = writeln!(out, "\nDAILY BREAKDOWN\n{THIN}");
            for day in &self.daily_breakdown {
                let _ = writeln!(
                    out,
                    "{}: {} events, Avg Temp: {:.1}°C, Duration: {:.0}min",
                    day.date.format("%Y-%m-%d"),
                    day.events,
                    day.avg_temperature,
                    day.total_duration_minutes
                );
            }
        }

        let _ = writeln!(out, "\n{RULE}\nEnd of Report");
        out
    }
}

pub struct ReportsService {
    misting: Arc<MistingService>,
}

impl ReportsService {
    pub fn new(misting: Arc<MistingService>) -> Self {
        Self { misting }
    }

    /// Resolve the query against today's local date
    pub fn period_for(&self, query: &ReportQuery) -> Result<ReportPeriod> {
        ReportPeriod::from_query(query, Local::now().date_naive())
    }

    pub async fn generate(&self, period: ReportPeriod) -> Result<Report> {
        let (from, to) = period.utc_range(&Local)?;
        let sessions = self.misting.between(from, to).await?;
        Report::build(period, sessions, &Local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::climate::MetricsSnapshot;
    use chrono::Duration;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_monthly_range_wraps_year() {
        let period = ReportPeriod::Monthly {
            year: 2024,
            month: 12,
        };
        let (from, to) = period.utc_range(&Utc).unwrap();
        assert_eq!(from, at(2024, 12, 1, 0));
        assert_eq!(to, at(2025, 1, 1, 0));
        assert_eq!(period.label(), "December 2024");
    }

    #[test]
    fn test_query_defaults_and_validation() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        assert_eq!(
            ReportPeriod::from_query(&ReportQuery::default(), today).unwrap(),
            ReportPeriod::Daily { date: today }
        );

        let bad_month = ReportQuery {
            period: Some("monthly".to_string()),
            month: Some(13),
            ..Default::default()
        };
        assert!(ReportPeriod::from_query(&bad_month, today).is_err());

        let unknown = ReportQuery {
            period: Some("weekly".to_string()),
            ..Default::default()
        };
        assert!(ReportPeriod::from_query(&unknown, today).is_err());
    }

    #[test]
    fn test_empty_report_renders() {
        let period = ReportPeriod::Daily {
            date: NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
        };
        let report = Report::build(period, Vec::new(), &Utc).unwrap();
        let text = report.render_text("2025-06-15 08:00");

        assert_eq!(report.stats, ReportStats::default());
        assert!(text.starts_with("AGRICOOL MISTING SYSTEM REPORT"));
        assert!(text.contains("Report Period: DAILY - 2025-06-15"));
        assert!(text.contains("Most Active Hour: N/A"));
        assert!(!text.contains("DAILY BREAKDOWN"));
        assert_eq!(
            report.download_filename(NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()),
            "misting-report-daily-2025-06-16.txt"
        );
    }

    #[test]
    fn test_open_session_efficiency_uses_one_minute() {
        let open = MistingSession {
            id: 1,
            started_at: at(2025, 6, 15, 13),
            ended_at: None,
            start_metrics: MetricsSnapshot::from_metrics(Some(34.0), Some(60.0), Some(90)),
            end_metrics: None,
            mode: MistingMode::Auto,
        };
        let closed = MistingSession {
            id: 2,
            ended_at: Some(at(2025, 6, 15, 13) + Duration::minutes(10)),
            end_metrics: Some(MetricsSnapshot::from_metrics(Some(30.0), Some(70.0), Some(80))),
            ..open.clone()
        };

        let stats = ReportStats::compute(&[open, closed], &Utc);
        assert_eq!(stats.total_duration_minutes, 10.0);
        assert_eq!(stats.avg_duration_minutes, 5.0);
        // closed: 4 °C over 10 min; open: no end reading, so no drop
        assert_eq!(stats.efficiency, 0.2);
        assert_eq!(stats.avg_water_usage, 10.0);
        assert_eq!(stats.most_active_hour, Some(13));
    }
}
