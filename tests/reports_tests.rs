//! Report aggregation over stored sessions

mod common;

use agricool::climate::MetricsSnapshot;
use agricool::models::{MistingMode, MistingSession};
use agricool::services::{Report, ReportPeriod, ReportQuery};
use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use common::test_fixtures::ShedValues;
use common::TestHarness;
use pretty_assertions::assert_eq;
use rstest::rstest;

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

fn snapshot(temperature: f64, humidity: f64, water: i64) -> MetricsSnapshot {
    MetricsSnapshot::from_metrics(Some(temperature), Some(humidity), Some(water))
}

fn closed(
    id: i64,
    started_at: DateTime<Utc>,
    minutes: i64,
    start: MetricsSnapshot,
    end: MetricsSnapshot,
    mode: MistingMode,
) -> MistingSession {
    MistingSession {
        id,
        started_at,
        ended_at: Some(started_at + Duration::minutes(minutes)),
        start_metrics: start,
        end_metrics: Some(end),
        mode,
    }
}

fn june_sessions() -> Vec<MistingSession> {
    vec![
        closed(
            1,
            at(2025, 6, 3, 13),
            10,
            snapshot(ShedValues::DANGER_TEMP, 70.0, 90),
            snapshot(31.0, 75.0, 80),
            MistingMode::Auto,
        ),
        closed(
            2,
            at(2025, 6, 3, 13) + Duration::minutes(40),
            4,
            snapshot(ShedValues::WARNING_TEMP, 65.0, 80),
            snapshot(30.5, 70.0, 76),
            MistingMode::Manual,
        ),
        closed(
            3,
            at(2025, 6, 20, 9),
            6,
            snapshot(ShedValues::SAFE_TEMP, 60.0, 76),
            snapshot(27.4, 62.0, 74),
            MistingMode::Auto,
        ),
    ]
}

#[test]
fn test_monthly_report_aggregates() {
    let period = ReportPeriod::Monthly {
        year: 2025,
        month: 6,
    };
    let report = Report::build(period, june_sessions(), &Utc).unwrap();
    let stats = &report.stats;

    assert_eq!(report.label, "June 2025");
    assert_eq!(report.from, at(2025, 6, 1, 0));
    assert_eq!(report.to, at(2025, 7, 1, 0));

    assert_eq!(stats.total_events, 3);
    assert_eq!(stats.auto_events, 2);
    assert_eq!(stats.manual_events, 1);
    assert_eq!(
        (stats.safe_events, stats.warning_events, stats.danger_events),
        (1, 1, 1)
    );
    assert_eq!(stats.peak_temperature, 36.0);
    assert_eq!(stats.lowest_temperature, 28.0);
    assert_eq!(stats.total_duration_minutes, 20.0);
    assert_eq!(stats.avg_duration_minutes, 6.7);
    // (10 + 4 + 2) / 3
    assert_eq!(stats.avg_water_usage, 5.3);
    assert_eq!(stats.most_active_hour, Some(13));

    assert_eq!(report.daily_breakdown.len(), 2);
    let first = &report.daily_breakdown[0];
    assert_eq!(first.date, NaiveDate::from_ymd_opt(2025, 6, 3).unwrap());
    assert_eq!(first.events, 2);
    assert_eq!(first.total_duration_minutes, 14.0);
}

#[test]
fn test_daily_report_has_no_breakdown() {
    let period = ReportPeriod::Daily {
        date: NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
    };
    let sessions: Vec<_> = june_sessions().into_iter().take(2).collect();
    let report = Report::build(period, sessions, &Utc).unwrap();

    assert!(report.daily_breakdown.is_empty());
    let text = report.render_text("2025-06-03 18:00:00");
    assert!(text.contains("Report Period: DAILY - 2025-06-03"));
    assert!(text.contains("Total Misting Events: 2"));
    assert!(text.contains("Most Active Hour: 13:00"));
    assert!(!text.contains("DAILY BREAKDOWN"));
    assert_eq!(
        report.download_filename(NaiveDate::from_ymd_opt(2025, 6, 4).unwrap()),
        "misting-report-daily-2025-06-04.txt"
    );
}

#[test]
fn test_empty_period_renders_zeroes() {
    let report = Report::build(ReportPeriod::Yearly { year: 2024 }, Vec::new(), &Utc).unwrap();

    assert_eq!(report.stats.total_events, 0);
    assert_eq!(report.stats.most_active_hour, None);
    let text = report.render_text("2025-01-01 00:00:00");
    assert!(text.contains("Most Active Hour: N/A"));
    assert!(text.contains("Average Temperature: 0.0°C"));
}

#[rstest]
#[case(Some("daily"), Some("2025-02-30"))]
#[case(Some("hourly"), None)]
fn test_bad_queries_are_rejected(#[case] period: Option<&str>, #[case] date: Option<&str>) {
    let query = ReportQuery {
        period: period.map(str::to_string),
        date: date.map(str::to_string),
        ..Default::default()
    };
    let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
    assert!(ReportPeriod::from_query(&query, today).is_err());
}

#[tokio::test]
async fn test_generate_reads_sessions_in_local_period() {
    let harness = TestHarness::new().await;
    let db = &harness.state.db;

    let today = Local::now().date_naive();
    let local_noon = Local
        .from_local_datetime(&today.and_hms_opt(12, 0, 0).unwrap())
        .earliest()
        .unwrap()
        .with_timezone(&Utc);

    for (offset_days, temperature) in [(0, 33.0), (0, 36.5), (-400, 30.0)] {
        let started = local_noon + Duration::days(offset_days);
        let session = db
            .insert_session(started, snapshot(temperature, 65.0, 90), MistingMode::Auto)
            .await
            .unwrap();
        db.close_session(
            session.id,
            started + Duration::minutes(5),
            snapshot(temperature - 2.0, 70.0, 85),
        )
        .await
        .unwrap();
    }

    let period = harness
        .state
        .reports
        .period_for(&ReportQuery::default())
        .unwrap();
    assert_eq!(period, ReportPeriod::Daily { date: today });

    let report = harness.state.reports.generate(period).await.unwrap();
    assert_eq!(report.stats.total_events, 2);
    assert_eq!(report.stats.avg_temp_reduction, 2.0);
    assert_eq!(report.stats.avg_water_usage, 5.0);
    assert_eq!(report.stats.danger_events, 1);
    assert!(report.sessions[0].started_at <= report.sessions[1].started_at);
}
