#![no_main]

use libfuzzer_sys::fuzz_target;
use time::{Duration, OffsetDateTime};
use tune_history::aggregate::{GroupKey, MetricKind};
use tune_history::bucket::TimeScope;
use tune_history::model::{EventLog, StreamEvent};
use tune_history::report::{ReportBuilder, ReportId};

const NAMES: [&str; 4] = ["a", "b", "c", "unknown"];

fuzz_target!(|data: &[u8]| {
    let events: Vec<StreamEvent> = data
        .chunks_exact(4)
        .map(|chunk| {
            let hours = i64::from(u16::from_le_bytes([chunk[0], chunk[1]]));
            let name = |byte: u8| match byte % 5 {
                4 => None,
                idx => Some(NAMES[usize::from(idx)].to_string()),
            };
            StreamEvent {
                timestamp: OffsetDateTime::UNIX_EPOCH + Duration::hours(hours * 7),
                ms_played: u64::from(chunk[2]) * 1_000,
                artist: name(chunk[3]),
                album: name(chunk[3] / 5),
                track: name(chunk[3] / 25),
            }
        })
        .collect();
    let log = EventLog::new(events);
    let top_n = usize::from(data.first().copied().unwrap_or(20) % 32).max(1);
    let reports = ReportBuilder::new(top_n).build(&log);

    let Ok(span) = log.year_span() else {
        assert!(reports.is_empty());
        return;
    };

    for year in span.years() {
        for month in 1..=12 {
            let id = ReportId::new(
                MetricKind::TotalDuration,
                GroupKey::None,
                TimeScope::PerYearMonth(year, month),
            );
            assert!(reports.contains_key(&id));
        }
    }

    for value in reports.values() {
        if let Some(ranked) = value.as_ranked() {
            assert!(ranked.len() <= top_n);
            for pair in ranked.entries().windows(2) {
                assert!(pair[0].value.as_f64() >= pair[1].value.as_f64());
            }
        }
    }
});
