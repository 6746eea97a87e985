use crate::bucket::{self, TimeScope};
use crate::error::{HistoryError, InvalidEvent};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::ops::RangeInclusive;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// One playback of one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    pub timestamp: OffsetDateTime,
    pub ms_played: u64,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub track: Option<String>,
}

/// A record as found in an extended streaming history export.
///
/// Every field is optional here; `StreamEvent::try_from` decides what is
/// usable. Fields the exports carry but the reports never look at are ignored.
/// A `ts` or `ms_played` of the wrong JSON type reads as absent, so one bad
/// record is dropped on its own instead of failing its whole file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStreamRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub ts: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub ms_played: Option<i64>,
    #[serde(default, rename = "master_metadata_track_name")]
    pub track_name: Option<String>,
    #[serde(default, rename = "master_metadata_album_artist_name")]
    pub artist_name: Option<String>,
    #[serde(default, rename = "master_metadata_album_album_name")]
    pub album_name: Option<String>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| serde_json::from_value(value).ok()))
}

impl TryFrom<RawStreamRecord> for StreamEvent {
    type Error = InvalidEvent;

    fn try_from(record: RawStreamRecord) -> Result<Self, Self::Error> {
        let raw_ts = record.ts.ok_or(InvalidEvent::MissingTimestamp)?;
        let timestamp = OffsetDateTime::parse(raw_ts.trim(), &Rfc3339)
            .map_err(|_| InvalidEvent::UnparseableTimestamp(raw_ts))?;
        let ms_played = record.ms_played.ok_or(InvalidEvent::MissingDuration)?;
        let ms_played =
            u64::try_from(ms_played).map_err(|_| InvalidEvent::NegativeDuration(ms_played))?;

        Ok(Self {
            timestamp,
            ms_played,
            artist: record.artist_name,
            album: record.album_name,
            track: record.track_name,
        })
    }
}

/// First and last calendar year touched by a non-empty log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearSpan {
    pub first: i32,
    pub last: i32,
}

impl YearSpan {
    pub fn years(self) -> RangeInclusive<i32> {
        self.first..=self.last
    }
}

/// Stream events ordered by timestamp.
///
/// Built once from ingested events and read-only afterwards. Events sharing
/// a timestamp keep the order they were handed over in.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<StreamEvent>,
}

impl EventLog {
    pub fn new(mut events: Vec<StreamEvent>) -> Self {
        // sort_by_key is stable
        events.sort_by_key(|event| event.timestamp);
        Self { events }
    }

    pub fn events(&self) -> &[StreamEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn total_ms_played(&self) -> u64 {
        self.events
            .iter()
            .fold(0_u64, |total, event| total.saturating_add(event.ms_played))
    }

    /// Year range covered by the log, or `EmptyLog` when there is nothing to span.
    pub fn year_span(&self) -> Result<YearSpan, HistoryError> {
        // Ordering is by instant while years are read off each stored value,
        // so scan for the extremes instead of trusting the ends of the log.
        let mut years = self
            .events
            .iter()
            .map(|event| bucket::year_of(event.timestamp));
        let Some(seed) = years.next() else {
            return Err(HistoryError::EmptyLog);
        };
        let (first, last) = years.fold((seed, seed), |(lo, hi), year| (lo.min(year), hi.max(year)));
        Ok(YearSpan { first, last })
    }

    pub fn in_scope(&self, scope: TimeScope) -> impl Iterator<Item = &StreamEvent> {
        self.events
            .iter()
            .filter(move |event| scope.contains(event.timestamp))
    }
}

impl FromIterator<StreamEvent> for EventLog {
    fn from_iter<I: IntoIterator<Item = StreamEvent>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn event(timestamp: OffsetDateTime, track: &str) -> StreamEvent {
        StreamEvent {
            timestamp,
            ms_played: 1_000,
            artist: None,
            album: None,
            track: Some(track.to_string()),
        }
    }

    #[test]
    fn log_sorts_by_timestamp_and_keeps_ties_in_input_order() {
        let log = EventLog::new(vec![
            event(datetime!(2023-03-01 10:00 UTC), "late"),
            event(datetime!(2022-01-01 00:00 UTC), "tie-a"),
            event(datetime!(2021-06-01 00:00 UTC), "early"),
            event(datetime!(2022-01-01 00:00 UTC), "tie-b"),
        ]);

        let tracks: Vec<&str> = log
            .events()
            .iter()
            .filter_map(|event| event.track.as_deref())
            .collect();
        assert_eq!(tracks, vec!["early", "tie-a", "tie-b", "late"]);
    }

    #[test]
    fn year_span_covers_first_and_last_year() {
        let log = EventLog::new(vec![
            event(datetime!(2024-12-31 23:00 UTC), "b"),
            event(datetime!(2019-01-01 00:00 UTC), "a"),
        ]);

        let span = log.year_span().expect("span");
        assert_eq!(span, YearSpan { first: 2019, last: 2024 });
        assert_eq!(span.years().count(), 6);
    }

    #[test]
    fn empty_log_has_no_year_span() {
        let log = EventLog::default();
        assert_eq!(log.year_span(), Err(HistoryError::EmptyLog));
        assert_eq!(log.total_ms_played(), 0);
    }

    #[test]
    fn raw_record_converts_with_unknown_metadata_preserved() {
        let record = RawStreamRecord {
            ts: Some(String::from("2023-01-15T08:30:00Z")),
            ms_played: Some(0),
            track_name: Some(String::from("Song")),
            artist_name: None,
            album_name: None,
        };

        let event = StreamEvent::try_from(record).expect("valid record");
        assert_eq!(event.timestamp, datetime!(2023-01-15 08:30 UTC));
        assert_eq!(event.ms_played, 0);
        assert_eq!(event.artist, None);
        assert_eq!(event.track.as_deref(), Some("Song"));
    }

    #[test]
    fn raw_record_validation_rejects_bad_records() {
        let missing_ts = RawStreamRecord {
            ms_played: Some(10),
            ..RawStreamRecord::default()
        };
        assert_eq!(
            StreamEvent::try_from(missing_ts),
            Err(InvalidEvent::MissingTimestamp)
        );

        let garbled_ts = RawStreamRecord {
            ts: Some(String::from("yesterday")),
            ms_played: Some(10),
            ..RawStreamRecord::default()
        };
        assert_eq!(
            StreamEvent::try_from(garbled_ts),
            Err(InvalidEvent::UnparseableTimestamp(String::from("yesterday")))
        );

        let missing_duration = RawStreamRecord {
            ts: Some(String::from("2023-01-15T08:30:00Z")),
            ..RawStreamRecord::default()
        };
        assert_eq!(
            StreamEvent::try_from(missing_duration),
            Err(InvalidEvent::MissingDuration)
        );

        let negative = RawStreamRecord {
            ts: Some(String::from("2023-01-15T08:30:00Z")),
            ms_played: Some(-5),
            ..RawStreamRecord::default()
        };
        assert_eq!(
            StreamEvent::try_from(negative),
            Err(InvalidEvent::NegativeDuration(-5))
        );
    }

    #[test]
    fn mistyped_fields_read_as_absent() {
        let records: Vec<RawStreamRecord> = serde_json::from_str(
            r#"[
                { "ts": "2023-01-15T08:00:00Z", "ms_played": 1000 },
                { "ts": "2023-01-16T08:00:00Z", "ms_played": "n/a" },
                { "ts": 1673856000, "ms_played": 1000 },
                { "ts": "2023-01-17T08:00:00Z", "ms_played": 12.5 }
            ]"#,
        )
        .expect("records parse");

        let results: Vec<Result<StreamEvent, InvalidEvent>> =
            records.into_iter().map(StreamEvent::try_from).collect();
        assert_eq!(results[0].as_ref().map(|event| event.ms_played), Ok(1_000));
        assert_eq!(results[1], Err(InvalidEvent::MissingDuration));
        assert_eq!(results[2], Err(InvalidEvent::MissingTimestamp));
        assert_eq!(results[3], Err(InvalidEvent::MissingDuration));
    }

    #[test]
    fn in_scope_filters_by_calendar_bucket() {
        let log = EventLog::new(vec![
            event(datetime!(2023-01-15 07:00 UTC), "jan"),
            event(datetime!(2023-02-01 07:30 UTC), "feb"),
            event(datetime!(2024-02-01 22:00 UTC), "next-year"),
        ]);

        assert_eq!(log.in_scope(TimeScope::AllTime).count(), 3);
        assert_eq!(log.in_scope(TimeScope::PerYear(2023)).count(), 2);
        assert_eq!(log.in_scope(TimeScope::PerYearMonth(2023, 2)).count(), 1);
        assert_eq!(log.in_scope(TimeScope::PerHourOfDay(7)).count(), 2);
        assert_eq!(
            log.in_scope(TimeScope::PerHourOfDayPerYear { year: 2024, hour: 22 })
                .count(),
            1
        );
    }
}
