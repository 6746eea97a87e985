use crate::model::StreamEvent;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

const MS_PER_MINUTE: f64 = 60_000.0;

/// Dimension used to split a bucket before reducing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    None,
    Artist,
    Album,
    Track,
}

impl GroupKey {
    pub const DIMENSIONS: [Self; 3] = [Self::Artist, Self::Album, Self::Track];

    pub fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Artist => "artist",
            Self::Album => "album",
            Self::Track => "track",
        }
    }

    fn field(self, event: &StreamEvent) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Artist => event.artist.as_deref(),
            Self::Album => event.album.as_deref(),
            Self::Track => event.track.as_deref(),
        }
    }

    fn group_label(self, field: Option<&str>) -> GroupLabel {
        match (self, field) {
            (Self::None, _) => GroupLabel::Total,
            (_, Some(name)) => GroupLabel::Named(name.to_string()),
            (_, None) => GroupLabel::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKind {
    TotalDuration,
    StreamCount,
}

impl MetricKind {
    pub const ALL: [Self; 2] = [Self::TotalDuration, Self::StreamCount];

    pub fn label(self) -> &'static str {
        match self {
            Self::TotalDuration => "duration",
            Self::StreamCount => "streams",
        }
    }

    /// Value of a group with no events in it.
    pub fn zero(self) -> MetricValue {
        match self {
            Self::TotalDuration => MetricValue::Minutes(0.0),
            Self::StreamCount => MetricValue::Streams(0),
        }
    }
}

/// Identity of one group inside a bucket.
///
/// Variant order doubles as the ranking tie-break: named groups sort by
/// their text and the unknown group comes after all of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupLabel {
    /// The single group produced by `GroupKey::None`.
    Total,
    Named(String),
    /// Events whose metadata field was null.
    Unknown,
}

impl GroupLabel {
    pub const UNKNOWN_SENTINEL: &'static str = "unknown";
}

impl fmt::Display for GroupLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Total => f.write_str("total"),
            Self::Named(name) => f.write_str(name),
            Self::Unknown => f.write_str(Self::UNKNOWN_SENTINEL),
        }
    }
}

impl Serialize for GroupLabel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Minutes(f64),
    Streams(u64),
}

impl MetricValue {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Minutes(minutes) => minutes,
            Self::Streams(count) => count as f64,
        }
    }

    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Streams(a), Self::Streams(b)) => a.cmp(b),
            _ => self.as_f64().total_cmp(&other.as_f64()),
        }
    }
}

pub type Grouped = HashMap<GroupLabel, MetricValue>;

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    ms_played: u64,
    streams: u64,
}

impl Tally {
    fn add(&mut self, event: &StreamEvent) {
        self.ms_played = self.ms_played.saturating_add(event.ms_played);
        self.streams = self.streams.saturating_add(1);
    }

    fn value(self, metric: MetricKind) -> MetricValue {
        match metric {
            // integer milliseconds are divided once, at the end
            MetricKind::TotalDuration => MetricValue::Minutes(self.ms_played as f64 / MS_PER_MINUTE),
            MetricKind::StreamCount => MetricValue::Streams(self.streams),
        }
    }
}

/// Groups `events` by `group_by` and reduces each group to `metric`.
///
/// Only groups that received at least one event appear in the output, so an
/// empty input gives an empty map.
pub fn aggregate<'a, I>(events: I, group_by: GroupKey, metric: MetricKind) -> Grouped
where
    I: IntoIterator<Item = &'a StreamEvent>,
{
    let mut tallies: HashMap<Option<&'a str>, Tally> = HashMap::new();
    for event in events {
        tallies
            .entry(group_by.field(event))
            .or_default()
            .add(event);
    }

    tallies
        .into_iter()
        .map(|(field, tally)| (group_by.group_label(field), tally.value(metric)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use time::OffsetDateTime;
    use time::macros::datetime;

    fn play(artist: Option<&str>, ms_played: u64) -> StreamEvent {
        StreamEvent {
            timestamp: datetime!(2023-01-15 12:00 UTC),
            ms_played,
            artist: artist.map(str::to_string),
            album: None,
            track: None,
        }
    }

    #[test]
    fn duration_sums_milliseconds_into_minutes() {
        let events = vec![play(Some("A"), 180_000), play(Some("B"), 120_000), play(Some("A"), 60_000)];

        let by_artist = aggregate(&events, GroupKey::Artist, MetricKind::TotalDuration);
        assert_eq!(by_artist.len(), 2);
        assert_eq!(
            by_artist[&GroupLabel::Named(String::from("A"))],
            MetricValue::Minutes(4.0)
        );
        assert_eq!(
            by_artist[&GroupLabel::Named(String::from("B"))],
            MetricValue::Minutes(2.0)
        );

        let total = aggregate(&events, GroupKey::None, MetricKind::TotalDuration);
        assert_eq!(total.len(), 1);
        assert_eq!(total[&GroupLabel::Total], MetricValue::Minutes(6.0));
    }

    #[test]
    fn null_metadata_forms_its_own_group() {
        let events = vec![play(None, 1_000), play(Some("unknown"), 1_000), play(None, 1_000)];

        let grouped = aggregate(&events, GroupKey::Artist, MetricKind::StreamCount);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[&GroupLabel::Unknown], MetricValue::Streams(2));
        assert_eq!(
            grouped[&GroupLabel::Named(String::from("unknown"))],
            MetricValue::Streams(1)
        );
    }

    #[test]
    fn empty_input_yields_empty_mapping() {
        let events: Vec<StreamEvent> = Vec::new();
        for metric in MetricKind::ALL {
            assert!(aggregate(&events, GroupKey::None, metric).is_empty());
            assert!(aggregate(&events, GroupKey::Track, metric).is_empty());
        }
    }

    #[test]
    fn zero_length_plays_still_count_as_streams() {
        let events = vec![play(Some("A"), 0)];
        assert_eq!(
            aggregate(&events, GroupKey::Artist, MetricKind::StreamCount)
                [&GroupLabel::Named(String::from("A"))],
            MetricValue::Streams(1)
        );
        assert_eq!(
            aggregate(&events, GroupKey::Artist, MetricKind::TotalDuration)
                [&GroupLabel::Named(String::from("A"))],
            MetricValue::Minutes(0.0)
        );
    }

    fn arb_label() -> impl Strategy<Value = Option<&'static str>> {
        prop::option::of(prop::sample::select(vec!["a", "b", "c", "d"]))
    }

    fn arb_events() -> impl Strategy<Value = Vec<StreamEvent>> {
        prop::collection::vec(
            (arb_label(), arb_label(), arb_label(), 0u64..600_000, 0i64..200_000_000),
            0..120,
        )
        .prop_map(|rows| {
            rows.into_iter()
                .map(|(artist, album, track, ms_played, offset)| StreamEvent {
                    timestamp: OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(offset),
                    ms_played,
                    artist: artist.map(str::to_string),
                    album: album.map(str::to_string),
                    track: track.map(str::to_string),
                })
                .collect()
        })
    }

    proptest::proptest! {
        #[test]
        fn stream_counts_partition_the_input(events in arb_events()) {
            let total = aggregate(&events, GroupKey::None, MetricKind::StreamCount);
            if events.is_empty() {
                prop_assert_eq!(total.len(), 0);
            } else {
                prop_assert_eq!(total[&GroupLabel::Total], MetricValue::Streams(events.len() as u64));
            }

            for group_by in GroupKey::DIMENSIONS {
                let grouped = aggregate(&events, group_by, MetricKind::StreamCount);
                let sum: f64 = grouped.values().map(|value| value.as_f64()).sum();
                prop_assert_eq!(sum as usize, events.len());
                prop_assert!(grouped.values().all(|value| value.as_f64() > 0.0));
            }
        }

        #[test]
        fn total_duration_matches_direct_sum(events in arb_events()) {
            let direct = events.iter().map(|event| event.ms_played).sum::<u64>() as f64 / 60_000.0;
            let total = aggregate(&events, GroupKey::None, MetricKind::TotalDuration)
                .get(&GroupLabel::Total)
                .map_or(0.0, |value| value.as_f64());
            prop_assert!((total - direct).abs() < 1e-9);
        }
    }
}
