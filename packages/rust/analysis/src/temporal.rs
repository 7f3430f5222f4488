//! Engagement by weekday and hour of publication.

use std::collections::BTreeMap;

use chrono::{Datelike, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use channelscope_shared::ItemRecord;

/// Day of week, ordered Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => Self::Monday,
            Weekday::Tue => Self::Tuesday,
            Weekday::Wed => Self::Wednesday,
            Weekday::Thu => Self::Thursday,
            Weekday::Fri => Self::Friday,
            Weekday::Sat => Self::Saturday,
            Weekday::Sun => Self::Sunday,
        }
    }
}

impl std::fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
            Self::Saturday => "Saturday",
            Self::Sunday => "Sunday",
        };
        f.write_str(name)
    }
}

/// Why a temporal profile is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalDegradation {
    /// No item carries a publish timestamp.
    NoTimestamps,
    /// At least one timestamp could not be parsed.
    Unparseable,
}

/// Mean engagement rate grouped by publish weekday and hour (UTC).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemporalProfile {
    pub by_day: BTreeMap<DayOfWeek, f64>,
    pub by_hour: BTreeMap<u32, f64>,
    pub best_day: Option<DayOfWeek>,
    pub best_hour: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degradation: Option<TemporalDegradation>,
}

impl TemporalProfile {
    fn degraded(reason: TemporalDegradation) -> Self {
        Self {
            degradation: Some(reason),
            ..Self::default()
        }
    }
}

/// Group engagement by publish time.
///
/// Items without a timestamp are ignored. A single malformed timestamp
/// invalidates the whole profile.
pub fn compute_temporal_profile(items: &[ItemRecord]) -> TemporalProfile {
    let mut by_day: BTreeMap<DayOfWeek, (f64, usize)> = BTreeMap::new();
    let mut by_hour: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    let mut seen = 0;

    for item in items {
        if item.published_at.is_none() {
            continue;
        }
        let Some(ts) = item.published_at_utc() else {
            tracing::debug!(item = %item.id, raw = ?item.published_at, "unparseable publish timestamp");
            return TemporalProfile::degraded(TemporalDegradation::Unparseable);
        };
        seen += 1;

        let day = by_day.entry(ts.weekday().into()).or_default();
        day.0 += item.engagement_rate;
        day.1 += 1;
        let hour = by_hour.entry(ts.hour()).or_default();
        hour.0 += item.engagement_rate;
        hour.1 += 1;
    }

    if seen == 0 {
        return TemporalProfile::degraded(TemporalDegradation::NoTimestamps);
    }

    let by_day = averages(by_day);
    let by_hour = averages(by_hour);
    TemporalProfile {
        best_day: argmax(&by_day),
        best_hour: argmax(&by_hour),
        by_day,
        by_hour,
        degradation: None,
    }
}

fn averages<K: Ord>(groups: BTreeMap<K, (f64, usize)>) -> BTreeMap<K, f64> {
    groups
        .into_iter()
        .map(|(k, (sum, n))| (k, sum / n as f64))
        .collect()
}

/// Key of the largest value; ties go to the smallest key.
fn argmax<K: Ord + Copy>(values: &BTreeMap<K, f64>) -> Option<K> {
    let mut best: Option<(K, f64)> = None;
    for (k, v) in values {
        match best {
            Some((_, b)) if *v <= b => {}
            _ => best = Some((*k, *v)),
        }
    }
    best.map(|(k, _)| k)
}
