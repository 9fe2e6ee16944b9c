//! Narrative time buckets and change series.
//!
//! Buckets are recomputed in full from the events passed in; nothing here is
//! incremental. Current and prior counts for a change row always come from
//! the same aggregation pass.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::change::{classify_change, relative_change, ChangeStatus, ChangeThresholds};
use crate::event::SentenceEvent;
use crate::sentiment::Sentiment;

/// Bucket width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Frequency {
    /// Weeks starting on Monday.
    #[serde(rename = "W")]
    Weekly,
    /// Calendar months.
    #[serde(rename = "M")]
    Monthly,
}

impl Frequency {
    /// First day of the bucket containing `date`.
    pub fn bucket_start(self, date: NaiveDate) -> NaiveDate {
        match self {
            Frequency::Weekly => {
                let offset = date.weekday().num_days_from_monday() as u64;
                date.checked_sub_days(Days::new(offset)).unwrap_or(date)
            }
            Frequency::Monthly => date.with_day(1).unwrap_or(date),
        }
    }

    /// Start of the bucket following the one starting at `period_start`.
    pub fn next(self, period_start: NaiveDate) -> Option<NaiveDate> {
        match self {
            Frequency::Weekly => period_start.checked_add_days(Days::new(7)),
            Frequency::Monthly => period_start.checked_add_months(Months::new(1)),
        }
    }

    /// Start of the bucket preceding the one starting at `period_start`.
    pub fn previous(self, period_start: NaiveDate) -> Option<NaiveDate> {
        match self {
            Frequency::Weekly => period_start.checked_sub_days(Days::new(7)),
            Frequency::Monthly => period_start.checked_sub_months(Months::new(1)),
        }
    }
}

/// Narrative count for one product pair in one period.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NarrativeTimeBucket {
    pub period_start: NaiveDate,
    pub freq: Frequency,
    pub narrative_type: String,
    pub narrative_subtype: String,
    pub product_a: String,
    pub product_b: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SeriesKey {
    freq: Frequency,
    narrative_type: String,
    narrative_subtype: String,
    product_a: String,
    product_b: String,
}

/// Count labeled events per period, narrative subtype and product pair.
///
/// Unlabeled events are excluded. Output is sorted by period, then by the
/// narrative and pair fields.
pub fn aggregate_narratives<'e, I>(events: I, freq: Frequency) -> Vec<NarrativeTimeBucket>
where
    I: IntoIterator<Item = (NaiveDate, &'e SentenceEvent)>,
{
    let mut counts: BTreeMap<(NaiveDate, SeriesKey), u64> = BTreeMap::new();
    for (date, event) in events {
        if !event.is_labeled() {
            continue;
        }
        let key = SeriesKey {
            freq,
            narrative_type: event.narrative_type.clone(),
            narrative_subtype: event.narrative_subtype.clone(),
            product_a: event.product_a.clone(),
            product_b: event.product_b.clone(),
        };
        *counts.entry((freq.bucket_start(date), key)).or_insert(0) += u64::from(event.count);
    }
    counts
        .into_iter()
        .map(|((period_start, key), count)| NarrativeTimeBucket {
            period_start,
            freq: key.freq,
            narrative_type: key.narrative_type,
            narrative_subtype: key.narrative_subtype,
            product_a: key.product_a,
            product_b: key.product_b,
            count,
        })
        .collect()
}

/// Sentiment volume for one product pair in one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentBucket {
    pub period_start: NaiveDate,
    pub freq: Frequency,
    pub product_a: String,
    pub product_b: String,
    pub sentiment: Sentiment,
    pub count: u64,
    /// Share of the pair's sentiment-bearing count in this period.
    pub ratio: f64,
}

/// Count events per period, product pair and sentiment label, with each
/// label's share of its pair's period total.
///
/// Events without a sentiment label are skipped; the narrative label plays
/// no part. Output is sorted by pair, then sentiment, then period.
pub fn sentiment_buckets<'e, I>(events: I, freq: Frequency) -> Vec<SentimentBucket>
where
    I: IntoIterator<Item = (NaiveDate, &'e SentenceEvent)>,
{
    let mut counts: BTreeMap<(String, String, Sentiment, NaiveDate), u64> = BTreeMap::new();
    let mut totals: BTreeMap<(String, String, NaiveDate), u64> = BTreeMap::new();
    for (date, event) in events {
        let Some(sentiment) = event.sentiment_label else {
            continue;
        };
        let period_start = freq.bucket_start(date);
        let weight = u64::from(event.count);
        let pair = (event.product_a.clone(), event.product_b.clone());
        *counts
            .entry((pair.0.clone(), pair.1.clone(), sentiment, period_start))
            .or_insert(0) += weight;
        *totals.entry((pair.0, pair.1, period_start)).or_insert(0) += weight;
    }
    counts
        .into_iter()
        .map(|((product_a, product_b, sentiment, period_start), count)| {
            let total = totals
                .get(&(product_a.clone(), product_b.clone(), period_start))
                .copied()
                .unwrap_or(count);
            SentimentBucket {
                period_start,
                freq,
                product_a,
                product_b,
                sentiment,
                count,
                ratio: count as f64 / total.max(1) as f64,
            }
        })
        .collect()
}

/// Change attribution for one series in one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRow {
    pub period_start: NaiveDate,
    pub freq: Frequency,
    pub narrative_type: String,
    pub narrative_subtype: String,
    pub product_a: String,
    pub product_b: String,
    pub current_count: u64,
    /// Sum over the `lookback` periods before `period_start`.
    pub prior_count: u64,
    pub delta_count: i64,
    pub delta_ratio: Option<f64>,
    pub change_status: ChangeStatus,
}

/// Classify every series in every period of the buckets' date range.
///
/// The range runs from the earliest to the latest bucket of each frequency,
/// so a series absent from a period is counted as 0 there. Rows are emitted
/// only where the current or prior window has volume.
pub fn attribute_changes(
    buckets: &[NarrativeTimeBucket],
    thresholds: &ChangeThresholds,
) -> Vec<ChangeRow> {
    let mut series: BTreeMap<SeriesKey, BTreeMap<NaiveDate, u64>> = BTreeMap::new();
    let mut periods: BTreeMap<Frequency, BTreeSet<NaiveDate>> = BTreeMap::new();
    for bucket in buckets {
        let key = SeriesKey {
            freq: bucket.freq,
            narrative_type: bucket.narrative_type.clone(),
            narrative_subtype: bucket.narrative_subtype.clone(),
            product_a: bucket.product_a.clone(),
            product_b: bucket.product_b.clone(),
        };
        let start = bucket.freq.bucket_start(bucket.period_start);
        *series.entry(key).or_default().entry(start).or_insert(0) += bucket.count;
        periods.entry(bucket.freq).or_default().insert(start);
    }

    let ranges: BTreeMap<Frequency, Vec<NaiveDate>> = periods
        .into_iter()
        .map(|(freq, seen)| (freq, period_range(freq, &seen)))
        .collect();

    let mut rows = Vec::new();
    for (key, counts) in &series {
        let Some(range) = ranges.get(&key.freq) else {
            continue;
        };
        for (idx, period_start) in range.iter().enumerate() {
            let current = counts.get(period_start).copied().unwrap_or(0);
            let prior: u64 = range[idx.saturating_sub(thresholds.lookback)..idx]
                .iter()
                .map(|p| counts.get(p).copied().unwrap_or(0))
                .sum();
            if current == 0 && prior == 0 {
                continue;
            }
            rows.push(ChangeRow {
                period_start: *period_start,
                freq: key.freq,
                narrative_type: key.narrative_type.clone(),
                narrative_subtype: key.narrative_subtype.clone(),
                product_a: key.product_a.clone(),
                product_b: key.product_b.clone(),
                current_count: current,
                prior_count: prior,
                delta_count: current as i64 - prior as i64,
                delta_ratio: relative_change(current, prior),
                change_status: classify_change(current, prior, thresholds),
            });
        }
    }
    rows
}

/// Every bucket start from the first to the last seen period, inclusive.
fn period_range(freq: Frequency, seen: &BTreeSet<NaiveDate>) -> Vec<NaiveDate> {
    let (Some(first), Some(last)) = (seen.first(), seen.last()) else {
        return Vec::new();
    };
    let mut range = vec![*first];
    let mut cursor = *first;
    while cursor < *last {
        match freq.next(cursor) {
            Some(next) => {
                range.push(next);
                cursor = next;
            }
            None => break,
        }
    }
    range
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NarrativeConfig, SentenceLabeler, SentenceRecord};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bucket(period_start: NaiveDate, subtype: &str, count: u64) -> NarrativeTimeBucket {
        NarrativeTimeBucket {
            period_start,
            freq: Frequency::Weekly,
            narrative_type: "safety".to_string(),
            narrative_subtype: subtype.to_string(),
            product_a: "alpha".to_string(),
            product_b: "zeta".to_string(),
            count,
        }
    }

    #[test]
    fn weekly_buckets_start_on_monday() {
        // 2024-03-14 is a Thursday
        assert_eq!(Frequency::Weekly.bucket_start(date(2024, 3, 14)), date(2024, 3, 11));
        assert_eq!(Frequency::Weekly.bucket_start(date(2024, 3, 11)), date(2024, 3, 11));
        assert_eq!(Frequency::Monthly.bucket_start(date(2024, 3, 14)), date(2024, 3, 1));
        assert_eq!(Frequency::Monthly.previous(date(2024, 3, 1)), Some(date(2024, 2, 1)));
    }

    #[test]
    fn prior_window_sums_lookback_periods_with_gaps_as_zero() {
        let thresholds = ChangeThresholds::new(2, 3, 0.4).unwrap();
        let buckets = vec![
            bucket(date(2024, 1, 1), "risk_signal", 4),
            // week of 2024-01-08 has no volume
            bucket(date(2024, 1, 15), "risk_signal", 10),
        ];
        let rows = attribute_changes(&buckets, &thresholds);
        let summary: Vec<_> = rows
            .iter()
            .map(|r| (r.period_start, r.current_count, r.prior_count, r.change_status))
            .collect();
        assert_eq!(
            summary,
            vec![
                (date(2024, 1, 1), 4, 0, ChangeStatus::New),
                (date(2024, 1, 8), 0, 4, ChangeStatus::Disappearing),
                (date(2024, 1, 15), 10, 4, ChangeStatus::Increase),
            ]
        );
        assert_eq!(rows[2].delta_count, 6);
        assert_eq!(rows[2].delta_ratio, Some(1.5));
        assert_eq!(rows[0].delta_ratio, None);
    }

    #[test]
    fn series_are_independent() {
        let thresholds = ChangeThresholds::default();
        let buckets = vec![
            bucket(date(2024, 1, 1), "risk_signal", 5),
            bucket(date(2024, 1, 1), "safety_reassurance", 1),
        ];
        let rows = attribute_changes(&buckets, &thresholds);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].narrative_subtype, "risk_signal");
        assert_eq!(rows[0].change_status, ChangeStatus::New);
        assert_eq!(rows[1].change_status, ChangeStatus::Steady);
    }

    #[test]
    fn sentiment_shares_are_per_pair_and_period() {
        let config = NarrativeConfig::bundled().unwrap();
        let record = SentenceRecord::new("d", "d:sec:results:sent:0", "Alpha versus Zeta.")
            .mentioning("alpha", "Alpha")
            .mentioning("zeta", "Zeta");
        let template = SentenceLabeler::new(&config)
            .label(&record, None)
            .unwrap()
            .events
            .remove(0);
        let with = |sentiment: Option<Sentiment>| {
            let mut event = template.clone();
            event.sentiment_label = sentiment;
            event
        };
        let events = vec![
            (date(2024, 1, 1), with(Some(Sentiment::Positive))),
            (date(2024, 1, 3), with(Some(Sentiment::Positive))),
            (date(2024, 1, 4), with(Some(Sentiment::Negative))),
            (date(2024, 1, 5), with(None)),
            (date(2024, 1, 9), with(Some(Sentiment::Negative))),
        ];
        let buckets = sentiment_buckets(events.iter().map(|(d, e)| (*d, e)), Frequency::Weekly);
        let rendered: Vec<String> = buckets
            .iter()
            .map(|b| format!("{} {} {} {:.2}", b.period_start, b.sentiment, b.count, b.ratio))
            .collect();
        insta::assert_snapshot!(rendered.join("\n"), @r###"
        2024-01-01 positive 2 0.67
        2024-01-01 negative 1 0.33
        2024-01-08 negative 1 1.00
        "###);
    }
}
