use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use meter_client::domain::{DailyRecord, HourlyFeatureRecord, LoadSimilarity, HOURS_PER_DAY};

use super::series::cosine_similarity;

type DayKey = (String, NaiveDate);

/// Day-over-day load-shape similarity per device.
///
/// Each (device, date) becomes a 24-slot vector of hourly consumption; hours
/// without data are 0 and an hour seen twice (fall-back day) holds the mean.
/// A day is compared with the device's previous day that has data.
#[derive(Debug, Clone, Default)]
pub struct LoadShapeSimilarity;

impl LoadShapeSimilarity {
    pub fn new() -> Self {
        Self
    }

    pub fn day_vectors(hourly: &[HourlyFeatureRecord]) -> BTreeMap<DayKey, [f64; HOURS_PER_DAY]> {
        let mut acc: BTreeMap<DayKey, ([f64; HOURS_PER_DAY], [u32; HOURS_PER_DAY])> =
            BTreeMap::new();
        for r in hourly {
            let slot = r.hour as usize;
            if slot >= HOURS_PER_DAY {
                continue;
            }
            let (sums, counts) = acc
                .entry((r.ext_dev_ref.clone(), r.date_local))
                .or_insert(([0.0; HOURS_PER_DAY], [0; HOURS_PER_DAY]));
            sums[slot] += r.consumption_kwh;
            counts[slot] += 1;
        }

        acc.into_iter()
            .map(|(key, (sums, counts))| {
                let mut v = [0.0; HOURS_PER_DAY];
                for h in 0..HOURS_PER_DAY {
                    if counts[h] > 0 {
                        v[h] = sums[h] / f64::from(counts[h]);
                    }
                }
                (key, v)
            })
            .collect()
    }

    /// Similarity of each (device, date) with the device's preceding day.
    pub fn similarities(hourly: &[HourlyFeatureRecord]) -> HashMap<DayKey, Option<f64>> {
        let vectors = Self::day_vectors(hourly);
        let mut out = HashMap::with_capacity(vectors.len());
        let mut previous: Option<(&str, &[f64; HOURS_PER_DAY])> = None;
        for (key, vector) in &vectors {
            let value = match previous {
                Some((dev, prev)) if dev == key.0 => Some(cosine_similarity(prev, vector)),
                _ => None,
            };
            out.insert(key.clone(), value);
            previous = Some((key.0.as_str(), vector));
        }
        out
    }

    /// Copy of `daily` with `daily_load_similarity` set on every row.
    pub fn apply(&self, hourly: &[HourlyFeatureRecord], daily: &[DailyRecord]) -> Vec<DailyRecord> {
        let sims = Self::similarities(hourly);
        daily
            .iter()
            .map(|d| {
                let key = (d.aggregate.ext_dev_ref.clone(), d.aggregate.date_local);
                let mut row = d.clone();
                row.daily_load_similarity = Some(LoadSimilarity {
                    value: sims.get(&key).copied().flatten(),
                });
                row
            })
            .collect()
    }
}
