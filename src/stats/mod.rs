//! Statistics aggregator - chart-ready series over filtered records
//!
//! A metric selector with six fixed states; each selection is a pure
//! function from a record slice to one of four chart-data shapes. Time
//! series group by date (string-sorted), distributions by type name, and
//! top tags by descending count truncated to ten entries.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::store::types::Record;

/// How many entries the top-tags chart may hold
pub const TOP_TAGS_LIMIT: usize = 10;

/// The six selectable statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsMetric {
    CountOverTime,
    AverageMeasurement,
    TypeDistributionBar,
    TypeDistributionPie,
    TopTagsBar,
    MeasurementScatter,
}

impl StatsMetric {
    /// All selector states for iteration
    pub fn all() -> &'static [StatsMetric] {
        &[
            StatsMetric::CountOverTime,
            StatsMetric::AverageMeasurement,
            StatsMetric::TypeDistributionBar,
            StatsMetric::TypeDistributionPie,
            StatsMetric::TopTagsBar,
            StatsMetric::MeasurementScatter,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatsMetric::CountOverTime => "count_over_time",
            StatsMetric::AverageMeasurement => "average_measurement",
            StatsMetric::TypeDistributionBar => "type_distribution_bar",
            StatsMetric::TypeDistributionPie => "type_distribution_pie",
            StatsMetric::TopTagsBar => "top_tags_bar",
            StatsMetric::MeasurementScatter => "measurement_scatter",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        StatsMetric::all().iter().copied().find(|m| m.as_str() == s)
    }

    /// Compute this metric over an already-filtered record slice
    pub fn compute(&self, records: &[Record]) -> ChartData {
        match self {
            StatsMetric::CountOverTime => ChartData::PointSeries(count_over_time(records)),
            StatsMetric::AverageMeasurement => {
                ChartData::PointSeries(average_measurement(records))
            }
            StatsMetric::TypeDistributionBar => ChartData::BarSeries(type_distribution(records)),
            StatsMetric::TypeDistributionPie => ChartData::PieSlices(type_distribution(records)),
            StatsMetric::TopTagsBar => ChartData::BarSeries(top_tags(records)),
            StatsMetric::MeasurementScatter => {
                ChartData::ScatterPoints(measurement_scatter(records))
            }
        }
    }
}

impl std::fmt::Display for StatsMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One dated value in a time series or scatter plot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    /// ISO date string ("%Y-%m-%d"), which sorts chronologically
    pub date: String,
    pub value: f64,
}

/// One labelled value in a bar chart or pie
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartEntry {
    pub label: String,
    pub value: f64,
}

/// The four chart-data shapes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", content = "data", rename_all = "snake_case")]
pub enum ChartData {
    PointSeries(Vec<SeriesPoint>),
    BarSeries(Vec<ChartEntry>),
    PieSlices(Vec<ChartEntry>),
    ScatterPoints(Vec<SeriesPoint>),
}

/// Record count per date, sorted by date
fn count_over_time(records: &[Record]) -> Vec<SeriesPoint> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for record in records {
        *counts.entry(record.date.to_string()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(date, count)| SeriesPoint {
            date,
            value: count as f64,
        })
        .collect()
}

/// Mean of all measurement values per date; dates without measurements
/// do not appear
fn average_measurement(records: &[Record]) -> Vec<SeriesPoint> {
    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for record in records {
        for m in &record.measurements {
            let entry = sums.entry(record.date.to_string()).or_insert((0.0, 0));
            entry.0 += m.value;
            entry.1 += 1;
        }
    }
    sums.into_iter()
        .map(|(date, (sum, n))| SeriesPoint {
            date,
            value: sum / n as f64,
        })
        .collect()
}

/// Record count per type name, type names sorted, zero counts omitted
fn type_distribution(records: &[Record]) -> Vec<ChartEntry> {
    let mut counts: BTreeMap<&'static str, u64> = BTreeMap::new();
    for record in records {
        *counts.entry(record.record_type.as_str()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(label, count)| ChartEntry {
            label: label.to_string(),
            value: count as f64,
        })
        .collect()
}

/// Tag usage counts, descending, ties broken by name, truncated to
/// [`TOP_TAGS_LIMIT`]
fn top_tags(records: &[Record]) -> Vec<ChartEntry> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for record in records {
        for tag in &record.tags {
            *counts.entry(tag.as_str()).or_insert(0) += 1;
        }
    }

    let mut entries: Vec<ChartEntry> = counts
        .into_iter()
        .map(|(label, count)| ChartEntry {
            label: label.to_string(),
            value: count as f64,
        })
        .collect();
    // BTreeMap yields name order, so a stable sort keeps ties alphabetical
    entries.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(std::cmp::Ordering::Equal));
    entries.truncate(TOP_TAGS_LIMIT);
    entries
}

/// Every measurement as an individual (date, value) point, record order
fn measurement_scatter(records: &[Record]) -> Vec<SeriesPoint> {
    records
        .iter()
        .flat_map(|record| {
            record.measurements.iter().map(|m| SeriesPoint {
                date: record.date.to_string(),
                value: m.value,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::RecordType;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_records() -> Vec<Record> {
        vec![
            Record::new(RecordType::Consultation, date(2024, 1, 10)).tag("routine"),
            Record::new(RecordType::Consultation, date(2024, 1, 10)).tag("gp"),
            Record::new(RecordType::VitalSign, date(2024, 2, 1))
                .tag("routine")
                .measurement(120.0, "mmHg")
                .measurement(80.0, "mmHg"),
            Record::new(RecordType::Measurement, date(2024, 2, 1))
                .tag("weight")
                .measurement(72.0, "kg"),
        ]
    }

    #[test]
    fn test_metric_string_round_trip() {
        for m in StatsMetric::all() {
            assert_eq!(StatsMetric::parse(m.as_str()), Some(*m));
        }
        assert_eq!(StatsMetric::parse("histogram"), None);
    }

    #[test]
    fn test_count_over_time_sorted_by_date() {
        let records = sample_records();
        let ChartData::PointSeries(series) = StatsMetric::CountOverTime.compute(&records) else {
            panic!("wrong shape");
        };
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date, "2024-01-10");
        assert_eq!(series[0].value, 2.0);
        assert_eq!(series[1].date, "2024-02-01");
        assert_eq!(series[1].value, 2.0);
    }

    #[test]
    fn test_average_measurement_per_date() {
        let records = sample_records();
        let ChartData::PointSeries(series) = StatsMetric::AverageMeasurement.compute(&records)
        else {
            panic!("wrong shape");
        };
        // 2024-01-10 has no measurements and must not appear
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].date, "2024-02-01");
        let expected = (120.0 + 80.0 + 72.0) / 3.0;
        assert!((series[0].value - expected).abs() < 1e-9);
    }

    #[test]
    fn test_type_distribution_counts() {
        let records = sample_records();
        let ChartData::BarSeries(bars) = StatsMetric::TypeDistributionBar.compute(&records) else {
            panic!("wrong shape");
        };
        assert_eq!(bars.len(), 3);
        let consult = bars.iter().find(|b| b.label == "consultation").unwrap();
        assert_eq!(consult.value, 2.0);

        // Pie carries the same groups in the pie shape
        let ChartData::PieSlices(slices) = StatsMetric::TypeDistributionPie.compute(&records)
        else {
            panic!("wrong shape");
        };
        assert_eq!(slices, bars);
    }

    #[test]
    fn test_top_tags_descending_and_capped() {
        let mut records = Vec::new();
        // 15 singleton tags plus one dominant tag
        for i in 0..15u32 {
            records.push(
                Record::new(RecordType::Consultation, date(2024, 1, 1 + i))
                    .tag(format!("tag{i:02}"))
                    .tag("chronic"),
            );
        }

        let ChartData::BarSeries(bars) = StatsMetric::TopTagsBar.compute(&records) else {
            panic!("wrong shape");
        };
        assert_eq!(bars.len(), TOP_TAGS_LIMIT);
        assert_eq!(bars[0].label, "chronic");
        assert_eq!(bars[0].value, 15.0);
        for window in bars.windows(2) {
            assert!(window[0].value >= window[1].value);
        }
        // Ties sorted by name
        assert_eq!(bars[1].label, "tag00");
    }

    #[test]
    fn test_measurement_scatter_one_point_per_measurement() {
        let records = sample_records();
        let ChartData::ScatterPoints(points) = StatsMetric::MeasurementScatter.compute(&records)
        else {
            panic!("wrong shape");
        };
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].value, 120.0);
        assert_eq!(points[2].value, 72.0);
    }

    #[test]
    fn test_empty_input_yields_empty_charts() {
        for metric in StatsMetric::all() {
            let data = metric.compute(&[]);
            let len = match data {
                ChartData::PointSeries(v) | ChartData::ScatterPoints(v) => v.len(),
                ChartData::BarSeries(v) | ChartData::PieSlices(v) => v.len(),
            };
            assert_eq!(len, 0, "{metric} not empty");
        }
    }
}
