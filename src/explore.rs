use std::collections::HashMap;

use serde::Serialize;

use crate::metric::Metric;
use crate::position::PositionGroup;
use crate::sample_filter::Sample;

/// Quantiles reported for every metric distribution.
pub const QUANTILES: [u8; 6] = [10, 25, 50, 75, 90, 95];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeSummary {
    pub min: u32,
    pub max: u32,
    pub mean: f64,
    pub median: f64,
}

/// Who is in a comparison sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleComposition {
    pub size: usize,
    /// Most common first; ties broken by group order.
    pub position_groups: Vec<(PositionGroup, usize)>,
    /// Most common first; ties broken alphabetically.
    pub competitions: Vec<(String, usize)>,
    pub age: Option<AgeSummary>,
}

impl SampleComposition {
    pub fn of(sample: &Sample<'_>) -> Self {
        let mut groups: HashMap<PositionGroup, usize> = HashMap::new();
        let mut comps: HashMap<&str, usize> = HashMap::new();
        let mut ages: Vec<f64> = Vec::new();
        for e in sample.entities() {
            if let Some(g) = e.position_group {
                *groups.entry(g).or_default() += 1;
            }
            if let Some(c) = e.competition.as_deref() {
                *comps.entry(c).or_default() += 1;
            }
            if let Some(a) = e.age {
                ages.push(f64::from(a));
            }
        }

        let mut position_groups: Vec<(PositionGroup, usize)> = groups.into_iter().collect();
        position_groups.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        let mut competitions: Vec<(String, usize)> =
            comps.into_iter().map(|(c, n)| (c.to_string(), n)).collect();
        competitions.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        ages.sort_by(f64::total_cmp);
        let age = match (ages.first(), ages.last()) {
            (Some(lo), Some(hi)) => Some(AgeSummary {
                min: *lo as u32,
                max: *hi as u32,
                mean: mean(&ages),
                median: quantile_sorted(&ages, 0.5),
            }),
            _ => None,
        };

        Self {
            size: sample.len(),
            position_groups,
            competitions,
            age,
        }
    }
}

/// Spread of one metric's raw values across a sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDistribution {
    pub metric: Metric,
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; zero for a single value.
    pub std_dev: f64,
    /// `(p, value)` for each entry of [`QUANTILES`].
    pub quantiles: Vec<(u8, f64)>,
}

impl MetricDistribution {
    /// `None` when no row of the sample has a value for `metric`.
    pub fn of(sample: &Sample<'_>, metric: Metric) -> Option<Self> {
        let mut values = sample.values(metric);
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);
        let quantiles = QUANTILES
            .iter()
            .map(|p| (*p, quantile_sorted(&values, f64::from(*p) / 100.0)))
            .collect();
        Some(Self {
            metric,
            count: values.len(),
            min: values[0],
            max: values[values.len() - 1],
            mean: mean(&values),
            median: quantile_sorted(&values, 0.5),
            std_dev: std_dev(&values),
            quantiles,
        })
    }

    pub fn quantile(&self, p: u8) -> Option<f64> {
        self.quantiles.iter().find(|(q, _)| *q == p).map(|(_, v)| *v)
    }

    /// Raw-value cut-offs for the top 25%, 10% and 5% of the sample.
    pub fn suggested_thresholds(&self) -> Vec<SuggestedThreshold> {
        [(25, 75), (10, 90), (5, 95)]
            .into_iter()
            .filter_map(|(top, p)| {
                Some(SuggestedThreshold {
                    label: format!("Top {top}%"),
                    at_least: self.quantile(p)?,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestedThreshold {
    pub label: String,
    pub at_least: f64,
}

/// Linear-interpolation quantile of already sorted values.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let h = (n - 1) as f64 * q.clamp(0.0, 1.0);
            let lo = h.floor() as usize;
            let hi = h.ceil() as usize;
            sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::{Entity, Population};

    fn entity(group: PositionGroup, comp: &str, age: u32, xg: Option<f64>) -> Entity {
        let mut e = Entity::new(format!("{group}-{age}"));
        e.position_group = Some(group);
        e.competition = Some(comp.to_string());
        e.age = Some(age);
        if let Some(v) = xg {
            e.metrics.insert(Metric::Xg, v);
        }
        e
    }

    fn population() -> Population {
        Population::from_entities(vec![
            entity(PositionGroup::CentreForward, "Serie A", 24, Some(0.1)),
            entity(PositionGroup::CentreBack, "Ligue 1", 30, Some(0.2)),
            entity(PositionGroup::CentreForward, "Ligue 1", 21, Some(0.3)),
            entity(PositionGroup::CentreForward, "Ligue 1", 27, Some(0.4)),
            entity(PositionGroup::WideForward, "Serie A", 19, Some(0.5)),
            entity(PositionGroup::WideForward, "Eredivisie", 33, None),
        ])
    }

    #[test]
    fn composition_counts_most_common_first() {
        let pop = population();
        let comp = SampleComposition::of(&Sample::all(&pop));
        assert_eq!(comp.size, 6);
        assert_eq!(comp.position_groups[0], (PositionGroup::CentreForward, 3));
        assert_eq!(comp.position_groups[1], (PositionGroup::WideForward, 2));
        assert_eq!(comp.competitions[0], ("Ligue 1".to_string(), 3));
        assert_eq!(comp.competitions[1], ("Serie A".to_string(), 2));
        let age = comp.age.unwrap();
        assert_eq!((age.min, age.max), (19, 33));
        assert_eq!(age.median, 25.5);
        assert!((age.mean - 25.666).abs() < 1e-2);
    }

    #[test]
    fn quantiles_interpolate_linearly() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&v, 0.0), 1.0);
        assert_eq!(quantile_sorted(&v, 0.5), 2.5);
        assert_eq!(quantile_sorted(&v, 1.0), 4.0);
        assert!((quantile_sorted(&v, 0.9) - 3.7).abs() < 1e-9);
    }

    #[test]
    fn distribution_skips_missing_values() {
        let pop = population();
        let dist = MetricDistribution::of(&Sample::all(&pop), Metric::Xg).unwrap();
        assert_eq!(dist.count, 5);
        assert_eq!(dist.min, 0.1);
        assert_eq!(dist.max, 0.5);
        assert!((dist.median - 0.3).abs() < 1e-9);
        assert!((dist.quantile(90).unwrap() - 0.46).abs() < 1e-9);

        let tops = dist.suggested_thresholds();
        assert_eq!(tops.len(), 3);
        assert_eq!(tops[0].label, "Top 25%");
        assert!((tops[0].at_least - 0.4).abs() < 1e-9);

        assert!(MetricDistribution::of(&Sample::all(&pop), Metric::Goals).is_none());
    }
}
