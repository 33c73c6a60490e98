use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::metric::Metric;
use crate::population::{Attribute, Entity, Population};
use crate::position::PositionGroup;

/// Inclusive age bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: u32,
    pub max: u32,
}

impl AgeRange {
    pub fn new(min: u32, max: u32) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn contains(&self, age: u32) -> bool {
        (self.min..=self.max).contains(&age)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bound {
    AtLeast(f64),
    AtMost(f64),
    Between(f64, f64),
}

impl Bound {
    fn accepts(&self, v: f64) -> bool {
        match *self {
            Bound::AtLeast(min) => v >= min,
            Bound::AtMost(max) => v <= max,
            Bound::Between(lo, hi) => v >= lo.min(hi) && v <= lo.max(hi),
        }
    }
}

/// Raw-value threshold on one metric, used when shortlisting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricThreshold {
    pub metric: Metric,
    pub bound: Bound,
}

/// Independent predicates, combined with AND. Empty sets and `None` impose no
/// constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleFilter {
    pub position_groups: BTreeSet<PositionGroup>,
    pub competitions: BTreeSet<String>,
    pub age_range: Option<AgeRange>,
    pub min_minutes: Option<u32>,
    pub max_minutes: Option<u32>,
    pub metric_thresholds: Vec<MetricThreshold>,
}

impl SampleFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position_groups(mut self, groups: impl IntoIterator<Item = PositionGroup>) -> Self {
        self.position_groups.extend(groups);
        self
    }

    pub fn with_competitions<S: Into<String>>(mut self, comps: impl IntoIterator<Item = S>) -> Self {
        self.competitions.extend(comps.into_iter().map(Into::into));
        self
    }

    pub fn with_age_range(mut self, min: u32, max: u32) -> Self {
        self.age_range = Some(AgeRange::new(min, max));
        self
    }

    pub fn with_min_minutes(mut self, minutes: u32) -> Self {
        self.min_minutes = Some(minutes);
        self
    }

    pub fn with_max_minutes(mut self, minutes: u32) -> Self {
        self.max_minutes = Some(minutes);
        self
    }

    pub fn with_threshold(mut self, metric: Metric, bound: Bound) -> Self {
        self.metric_thresholds.push(MetricThreshold { metric, bound });
        self
    }

    pub fn is_unconstrained(&self) -> bool {
        self.position_groups.is_empty()
            && self.competitions.is_empty()
            && self.age_range.is_none()
            && self.min_minutes.is_none()
            && self.max_minutes.is_none()
            && self.metric_thresholds.is_empty()
    }

    /// Predicates that can be evaluated against this population's schema.
    fn active_predicates(&self, population: &Population) -> Vec<Predicate<'_>> {
        let mut candidates: Vec<(Attribute, &'static str, Predicate<'_>)> = Vec::new();
        if !self.position_groups.is_empty() {
            candidates.push((
                Attribute::PositionGroup,
                "position_groups",
                Predicate::PositionGroups(&self.position_groups),
            ));
        }
        if !self.competitions.is_empty() {
            candidates.push((
                Attribute::Competition,
                "competitions",
                Predicate::Competitions(&self.competitions),
            ));
        }
        if let Some(range) = self.age_range {
            candidates.push((Attribute::Age, "age_range", Predicate::Age(range)));
        }
        if let Some(min) = self.min_minutes {
            candidates.push((Attribute::MinutesPlayed, "min_minutes", Predicate::MinMinutes(min)));
        }
        if let Some(max) = self.max_minutes {
            candidates.push((Attribute::MinutesPlayed, "max_minutes", Predicate::MaxMinutes(max)));
        }

        let mut out = Vec::new();
        for (attr, label, pred) in candidates {
            if population.has_attribute(attr) {
                out.push(pred);
            } else {
                debug!(predicate = label, "column absent from export; predicate skipped");
            }
        }
        for threshold in &self.metric_thresholds {
            if population.has_metric(threshold.metric) {
                out.push(Predicate::Threshold(*threshold));
            } else {
                debug!(metric = %threshold.metric, "metric absent from export; threshold skipped");
            }
        }
        out
    }
}

enum Predicate<'a> {
    PositionGroups(&'a BTreeSet<PositionGroup>),
    Competitions(&'a BTreeSet<String>),
    Age(AgeRange),
    MinMinutes(u32),
    MaxMinutes(u32),
    Threshold(MetricThreshold),
}

impl Predicate<'_> {
    // A row with an empty cell never satisfies a predicate on that column.
    fn accepts(&self, e: &Entity) -> bool {
        match self {
            Predicate::PositionGroups(groups) => e.position_group.is_some_and(|g| groups.contains(&g)),
            Predicate::Competitions(comps) => {
                e.competition.as_ref().is_some_and(|c| comps.contains(c))
            }
            Predicate::Age(range) => e.age.is_some_and(|a| range.contains(a)),
            Predicate::MinMinutes(min) => e.minutes_played.is_some_and(|m| m >= *min),
            Predicate::MaxMinutes(max) => e.minutes_played.is_some_and(|m| m <= *max),
            Predicate::Threshold(t) => e.metric(t.metric).is_some_and(|v| t.bound.accepts(v)),
        }
    }
}

/// Borrowed view of the rows that passed a filter, in population order.
#[derive(Debug, Clone)]
pub struct Sample<'a> {
    population: &'a Population,
    rows: Vec<usize>,
}

impl<'a> Sample<'a> {
    /// Every row of the population.
    pub fn all(population: &'a Population) -> Self {
        Self {
            population,
            rows: (0..population.len()).collect(),
        }
    }

    pub fn population(&self) -> &'a Population {
        self.population
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, row: usize) -> bool {
        self.rows.binary_search(&row).is_ok()
    }

    pub fn entities(&self) -> impl Iterator<Item = &'a Entity> + '_ {
        let pop = self.population;
        self.rows.iter().filter_map(move |row| pop.get(*row))
    }

    /// Non-missing values of `metric` across the sample.
    pub fn values(&self, metric: Metric) -> Vec<f64> {
        self.entities().filter_map(|e| e.metric(metric)).collect()
    }
}

/// Narrow a population to the rows satisfying every applicable predicate.
pub fn filter_sample<'a>(population: &'a Population, filter: &SampleFilter) -> Sample<'a> {
    let predicates = filter.active_predicates(population);
    let rows = population
        .entities()
        .iter()
        .enumerate()
        .filter(|(_, e)| predicates.iter().all(|p| p.accepts(e)))
        .map(|(idx, _)| idx)
        .collect();
    Sample { population, rows }
}

/// Choices a front-end can offer for the filter, derived from the data.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOptions {
    pub position_groups: Vec<PositionGroup>,
    pub competitions: Vec<String>,
    pub age: Option<(u32, u32)>,
    pub minutes: Option<(u32, u32)>,
}

impl FilterOptions {
    pub fn from_population(population: &Population) -> Self {
        let mut groups = BTreeSet::new();
        let mut comps = BTreeSet::new();
        let mut age: Option<(u32, u32)> = None;
        let mut minutes: Option<(u32, u32)> = None;
        for e in population.entities() {
            if let Some(g) = e.position_group {
                groups.insert(g);
            }
            if let Some(c) = &e.competition {
                comps.insert(c.clone());
            }
            if let Some(a) = e.age {
                age = Some(age.map_or((a, a), |(lo, hi)| (lo.min(a), hi.max(a))));
            }
            if let Some(m) = e.minutes_played {
                minutes = Some(minutes.map_or((m, m), |(lo, hi)| (lo.min(m), hi.max(m))));
            }
        }
        Self {
            position_groups: groups.into_iter().collect(),
            competitions: comps.into_iter().collect(),
            age,
            minutes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(name: &str, group: PositionGroup, comp: &str, age: u32, minutes: u32) -> Entity {
        let mut e = Entity::new(name);
        e.team = Some(format!("{name} FC"));
        e.position_group = Some(group);
        e.competition = Some(comp.to_string());
        e.age = Some(age);
        e.minutes_played = Some(minutes);
        e.metrics.insert(Metric::Goals, minutes as f64 / 1000.0);
        e
    }

    fn population() -> Population {
        Population::from_entities(vec![
            entity("A", PositionGroup::CentreBack, "ENG Premier League", 22, 1800),
            entity("B", PositionGroup::CentreForward, "ENG Premier League", 29, 600),
            entity("C", PositionGroup::CentreBack, "ESP La Liga", 31, 2400),
            entity("D", PositionGroup::WideMidfielder, "ENG Premier League", 19, 950),
        ])
    }

    #[test]
    fn no_predicates_keeps_everything_in_order() {
        let pop = population();
        let sample = filter_sample(&pop, &SampleFilter::new());
        assert_eq!(sample.rows(), &[0, 1, 2, 3]);
    }

    #[test]
    fn predicates_combine_with_and() {
        let pop = population();
        let filter = SampleFilter::new()
            .with_position_groups([PositionGroup::CentreBack, PositionGroup::WideMidfielder])
            .with_competitions(["ENG Premier League"])
            .with_min_minutes(900);
        let sample = filter_sample(&pop, &filter);
        assert_eq!(sample.rows(), &[0, 3]);

        let narrower = filter.clone().with_age_range(20, 30);
        assert_eq!(filter_sample(&pop, &narrower).rows(), &[0]);
    }

    #[test]
    fn age_and_minutes_bounds_are_inclusive() {
        let pop = population();
        let filter = SampleFilter::new().with_age_range(29, 31).with_min_minutes(600);
        assert_eq!(filter_sample(&pop, &filter).rows(), &[1, 2]);
        let filter = SampleFilter::new().with_max_minutes(950);
        assert_eq!(filter_sample(&pop, &filter).rows(), &[1, 3]);
    }

    #[test]
    fn absent_columns_skip_their_predicate() {
        let mut e = Entity::new("Solo");
        e.metrics.insert(Metric::Goals, 0.5);
        let pop = Population::from_entities(vec![e]);
        let filter = SampleFilter::new()
            .with_position_groups([PositionGroup::Goalkeeper])
            .with_competitions(["Nowhere"])
            .with_age_range(40, 50)
            .with_min_minutes(5000)
            .with_threshold(Metric::Xa, Bound::AtLeast(1.0));
        assert_eq!(filter_sample(&pop, &filter).len(), 1);
    }

    #[test]
    fn rows_missing_a_filtered_value_are_dropped() {
        let mut pop_rows = vec![entity("A", PositionGroup::CentreBack, "L", 20, 100)];
        let mut bare = Entity::new("B");
        bare.position_group = Some(PositionGroup::CentreBack);
        pop_rows.push(bare);
        let pop = Population::from_entities(pop_rows);
        let filter = SampleFilter::new().with_min_minutes(0);
        assert_eq!(filter_sample(&pop, &filter).rows(), &[0]);
    }

    #[test]
    fn metric_thresholds_shortlist_rows() {
        let pop = population();
        let filter = SampleFilter::new().with_threshold(Metric::Goals, Bound::Between(0.9, 2.0));
        assert_eq!(filter_sample(&pop, &filter).rows(), &[0, 3]);
        let filter = SampleFilter::new().with_threshold(Metric::Goals, Bound::AtMost(0.6));
        assert_eq!(filter_sample(&pop, &filter).rows(), &[1]);
    }

    #[test]
    fn filtering_does_not_mutate_the_population() {
        let pop = population();
        let before = pop.entities().to_vec();
        let _ = filter_sample(&pop, &SampleFilter::new().with_min_minutes(1000));
        let _ = filter_sample(&pop, &SampleFilter::new().with_competitions(["ESP La Liga"]));
        assert_eq!(pop.entities(), before.as_slice());
    }

    #[test]
    fn options_reflect_the_data() {
        let opts = FilterOptions::from_population(&population());
        assert_eq!(
            opts.position_groups,
            vec![
                PositionGroup::CentreBack,
                PositionGroup::WideMidfielder,
                PositionGroup::CentreForward
            ]
        );
        assert_eq!(opts.competitions, vec!["ENG Premier League", "ESP La Liga"]);
        assert_eq!(opts.age, Some((19, 31)));
        assert_eq!(opts.minutes, Some((600, 2400)));
    }
}
