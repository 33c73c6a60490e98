use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::metric::{LowerIsBetter, Metric};
use crate::population::{PlayerQuery, ResolveError};
use crate::position::PositionGroup;
use crate::sample_filter::Sample;

/// Assigned when there is nothing to rank against.
pub const NEUTRAL_PERCENTILE: f64 = 50.0;

/// How values equal to the target are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieMethod {
    /// Share of values `<=` the target.
    #[default]
    Weak,
    /// Share of values `<` the target.
    Strict,
    /// Average of weak and strict.
    Mean,
    /// Average rank of the tied block.
    Rank,
}

/// Sorted, finite reference values for one metric.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceSet {
    sorted: Vec<f64>,
}

impl ReferenceSet {
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        let mut sorted: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        sorted.sort_by(f64::total_cmp);
        Self { sorted }
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.sorted
    }

    /// Empirical percentile of `value` in [0, 100]; `None` for an empty set.
    pub fn percentile(&self, value: f64, tie: TieMethod) -> Option<f64> {
        if self.sorted.is_empty() || !value.is_finite() {
            return None;
        }
        let n = self.sorted.len() as f64;
        let below = self.sorted.partition_point(|x| *x < value) as f64;
        let at_or_below = self.sorted.partition_point(|x| *x <= value) as f64;
        let pct = match tie {
            TieMethod::Weak => at_or_below * 100.0 / n,
            TieMethod::Strict => below * 100.0 / n,
            TieMethod::Mean => (below + at_or_below) * 50.0 / n,
            TieMethod::Rank => {
                let bump = if at_or_below > below { 1.0 } else { 0.0 };
                (below + at_or_below + bump) * 50.0 / n
            }
        };
        Some(pct.clamp(0.0, 100.0))
    }
}

/// Percentile of `value` within `reference`, ignoring non-finite entries.
pub fn percentile_of_score(reference: &[f64], value: f64, tie: TieMethod) -> Option<f64> {
    ReferenceSet::new(reference.iter().copied()).percentile(value, tie)
}

pub fn round_one_decimal(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Why a score has the value it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreOutcome {
    Ranked,
    /// The target has no value for the metric.
    MissingValue,
    /// The export has no column for the metric.
    NotInSchema,
    /// No row of the comparison sample has a value for the metric.
    EmptyReference,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentileScore {
    pub metric: Metric,
    /// Target's raw value.
    pub value: Option<f64>,
    /// Final percentile (after inversion and clamping), unrounded.
    pub raw: f64,
    /// `raw` rounded to one decimal for display.
    pub percentile: f64,
    pub inverted: bool,
    pub reference_size: usize,
    pub outcome: ScoreOutcome,
}

impl PercentileScore {
    fn neutral(metric: Metric, value: Option<f64>, outcome: ScoreOutcome) -> Self {
        Self {
            metric,
            value,
            raw: NEUTRAL_PERCENTILE,
            percentile: NEUTRAL_PERCENTILE,
            inverted: false,
            reference_size: 0,
            outcome,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankOptions {
    pub tie_method: TieMethod,
    pub lower_is_better: LowerIsBetter,
}

/// Percentiles for one player, in the order the metrics were requested.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankReport {
    pub row: usize,
    pub player: String,
    pub team: Option<String>,
    pub competition: Option<String>,
    pub position_group: Option<PositionGroup>,
    pub sample_size: usize,
    pub target_in_sample: bool,
    pub scores: Vec<PercentileScore>,
}

impl RankReport {
    pub fn percentiles(&self) -> Vec<f64> {
        self.scores.iter().map(|s| s.percentile).collect()
    }

    pub fn pairs(&self) -> Vec<(Metric, f64)> {
        self.scores.iter().map(|s| (s.metric, s.percentile)).collect()
    }
}

/// Rank the target against the sample for each metric.
///
/// The target is resolved against the full population, so a player filtered out
/// of the sample can still be ranked. The target's own value always takes part
/// in its reference set: when its row is not in the sample it is added.
pub fn rank_player(
    sample: &Sample<'_>,
    target: &PlayerQuery,
    metrics: &[Metric],
    options: &RankOptions,
) -> Result<RankReport, ResolveError> {
    let population = sample.population();
    let row = population.resolve(target)?;
    let entity = &population.entities()[row];
    let target_in_sample = sample.contains(row);

    let scores = metrics
        .iter()
        .map(|metric| score_metric(sample, row, target_in_sample, *metric, options))
        .collect();

    Ok(RankReport {
        row,
        player: entity.name.clone(),
        team: entity.team.clone(),
        competition: entity.competition.clone(),
        position_group: entity.position_group,
        sample_size: sample.len(),
        target_in_sample,
        scores,
    })
}

/// Rank a row already known by index (the terminal's selection).
pub fn rank_entity(
    sample: &Sample<'_>,
    row: usize,
    metrics: &[Metric],
    options: &RankOptions,
) -> Result<RankReport, ResolveError> {
    rank_player(sample, &PlayerQuery::Row(row), metrics, options)
}

fn score_metric(
    sample: &Sample<'_>,
    row: usize,
    target_in_sample: bool,
    metric: Metric,
    options: &RankOptions,
) -> PercentileScore {
    let population = sample.population();
    if !population.has_metric(metric) {
        return PercentileScore::neutral(metric, None, ScoreOutcome::NotInSchema);
    }
    let Some(value) = population.entities()[row].metric(metric) else {
        return PercentileScore::neutral(metric, None, ScoreOutcome::MissingValue);
    };

    let mut values = sample.values(metric);
    if values.is_empty() {
        return PercentileScore::neutral(metric, Some(value), ScoreOutcome::EmptyReference);
    }
    if !target_in_sample {
        values.push(value);
    }
    let reference = ReferenceSet::new(values);
    let Some(pct) = reference.percentile(value, options.tie_method) else {
        return PercentileScore::neutral(metric, Some(value), ScoreOutcome::EmptyReference);
    };

    let inverted = options.lower_is_better.contains(metric);
    let raw = if inverted { 100.0 - pct } else { pct }.clamp(0.0, 100.0);
    PercentileScore {
        metric,
        value: Some(value),
        raw,
        percentile: round_one_decimal(raw),
        inverted,
        reference_size: reference.len(),
        outcome: ScoreOutcome::Ranked,
    }
}

/// Every sample row's percentile for each metric, ranked against the sample.
#[derive(Debug, Clone, PartialEq)]
pub struct PercentileTable {
    pub rows: Vec<usize>,
    pub metrics: Vec<Metric>,
    /// Column-major: `columns[m][r]` is metric `m` for `rows[r]`.
    pub columns: Vec<Vec<Option<f64>>>,
}

impl PercentileTable {
    pub fn get(&self, row_idx: usize, metric_idx: usize) -> Option<f64> {
        self.columns.get(metric_idx)?.get(row_idx).copied().flatten()
    }
}

pub fn percentile_table(sample: &Sample<'_>, metrics: &[Metric], options: &RankOptions) -> PercentileTable {
    let columns = metrics
        .par_iter()
        .map(|metric| {
            let reference = ReferenceSet::new(sample.values(*metric));
            let inverted = options.lower_is_better.contains(*metric);
            sample
                .entities()
                .map(|e| {
                    let pct = reference.percentile(e.metric(*metric)?, options.tie_method)?;
                    let pct = if inverted { 100.0 - pct } else { pct };
                    Some(round_one_decimal(pct.clamp(0.0, 100.0)))
                })
                .collect()
        })
        .collect();
    PercentileTable {
        rows: sample.rows().to_vec(),
        metrics: metrics.to_vec(),
        columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::{Entity, Population};
    use crate::sample_filter::{SampleFilter, filter_sample};

    fn row(name: &str, team: &str, group: PositionGroup, metrics: &[(Metric, f64)]) -> Entity {
        let mut e = Entity::new(name);
        e.team = Some(team.to_string());
        e.position_group = Some(group);
        e.metrics.extend(metrics.iter().copied());
        e
    }

    fn goals_population() -> Population {
        let cb = PositionGroup::CentreBack;
        Population::from_entities(vec![
            row("A", "X", cb, &[(Metric::Goals, 10.0), (Metric::RedCards, 0.0), (Metric::Fouls, 1.0)]),
            row("B", "X", cb, &[(Metric::Goals, 20.0), (Metric::RedCards, 0.0), (Metric::Fouls, 2.0)]),
            row("C", "Y", cb, &[(Metric::Goals, 30.0), (Metric::RedCards, 1.0)]),
            row("D", "Y", cb, &[(Metric::Goals, 40.0), (Metric::RedCards, 2.0), (Metric::Fouls, 3.0)]),
            row("E", "Z", cb, &[(Metric::Goals, 50.0), (Metric::RedCards, 5.0), (Metric::Fouls, 4.0)]),
            row("F", "Z", PositionGroup::CentreForward, &[(Metric::Goals, 42.0)]),
        ])
    }

    #[test]
    fn weak_percentile_counts_ties_for_the_target() {
        let r = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(percentile_of_score(&r, 30.0, TieMethod::Weak), Some(60.0));
        assert_eq!(percentile_of_score(&r, 5.0, TieMethod::Weak), Some(0.0));
        assert_eq!(percentile_of_score(&r, 55.0, TieMethod::Weak), Some(100.0));
        assert_eq!(percentile_of_score(&[], 42.0, TieMethod::Weak), None);
    }

    #[test]
    fn tie_methods_match_their_definitions() {
        let r = [1.0, 2.0, 3.0, 3.0, 4.0];
        assert_eq!(percentile_of_score(&r, 3.0, TieMethod::Weak), Some(80.0));
        assert_eq!(percentile_of_score(&r, 3.0, TieMethod::Strict), Some(40.0));
        assert_eq!(percentile_of_score(&r, 3.0, TieMethod::Mean), Some(60.0));
        assert_eq!(percentile_of_score(&r, 3.0, TieMethod::Rank), Some(70.0));
        // A value absent from the set has no tied block to average over.
        assert_eq!(percentile_of_score(&r, 2.5, TieMethod::Rank), Some(40.0));
    }

    #[test]
    fn reference_drops_non_finite_values() {
        let set = ReferenceSet::new([f64::NAN, 1.0, f64::INFINITY, 2.0]);
        assert_eq!(set.values(), &[1.0, 2.0]);
        assert_eq!(set.percentile(f64::NAN, TieMethod::Weak), None);
    }

    #[test]
    fn rounding_keeps_one_decimal() {
        assert_eq!(round_one_decimal(66.666_666), 66.7);
        assert_eq!(round_one_decimal(33.333_333), 33.3);
        assert_eq!(round_one_decimal(100.0), 100.0);
    }

    #[test]
    fn scenario_target_in_middle_of_reference() {
        let pop = goals_population();
        let sample = filter_sample(&pop, &SampleFilter::new().with_position_groups([PositionGroup::CentreBack]));
        let report = rank_player(&sample, &PlayerQuery::Name("C".into()), &[Metric::Goals], &RankOptions::default()).unwrap();
        assert_eq!(report.percentiles(), vec![60.0]);
        assert_eq!(report.scores[0].reference_size, 5);
        assert!(report.target_in_sample);
    }

    #[test]
    fn scenario_empty_reference_is_neutral() {
        let pop = goals_population();
        let filter = SampleFilter::new().with_position_groups([PositionGroup::Goalkeeper]);
        let sample = filter_sample(&pop, &filter);
        assert!(sample.is_empty());
        let report = rank_player(&sample, &PlayerQuery::Name("F".into()), &[Metric::Goals], &RankOptions::default()).unwrap();
        assert_eq!(report.scores[0].percentile, NEUTRAL_PERCENTILE);
        assert_eq!(report.scores[0].value, Some(42.0));
        assert_eq!(report.scores[0].outcome, ScoreOutcome::EmptyReference);
    }

    #[test]
    fn scenario_missing_value_ignores_inversion() {
        let pop = goals_population();
        let sample = Sample::all(&pop);
        let options = RankOptions {
            lower_is_better: [Metric::Fouls].into_iter().collect(),
            ..RankOptions::default()
        };
        let report = rank_player(&sample, &PlayerQuery::Name("C".into()), &[Metric::Fouls], &options).unwrap();
        let score = &report.scores[0];
        assert_eq!(score.percentile, 50.0);
        assert!(!score.inverted);
        assert_eq!(score.outcome, ScoreOutcome::MissingValue);
    }

    #[test]
    fn scenario_lower_is_better_inverts() {
        let pop = goals_population();
        let sample = filter_sample(&pop, &SampleFilter::new().with_position_groups([PositionGroup::CentreBack]));
        let options = RankOptions {
            lower_is_better: [Metric::RedCards].into_iter().collect(),
            ..RankOptions::default()
        };
        let report = rank_player(&sample, &PlayerQuery::Name("C".into()), &[Metric::RedCards], &options).unwrap();
        assert_eq!(report.scores[0].percentile, 40.0);
        assert!(report.scores[0].inverted);

        let plain = rank_player(&sample, &PlayerQuery::Name("C".into()), &[Metric::RedCards], &RankOptions::default()).unwrap();
        assert_eq!(plain.scores[0].raw, 100.0 - report.scores[0].raw);
    }

    #[test]
    fn unknown_metric_is_neutral_and_order_is_kept() {
        let pop = goals_population();
        let sample = Sample::all(&pop);
        let metrics = [Metric::Xg, Metric::RedCards, Metric::Goals];
        let report = rank_player(&sample, &PlayerQuery::Name("E".into()), &metrics, &RankOptions::default()).unwrap();
        let order: Vec<Metric> = report.scores.iter().map(|s| s.metric).collect();
        assert_eq!(order, metrics);
        assert_eq!(report.scores[0].outcome, ScoreOutcome::NotInSchema);
        assert_eq!(report.scores[0].percentile, 50.0);
        assert_eq!(report.scores[2].percentile, 100.0);
    }

    #[test]
    fn filtered_out_target_joins_its_reference_set() {
        let pop = goals_population();
        let sample = filter_sample(&pop, &SampleFilter::new().with_position_groups([PositionGroup::CentreBack]));
        let report = rank_entity(&sample, 5, &[Metric::Goals], &RankOptions::default()).unwrap();
        assert!(!report.target_in_sample);
        assert_eq!(report.scores[0].reference_size, 6);
        // 10, 20, 30, 40, 42 of six values.
        assert_eq!(report.scores[0].percentile, 83.3);
    }

    #[test]
    fn ranking_is_idempotent_and_bounded() {
        let pop = goals_population();
        let sample = Sample::all(&pop);
        let metrics = [Metric::Goals, Metric::RedCards, Metric::Fouls];
        let options = RankOptions {
            lower_is_better: [Metric::RedCards].into_iter().collect(),
            tie_method: TieMethod::Mean,
        };
        for row in 0..pop.len() {
            let a = rank_entity(&sample, row, &metrics, &options).unwrap();
            let b = rank_entity(&sample, row, &metrics, &options).unwrap();
            assert_eq!(a, b);
            assert!(a.scores.iter().all(|s| (0.0..=100.0).contains(&s.raw)));
        }
    }

    #[test]
    fn ambiguous_target_is_an_error() {
        let mut pop_rows = vec![
            row("J. Smith", "Arsenal", PositionGroup::CentreBack, &[(Metric::Goals, 0.1)]),
            row("J. Smith", "Everton", PositionGroup::CentreBack, &[(Metric::Goals, 0.3)]),
        ];
        pop_rows.push(row("K", "Leeds", PositionGroup::CentreBack, &[(Metric::Goals, 0.2)]));
        let pop = Population::from_entities(pop_rows);
        let sample = Sample::all(&pop);
        let err = rank_player(&sample, &PlayerQuery::Name("J. Smith".into()), &[Metric::Goals], &RankOptions::default());
        assert!(matches!(err, Err(ResolveError::Ambiguous { .. })));
        let ok = rank_player(&sample, &PlayerQuery::new("J. Smith", Some("Everton")), &[Metric::Goals], &RankOptions::default()).unwrap();
        assert_eq!(ok.row, 1);
        assert_eq!(ok.percentiles(), vec![100.0]);
    }

    #[test]
    fn table_matches_single_player_ranking() {
        let pop = goals_population();
        let sample = Sample::all(&pop);
        let metrics = [Metric::Goals, Metric::Fouls];
        let options = RankOptions::default();
        let table = percentile_table(&sample, &metrics, &options);
        assert_eq!(table.rows, sample.rows());
        for (idx, row) in table.rows.iter().enumerate() {
            let report = rank_entity(&sample, *row, &metrics, &options).unwrap();
            for (m, score) in report.scores.iter().enumerate() {
                match score.outcome {
                    ScoreOutcome::Ranked => assert_eq!(table.get(idx, m), Some(score.percentile)),
                    _ => assert_eq!(table.get(idx, m), None),
                }
            }
        }
    }
}
