use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::column_mapping;
use crate::metric::Metric;
use crate::population::{Attribute, Entity, Population};
use crate::position::PositionGroup;

/// How to interpret export headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderStyle {
    /// Detect raw vendor headers (e.g. `"xG per 90"`) and remap them if present.
    #[default]
    Auto,
    /// Raw Wyscout headers; always remap.
    Wyscout,
    /// Headers already use canonical names.
    Canonical,
}

#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub rows_read: usize,
    pub rows_skipped: usize,
    pub metric_columns: usize,
    pub derived_metrics: Vec<Metric>,
    pub unmapped_columns: Vec<String>,
    pub remapped: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum Column {
    Name,
    Team,
    TeamInTimeframe,
    Position,
    PositionGroup,
    Competition,
    Age,
    MinutesPlayed,
    Metric(Metric),
    Ignored,
}

pub fn load_population(path: &Path, style: HeaderStyle) -> Result<(Population, IngestReport)> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    read_population(file, style).with_context(|| format!("read export {}", path.display()))
}

pub fn read_population<R: Read>(reader: R, style: HeaderStyle) -> Result<(Population, IngestReport)> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .context("read header row")?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let remap = match style {
        HeaderStyle::Wyscout => true,
        HeaderStyle::Canonical => false,
        HeaderStyle::Auto => looks_like_vendor_headers(&headers),
    };

    let mut report = IngestReport {
        remapped: remap,
        ..IngestReport::default()
    };
    let columns: Vec<Column> = headers
        .iter()
        .map(|h| classify_header(h, remap, &mut report.unmapped_columns))
        .collect();

    if !columns.contains(&Column::Name) {
        bail!("export has no `Player` column");
    }

    let mut attributes = BTreeSet::new();
    let mut schema = BTreeSet::new();
    for col in &columns {
        match col {
            Column::Team | Column::TeamInTimeframe => {
                attributes.insert(Attribute::Team);
            }
            Column::Position => {
                attributes.insert(Attribute::Position);
                attributes.insert(Attribute::PositionGroup);
            }
            Column::PositionGroup => {
                attributes.insert(Attribute::PositionGroup);
            }
            Column::Competition => {
                attributes.insert(Attribute::Competition);
            }
            Column::Age => {
                attributes.insert(Attribute::Age);
            }
            Column::MinutesPlayed => {
                attributes.insert(Attribute::MinutesPlayed);
            }
            Column::Metric(m) => {
                schema.insert(*m);
            }
            Column::Name | Column::Ignored => {}
        }
    }
    report.metric_columns = schema.len();
    for (metric, inputs) in DERIVED {
        if !schema.contains(metric) && inputs.iter().all(|m| schema.contains(m)) {
            report.derived_metrics.push(*metric);
        }
    }
    schema.extend(report.derived_metrics.iter().copied());

    let mut entities = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("parse record {}", idx + 1))?;
        report.rows_read += 1;
        match entity_from_record(&columns, &record) {
            Some(mut entity) => {
                apply_derived(&mut entity.metrics, &report.derived_metrics);
                entities.push(entity);
            }
            None => report.rows_skipped += 1,
        }
    }

    if !report.unmapped_columns.is_empty() {
        warn!(
            columns = report.unmapped_columns.len(),
            "export has columns outside the known schema: {}",
            report.unmapped_columns.join(", ")
        );
    }
    info!(
        rows = entities.len(),
        skipped = report.rows_skipped,
        metrics = schema.len(),
        remapped = remap,
        "loaded population"
    );

    Ok((Population::new(entities, attributes, schema), report))
}

fn looks_like_vendor_headers(headers: &[String]) -> bool {
    headers.iter().any(|h| match column_mapping::canonical_name(h) {
        Some(canonical) => canonical != h && !column_mapping::is_canonical(h),
        None => false,
    })
}

fn classify_header(raw: &str, remap: bool, unmapped: &mut Vec<String>) -> Column {
    let name = if remap {
        match column_mapping::canonical_name(raw) {
            Some(canonical) => canonical,
            None => raw,
        }
    } else {
        raw
    };
    match name {
        "Player" => Column::Name,
        "Team" => Column::Team,
        "Team within selected timeframe" => Column::TeamInTimeframe,
        "Position" => Column::Position,
        "Position_Group" => Column::PositionGroup,
        "Competition" => Column::Competition,
        "Age" => Column::Age,
        "Minutes played" => Column::MinutesPlayed,
        _ => match Metric::from_canonical(name) {
            Some(m) => Column::Metric(m),
            None => {
                if !column_mapping::is_canonical(name) && !name.is_empty() {
                    unmapped.push(raw.to_string());
                }
                Column::Ignored
            }
        },
    }
}

fn entity_from_record(columns: &[Column], record: &csv::StringRecord) -> Option<Entity> {
    let mut entity = Entity::new(String::new());
    let mut team = None;
    let mut team_in_timeframe = None;
    let mut group_cell = None;

    for (col, cell) in columns.iter().zip(record.iter()) {
        match col {
            Column::Name => entity.name = cell.to_string(),
            Column::Team => team = non_empty(cell),
            Column::TeamInTimeframe => team_in_timeframe = non_empty(cell),
            Column::Position => entity.position = non_empty(cell),
            Column::PositionGroup => group_cell = non_empty(cell),
            Column::Competition => entity.competition = non_empty(cell),
            Column::Age => entity.age = parse_count(cell),
            Column::MinutesPlayed => entity.minutes_played = parse_count(cell),
            Column::Metric(m) => {
                if let Some(v) = parse_number(cell) {
                    entity.metrics.insert(*m, v);
                }
            }
            Column::Ignored => {}
        }
    }

    if entity.name.is_empty() {
        return None;
    }
    entity.team = team_in_timeframe.or(team);
    entity.position_group = group_cell
        .as_deref()
        .and_then(PositionGroup::from_code)
        .or_else(|| entity.position.as_deref().and_then(PositionGroup::from_position));
    Some(entity)
}

/// Columns computed from other columns when the export does not carry them.
const DERIVED: &[(Metric, &[Metric])] = &[
    (
        Metric::AerialDuelsWon,
        &[Metric::AttAerialDuels, Metric::AerialDuelsWonPct],
    ),
    (
        Metric::GroundDuelsWon,
        &[Metric::AttGroundDuels, Metric::GroundDuelsWonPct],
    ),
    (
        Metric::TotalDuelsWon,
        &[
            Metric::AttAerialDuels,
            Metric::AerialDuelsWonPct,
            Metric::AttGroundDuels,
            Metric::GroundDuelsWonPct,
        ],
    ),
    (
        Metric::TotalDuelPct,
        &[Metric::AerialDuelsWonPct, Metric::GroundDuelsWonPct],
    ),
    (
        Metric::DuelsContested,
        &[Metric::AttAerialDuels, Metric::AttGroundDuels],
    ),
    (
        Metric::EfxProgPasses,
        &[Metric::ProgPasses, Metric::ProgPassAccPct],
    ),
    (Metric::XgPerShot, &[Metric::Xg, Metric::Shots]),
    (Metric::NpgMinusXg, &[Metric::TotalNonPenGoals, Metric::TotalXg]),
];

fn apply_derived(metrics: &mut HashMap<Metric, f64>, derived: &[Metric]) {
    for metric in derived {
        if let Some(v) = derived_value(metrics, *metric) {
            metrics.insert(*metric, v);
        }
    }
}

fn derived_value(metrics: &HashMap<Metric, f64>, metric: Metric) -> Option<f64> {
    let get = |m: Metric| metrics.get(&m).copied();
    let won = |att: Metric, pct: Metric| Some(get(att)? * get(pct)? / 100.0);
    let v = match metric {
        Metric::AerialDuelsWon => won(Metric::AttAerialDuels, Metric::AerialDuelsWonPct)?,
        Metric::GroundDuelsWon => won(Metric::AttGroundDuels, Metric::GroundDuelsWonPct)?,
        Metric::TotalDuelsWon => {
            won(Metric::AttAerialDuels, Metric::AerialDuelsWonPct)?
                + won(Metric::AttGroundDuels, Metric::GroundDuelsWonPct)?
        }
        Metric::TotalDuelPct => {
            (get(Metric::AerialDuelsWonPct)? + get(Metric::GroundDuelsWonPct)?) / 2.0
        }
        Metric::DuelsContested => get(Metric::AttAerialDuels)? + get(Metric::AttGroundDuels)?,
        Metric::EfxProgPasses => won(Metric::ProgPasses, Metric::ProgPassAccPct)?,
        Metric::XgPerShot => {
            let shots = get(Metric::Shots)?;
            if shots <= 0.0 {
                return None;
            }
            get(Metric::Xg)? / shots
        }
        Metric::NpgMinusXg => get(Metric::TotalNonPenGoals)? - get(Metric::TotalXg)?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

fn non_empty(cell: &str) -> Option<String> {
    let s = cell.trim();
    if s.is_empty() || s == "-" {
        None
    } else {
        Some(s.to_string())
    }
}

fn parse_count(raw: &str) -> Option<u32> {
    let v = parse_number(raw)?;
    if v < 0.0 {
        return None;
    }
    Some(v.round() as u32)
}

/// Parse an export cell. Empty, `-` and `NaN` cells are missing, as is any
/// cell that is not a number once separators and decorations are removed.
pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim().trim_end_matches('%').trim();
    if s.is_empty() || s == "-" || s.eq_ignore_ascii_case("nan") {
        return None;
    }
    // Thousands separators and currency symbols.
    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, ',' | '_' | '\'' | ' ' | '\u{a0}' | '€' | '$' | '£'))
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_number_handles_decorations() {
        assert_eq!(parse_number("1,250"), Some(1250.0));
        assert_eq!(parse_number(" 58.3% "), Some(58.3));
        assert_eq!(parse_number("-0.12"), Some(-0.12));
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("€12,000,000"), Some(12_000_000.0));
    }

    #[test]
    fn parse_number_reads_exponents_and_rejects_text() {
        assert_eq!(parse_number("1.5e-05"), Some(1.5e-5));
        assert_eq!(parse_number("2E+3"), Some(2000.0));
        assert_eq!(parse_number("1e+20"), Some(1e20));
        assert_eq!(parse_number("abc12"), None);
        assert_eq!(parse_number("12 apps"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn scientific_cells_survive_ingestion() {
        let csv = "Player,Team,xG per 90,Shots per 90\nA,X,1.5e-05,2\nB,Y,abc12,1\n";
        let (pop, _) = read_population(csv.as_bytes(), HeaderStyle::Auto).unwrap();
        assert_eq!(pop.get(0).and_then(|e| e.metric(Metric::Xg)), Some(1.5e-5));
        assert_eq!(pop.get(1).and_then(|e| e.metric(Metric::Xg)), None);
        assert_eq!(pop.get(1).and_then(|e| e.metric(Metric::Shots)), Some(1.0));
    }

    #[test]
    fn vendor_headers_are_detected() {
        let vendor = vec!["Player".to_string(), "xG per 90".to_string()];
        let canonical = vec!["Player".to_string(), "xG".to_string(), "Goals".to_string()];
        assert!(looks_like_vendor_headers(&vendor));
        assert!(!looks_like_vendor_headers(&canonical));
    }

    #[test]
    fn xg_per_shot_skips_zero_shots() {
        let mut metrics = HashMap::from([(Metric::Xg, 0.3), (Metric::Shots, 0.0)]);
        apply_derived(&mut metrics, &[Metric::XgPerShot]);
        assert!(!metrics.contains_key(&Metric::XgPerShot));

        metrics.insert(Metric::Shots, 2.0);
        apply_derived(&mut metrics, &[Metric::XgPerShot]);
        assert_eq!(metrics.get(&Metric::XgPerShot), Some(&0.15));
    }

    #[test]
    fn duel_metrics_combine_volume_and_rate() {
        let mut metrics = HashMap::from([
            (Metric::AttAerialDuels, 4.0),
            (Metric::AerialDuelsWonPct, 50.0),
            (Metric::AttGroundDuels, 10.0),
            (Metric::GroundDuelsWonPct, 60.0),
        ]);
        let derived = [
            Metric::AerialDuelsWon,
            Metric::GroundDuelsWon,
            Metric::TotalDuelsWon,
            Metric::TotalDuelPct,
            Metric::DuelsContested,
        ];
        apply_derived(&mut metrics, &derived);
        assert_eq!(metrics[&Metric::AerialDuelsWon], 2.0);
        assert_eq!(metrics[&Metric::GroundDuelsWon], 6.0);
        assert_eq!(metrics[&Metric::TotalDuelsWon], 8.0);
        assert_eq!(metrics[&Metric::TotalDuelPct], 55.0);
        assert_eq!(metrics[&Metric::DuelsContested], 14.0);
    }
}
