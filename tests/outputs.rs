use std::fs;
use std::path::PathBuf;

use pizza_radar::config::RadarConfig;
use pizza_radar::ingest::{HeaderStyle, load_population};
use pizza_radar::metric::{LowerIsBetter, Metric};
use pizza_radar::percentile::{RankOptions, TieMethod, rank_player};
use pizza_radar::pizza::{ChartHeader, ChartStyle, Gradient, PizzaChart, render_svg, write_svg};
use pizza_radar::population::{PlayerQuery, Population};
use pizza_radar::position::PositionGroup;
use pizza_radar::sample_export::export_workbook;
use pizza_radar::sample_filter::{SampleFilter, filter_sample};

fn canonical() -> Population {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push("canonical_export.csv");
    load_population(&path, HeaderStyle::Canonical)
        .expect("fixture should load")
        .0
}

const AXES: [Metric; 4] = [Metric::Goals, Metric::Xg, Metric::Fouls, Metric::RedCards];

#[test]
fn config_survives_a_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("radar.json");
    let cfg = RadarConfig {
        data_path: Some(PathBuf::from("exports/season.csv")),
        filter: SampleFilter::new()
            .with_position_groups([PositionGroup::CentreBack, PositionGroup::FullBack])
            .with_min_minutes(900),
        metrics: AXES.to_vec(),
        ranking: RankOptions {
            tie_method: TieMethod::Rank,
            lower_is_better: [Metric::Fouls].into_iter().collect::<LowerIsBetter>(),
        },
        style: ChartStyle::new().with_gradient(Gradient::Sunset),
        season: "2025/26".to_string(),
        ..RadarConfig::default()
    };
    cfg.save(&path).unwrap();
    assert!(!path.with_extension("json.tmp").exists());
    assert_eq!(RadarConfig::load(&path).unwrap(), cfg);
}

#[test]
fn chart_carries_report_values_unchanged() {
    let pop = canonical();
    let sample = filter_sample(&pop, &SampleFilter::new().with_position_groups([PositionGroup::CentreBack]));
    let report = rank_player(&sample, &PlayerQuery::new("K. Moreno", None), &AXES, &RankOptions::default())
        .unwrap();
    let header = ChartHeader {
        season: "2025/26".to_string(),
        competition: None,
        sample_positions: vec![PositionGroup::CentreBack],
    };
    let style = ChartStyle::new();
    let chart = PizzaChart::from_report(&report, &header, &style);
    assert_eq!(chart.title, "K. Moreno | Gamma");
    assert_eq!(chart.subtitle, "League A 2025/26 | Percentiles vs CBs");
    assert_eq!(chart.percentiles(), report.percentiles());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("moreno.svg");
    write_svg(&path, &chart, &style).unwrap();
    let svg = fs::read_to_string(&path).unwrap();
    assert_eq!(svg, render_svg(&chart, &style));
    assert!(svg.starts_with("<svg") || svg.starts_with("<?xml"));
    assert!(svg.contains("K. Moreno | Gamma"));
}

#[test]
fn workbook_holds_ranking_and_sample() {
    let pop = canonical();
    let sample = filter_sample(&pop, &SampleFilter::new().with_competitions(["League A"]));
    let options = RankOptions::default();
    let report = rank_player(&sample, &PlayerQuery::new("N. Ricci", None), &AXES, &options).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ricci.xlsx");
    let written = export_workbook(&path, &report, &sample, &AXES, &options).unwrap();
    assert_eq!(written.percentile_rows, AXES.len());
    assert_eq!(written.sample_rows, sample.len());
    assert!(fs::metadata(&path).unwrap().len() > 0);
}
