use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use pizza_radar::config::RadarConfig;
use pizza_radar::explore::{MetricDistribution, SampleComposition};
use pizza_radar::fake_population::fake_population;
use pizza_radar::ingest;
use pizza_radar::logging;
use pizza_radar::metric::{LowerIsBetter, Metric, validate_selection};
use pizza_radar::percentile::{RankReport, ScoreOutcome, TieMethod, rank_player};
use pizza_radar::pizza::{ColorScheme, Gradient, PizzaChart, file_stem, write_svg};
use pizza_radar::population::{PlayerQuery, Population};
use pizza_radar::position::PositionGroup;
use pizza_radar::sample_export::export_workbook;
use pizza_radar::sample_filter::{AgeRange, Bound, FilterOptions, MetricThreshold, filter_sample};
use pizza_radar::template::TEMPLATES;

/// Percentile pizza charts from player exports
#[derive(Parser)]
#[command(name = "pizza")]
#[command(about = "Rank a player against a filtered comparison sample")]
struct Cli {
    #[command(flatten)]
    source: SourceArgs,

    #[command(flatten)]
    filter: FilterArgs,

    #[command(flatten)]
    ranking: RankingArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Player export (CSV); defaults to PIZZA_DATA or the config file
    #[arg(long, global = true)]
    data: Option<PathBuf>,
    /// Use a synthetic population
    #[arg(long, global = true)]
    demo: bool,
    /// Seed for the synthetic population
    #[arg(long, global = true, default_value = "26")]
    seed: u64,
}

#[derive(Args)]
struct FilterArgs {
    /// Position groups in the sample (CB, FB, CM, WM, AM, WF, CF, GK)
    #[arg(long = "group", global = true, value_delimiter = ',')]
    groups: Vec<PositionGroup>,
    /// Competitions in the sample
    #[arg(long = "competition", global = true)]
    competitions: Vec<String>,
    #[arg(long, global = true)]
    min_age: Option<u32>,
    #[arg(long, global = true)]
    max_age: Option<u32>,
    #[arg(long, global = true)]
    min_minutes: Option<u32>,
    #[arg(long, global = true)]
    max_minutes: Option<u32>,
    /// Raw-value threshold: "Metric>=x", "Metric<=x" or "Metric=lo..hi"
    #[arg(long = "threshold", global = true, value_parser = parse_threshold)]
    thresholds: Vec<MetricThreshold>,
}

#[derive(Args)]
struct RankingArgs {
    /// Radar axes in order; overrides the template
    #[arg(long = "metric", global = true, value_parser = parse_metric)]
    metrics: Vec<Metric>,
    /// Radar template (CB, FB, #6, #8, WF/AM, CF, "CF preset")
    #[arg(long, global = true)]
    template: Option<String>,
    /// weak, strict, mean or rank
    #[arg(long, global = true, value_parser = parse_tie)]
    tie: Option<TieMethod>,
    /// Comma-separated metrics where lower ranks higher
    #[arg(long, global = true)]
    lower_is_better: Option<String>,
}

#[derive(Args)]
struct PlayerArgs {
    /// Player name as it appears in the export
    player: Option<String>,
    /// Team, to disambiguate repeated names
    #[arg(long)]
    team: Option<String>,
    /// Export row instead of a name
    #[arg(long, conflicts_with = "player")]
    row: Option<usize>,
}

impl PlayerArgs {
    fn query(&self) -> Result<PlayerQuery> {
        match (&self.player, self.row) {
            (_, Some(row)) => Ok(PlayerQuery::Row(row)),
            (Some(name), None) => Ok(PlayerQuery::new(name, self.team.as_deref())),
            (None, None) => bail!("name a player or pass --row"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print a player's percentiles
    Rank {
        #[command(flatten)]
        player: PlayerArgs,
        #[arg(long)]
        json: bool,
    },
    /// Write a pizza chart as SVG
    Render {
        #[command(flatten)]
        player: PlayerArgs,
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// warm_to_cool, blue_scale, purple_scale, ocean or sunset
        #[arg(long)]
        gradient: Option<String>,
        /// Paint every slice in one colour
        #[arg(long, conflicts_with = "gradient")]
        color: Option<String>,
        /// Colour slices in runs of three
        #[arg(long, conflicts_with_all = ["gradient", "color"])]
        grouped: bool,
        #[arg(long)]
        season: Option<String>,
        #[arg(long)]
        no_legend: bool,
    },
    /// Write the ranking and its sample to an xlsx workbook
    Export {
        #[command(flatten)]
        player: PlayerArgs,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Describe the sample and the spread of each metric
    Explore {
        #[arg(long)]
        json: bool,
    },
    /// List players passing the filter, best first
    Shortlist {
        /// Sort key; defaults to the first threshold metric
        #[arg(long, value_parser = parse_metric)]
        sort_by: Option<Metric>,
        #[arg(long, default_value = "25")]
        limit: usize,
    },
    /// Show the filter values and metrics the export offers
    Options {
        #[arg(long)]
        json: bool,
    },
}

fn parse_metric(raw: &str) -> Result<Metric, String> {
    Metric::from_label(raw).ok_or_else(|| format!("unknown metric `{raw}`"))
}

fn parse_tie(raw: &str) -> Result<TieMethod, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "weak" => Ok(TieMethod::Weak),
        "strict" => Ok(TieMethod::Strict),
        "mean" => Ok(TieMethod::Mean),
        "rank" => Ok(TieMethod::Rank),
        other => Err(format!("unknown tie method `{other}`")),
    }
}

fn parse_threshold(raw: &str) -> Result<MetricThreshold, String> {
    let number = |s: &str| {
        s.trim()
            .parse::<f64>()
            .map_err(|_| format!("`{}` is not a number", s.trim()))
    };
    let (name, bound) = if let Some((name, v)) = raw.split_once(">=") {
        (name, Bound::AtLeast(number(v)?))
    } else if let Some((name, v)) = raw.split_once("<=") {
        (name, Bound::AtMost(number(v)?))
    } else if let Some((name, range)) = raw.rsplit_once('=') {
        let (lo, hi) = range
            .split_once("..")
            .ok_or_else(|| format!("expected lo..hi in `{raw}`"))?;
        (name, Bound::Between(number(lo)?, number(hi)?))
    } else {
        return Err(format!("expected Metric>=x, Metric<=x or Metric=lo..hi, got `{raw}`"));
    };
    Ok(MetricThreshold {
        metric: parse_metric(name.trim())?,
        bound,
    })
}

struct Session {
    config: RadarConfig,
    population: Population,
    metrics: Vec<Metric>,
}

impl Session {
    fn open(cli: &Cli) -> Result<Self> {
        let mut config = RadarConfig::from_env()?;
        cli.apply(&mut config);

        let population = if cli.source.demo {
            fake_population(1500, cli.source.seed)
        } else {
            let path = config
                .data_path
                .clone()
                .context("no export given: pass --data, set PIZZA_DATA, or use --demo")?;
            let (population, report) = ingest::load_population(&path, config.header_style)?;
            info!(
                rows = report.rows_read,
                skipped = report.rows_skipped,
                metrics = report.metric_columns,
                "loaded {}",
                path.display()
            );
            population
        };

        let metrics = config.resolve_metrics(&population);
        if let Err(err) = validate_selection(&metrics) {
            warn!("{err}");
        }
        Ok(Self {
            config,
            population,
            metrics,
        })
    }

    fn rank(&self, player: &PlayerArgs) -> Result<RankReport> {
        let query = player.query()?;
        let sample = filter_sample(&self.population, &self.config.filter);
        let report = rank_player(&sample, &query, &self.metrics, &self.config.ranking)?;
        if !report.target_in_sample {
            info!(player = %report.player, "player is outside the filtered sample; ranked with own value added");
        }
        Ok(report)
    }
}

impl Cli {
    fn apply(&self, config: &mut RadarConfig) {
        if let Some(path) = &self.source.data {
            config.data_path = Some(path.clone());
        }

        let filter = &mut config.filter;
        if !self.filter.groups.is_empty() {
            filter.position_groups = self.filter.groups.iter().copied().collect();
        }
        if !self.filter.competitions.is_empty() {
            filter.competitions = self.filter.competitions.iter().cloned().collect();
        }
        if self.filter.min_age.is_some() || self.filter.max_age.is_some() {
            let current = filter.age_range;
            let min = self
                .filter
                .min_age
                .or(current.map(|r| r.min))
                .unwrap_or(0);
            let max = self
                .filter
                .max_age
                .or(current.map(|r| r.max))
                .unwrap_or(u32::MAX);
            filter.age_range = Some(AgeRange::new(min, max));
        }
        if let Some(min) = self.filter.min_minutes {
            filter.min_minutes = Some(min);
        }
        if let Some(max) = self.filter.max_minutes {
            filter.max_minutes = Some(max);
        }
        filter
            .metric_thresholds
            .extend(self.filter.thresholds.iter().copied());

        if !self.ranking.metrics.is_empty() {
            config.metrics = self.ranking.metrics.clone();
        } else if let Some(name) = &self.ranking.template {
            config.metrics.clear();
            config.template = Some(name.clone());
        }
        if let Some(tie) = self.ranking.tie {
            config.ranking.tie_method = tie;
        }
        if let Some(raw) = &self.ranking.lower_is_better {
            let (set, unknown): (LowerIsBetter, Vec<String>) = LowerIsBetter::parse_list(raw);
            for name in unknown {
                warn!("--lower-is-better: unknown metric `{name}`");
            }
            config.ranking.lower_is_better = set;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_stderr()?;

    let session = Session::open(&cli)?;
    match &cli.command {
        Commands::Rank { player, json } => {
            let report = session.rank(player)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Commands::Render {
            player,
            out,
            gradient,
            color,
            grouped,
            season,
            no_legend,
        } => {
            let report = session.rank(player)?;
            let mut style = session.config.style.clone();
            if let Some(name) = gradient {
                let g = Gradient::from_name(name)
                    .with_context(|| format!("unknown gradient `{name}`"))?;
                style = style.with_gradient(g);
            } else if let Some(color) = color {
                style = style.with_scheme(ColorScheme::single(color.clone()));
            } else if *grouped {
                style = style.with_scheme(ColorScheme::grouped_default());
            }
            if *no_legend {
                style = style.with_legend(false);
            }
            let mut header = session.config.chart_header();
            if let Some(season) = season {
                header.season = season.clone();
            }
            if session.config.filter.competitions.len() == 1 {
                header.competition = session.config.filter.competitions.iter().next().cloned();
            }
            let chart = PizzaChart::from_report(&report, &header, &style);
            let path = out
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("{}.svg", file_stem(&report.player))));
            write_svg(&path, &chart, &style)?;
            println!("{}: {}", chart.title, path.display());
        }
        Commands::Export { player, out } => {
            let report = session.rank(player)?;
            let sample = filter_sample(&session.population, &session.config.filter);
            let path = out
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("{}.xlsx", file_stem(&report.player))));
            let written = export_workbook(
                &path,
                &report,
                &sample,
                &session.metrics,
                &session.config.ranking,
            )?;
            println!(
                "{}: {} percentile rows, {} sample rows ({})",
                path.display(),
                written.percentile_rows,
                written.sample_rows,
                written.generated_at
            );
        }
        Commands::Explore { json } => {
            let sample = filter_sample(&session.population, &session.config.filter);
            let composition = SampleComposition::of(&sample);
            let distributions: Vec<MetricDistribution> = session
                .metrics
                .iter()
                .filter_map(|m| MetricDistribution::of(&sample, *m))
                .collect();
            if *json {
                let out = serde_json::json!({
                    "composition": composition,
                    "distributions": distributions,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                print_exploration(&composition, &distributions);
            }
        }
        Commands::Shortlist { sort_by, limit } => {
            let sample = filter_sample(&session.population, &session.config.filter);
            let key = sort_by
                .or_else(|| session.config.filter.metric_thresholds.first().map(|t| t.metric))
                .or_else(|| session.metrics.first().copied());
            let mut rows: Vec<_> = sample.entities().collect();
            if let Some(key) = key {
                rows.sort_by(|a, b| {
                    let va = a.metric(key).unwrap_or(f64::NEG_INFINITY);
                    let vb = b.metric(key).unwrap_or(f64::NEG_INFINITY);
                    vb.total_cmp(&va)
                });
            }
            println!("{} players match", rows.len());
            for e in rows.iter().take(*limit) {
                let group = e.position_group.map(|g| g.code()).unwrap_or("--");
                let value = key
                    .and_then(|k| e.metric(k))
                    .map(|v| format!("{v:.2}"))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<3} {:<32} {:>6} min  {}",
                    group,
                    e.display_label(),
                    e.minutes_played.unwrap_or(0),
                    value
                );
            }
        }
        Commands::Options { json } => {
            let options = FilterOptions::from_population(&session.population);
            let metrics = session.population.available_metrics();
            if *json {
                let out = serde_json::json!({
                    "filter": options,
                    "metrics": metrics,
                    "templates": TEMPLATES,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                print_options(&options, &metrics);
            }
        }
    }
    Ok(())
}

fn print_report(report: &RankReport) {
    println!(
        "{} | {} | {} players in sample",
        report.player,
        report.team.as_deref().unwrap_or("-"),
        report.sample_size
    );
    println!("{}", "=".repeat(60));
    for s in &report.scores {
        let value = s
            .value
            .map(|v| format!("{v:.2}"))
            .unwrap_or_else(|| "-".to_string());
        let note = match s.outcome {
            ScoreOutcome::Ranked if s.inverted => "lower is better",
            ScoreOutcome::Ranked => "",
            ScoreOutcome::MissingValue => "no value",
            ScoreOutcome::NotInSchema => "not in export",
            ScoreOutcome::EmptyReference => "empty sample",
        };
        println!("{:<28} {:>9} {:>6.1}  {}", s.metric.label(), value, s.percentile, note);
    }
}

fn print_exploration(composition: &SampleComposition, distributions: &[MetricDistribution]) {
    println!("Sample: {} players", composition.size);
    for (group, n) in &composition.position_groups {
        println!("  {:<4} {n}", group.code());
    }
    for (comp, n) in &composition.competitions {
        println!("  {comp:<24} {n}");
    }
    if let Some(age) = &composition.age {
        println!(
            "  Age {}-{} (mean {:.1}, median {:.1})",
            age.min, age.max, age.mean, age.median
        );
    }
    println!("{}", "=".repeat(60));
    for d in distributions {
        println!(
            "{:<28} n={:<5} min {:.2} median {:.2} max {:.2}",
            d.metric.label(),
            d.count,
            d.min,
            d.median,
            d.max
        );
        let cuts: Vec<String> = d
            .suggested_thresholds()
            .iter()
            .map(|t| format!("{} >= {:.2}", t.label, t.at_least))
            .collect();
        println!("    {}", cuts.join(" | "));
    }
}

fn print_options(options: &FilterOptions, metrics: &[Metric]) {
    let groups: Vec<&str> = options.position_groups.iter().map(|g| g.code()).collect();
    println!("Position groups: {}", groups.join(", "));
    println!("Competitions: {}", options.competitions.join(", "));
    if let Some((lo, hi)) = options.age {
        println!("Age: {lo}-{hi}");
    }
    if let Some((lo, hi)) = options.minutes {
        println!("Minutes: {lo}-{hi}");
    }
    println!("Metrics ({}):", metrics.len());
    for m in metrics {
        println!("  {}", m.label());
    }
    let names: Vec<&str> = TEMPLATES.iter().map(|t| t.name).collect();
    println!("Templates: {}", names.join(", "));
}
