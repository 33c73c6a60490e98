use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::metric::Metric;
use crate::percentile::{RankOptions, RankReport, ScoreOutcome, percentile_table};
use crate::sample_filter::Sample;

pub struct ExportReport {
    pub percentile_rows: usize,
    pub sample_rows: usize,
    pub generated_at: String,
}

enum Cell {
    Text(String),
    Number(f64),
    Blank,
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Cell::Blank, Cell::Number)
    }
}

fn outcome_label(outcome: ScoreOutcome) -> &'static str {
    match outcome {
        ScoreOutcome::Ranked => "ranked",
        ScoreOutcome::MissingValue => "missing value",
        ScoreOutcome::NotInSchema => "not in export",
        ScoreOutcome::EmptyReference => "empty sample",
    }
}

/// Write `Summary`, `Percentiles` and `Sample` sheets for one ranking.
pub fn export_workbook(
    path: &Path,
    report: &RankReport,
    sample: &Sample<'_>,
    metrics: &[Metric],
    options: &RankOptions,
) -> Result<ExportReport> {
    let generated_at = Local::now().format("%Y-%m-%d %H:%M").to_string();

    let summary_rows: Vec<Vec<Cell>> = vec![
        vec!["Player".into(), report.player.clone().into()],
        vec!["Team".into(), report.team.clone().unwrap_or_default().into()],
        vec![
            "Competition".into(),
            report.competition.clone().unwrap_or_default().into(),
        ],
        vec!["Sample size".into(), Cell::Number(report.sample_size as f64)],
        vec![
            "Target in sample".into(),
            if report.target_in_sample { "yes" } else { "no (added to reference)" }.into(),
        ],
        vec!["Generated at".into(), generated_at.clone().into()],
    ];

    let mut percentile_rows: Vec<Vec<Cell>> = vec![vec![
        "Metric".into(),
        "Value".into(),
        "Percentile".into(),
        "Raw Percentile".into(),
        "Inverted".into(),
        "Reference Size".into(),
        "Outcome".into(),
    ]];
    for score in &report.scores {
        percentile_rows.push(vec![
            score.metric.label().into(),
            score.value.into(),
            Cell::Number(score.percentile),
            Cell::Number(score.raw),
            if score.inverted { "yes" } else { "no" }.into(),
            Cell::Number(score.reference_size as f64),
            outcome_label(score.outcome).into(),
        ]);
    }

    let table = percentile_table(sample, metrics, options);
    let population = sample.population();
    let mut header: Vec<Cell> = vec!["Player".into(), "Team".into(), "Position Group".into()];
    header.extend(metrics.iter().map(|m| Cell::from(format!("{} pct", m.label()))));
    let mut sample_rows = vec![header];
    for (idx, row) in table.rows.iter().enumerate() {
        let Some(entity) = population.get(*row) else {
            continue;
        };
        let mut cells: Vec<Cell> = vec![
            entity.name.clone().into(),
            entity.team.clone().unwrap_or_default().into(),
            entity
                .position_group
                .map(|g| g.code().to_string())
                .unwrap_or_default()
                .into(),
        ];
        cells.extend((0..metrics.len()).map(|m| Cell::from(table.get(idx, m))));
        sample_rows.push(cells);
    }

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Summary")?;
        write_rows(sheet, &summary_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Percentiles")?;
        write_rows(sheet, &percentile_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Sample")?;
        write_rows(sheet, &sample_rows)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        percentile_rows: percentile_rows.len().saturating_sub(1),
        sample_rows: sample_rows.len().saturating_sub(1),
        generated_at,
    })
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<Cell>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            let (r, c) = (row_idx as u32, col_idx as u16);
            let written = match value {
                Cell::Text(text) => worksheet.write_string(r, c, text).map(|_| ()),
                Cell::Number(n) => worksheet.write_number(r, c, *n).map(|_| ()),
                Cell::Blank => Ok(()),
            };
            written.with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
