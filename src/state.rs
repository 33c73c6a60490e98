use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::RadarConfig;
use crate::metric::{Metric, validate_selection};
use crate::percentile::{RankReport, rank_entity};
use crate::pizza::{PizzaChart, file_stem, write_svg};
use crate::population::Population;
use crate::position::PositionGroup;
use crate::sample_export;
use crate::sample_filter::{FilterOptions, SampleFilter, filter_sample};
use crate::template::TEMPLATES;

const MAX_LOGS: usize = 200;

/// Which position groups the comparison sample is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupScope {
    /// Whatever the configured filter says.
    Configured,
    /// The selected player's own group.
    SameAsPlayer,
    Only(PositionGroup),
}

/// Terminal session: the loaded population plus everything the user has chosen.
#[derive(Debug, Clone)]
pub struct AppState {
    pub population: Population,
    pub source: String,
    pub config: RadarConfig,
    pub metrics: Vec<Metric>,
    pub template_idx: Option<usize>,
    pub scope: GroupScope,
    pub options: FilterOptions,
    pub selected: usize,
    pub search: String,
    pub search_active: bool,
    pub report: Option<RankReport>,
    pub error: Option<String>,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
}

impl AppState {
    pub fn new(population: Population, config: RadarConfig, source: impl Into<String>) -> Self {
        let template_idx = if config.metrics.is_empty() {
            TEMPLATES
                .iter()
                .position(|t| t.name.eq_ignore_ascii_case(config.template_name()))
        } else {
            None
        };
        let metrics = config.resolve_metrics(&population);
        let options = FilterOptions::from_population(&population);
        let mut state = Self {
            population,
            source: source.into(),
            config,
            metrics,
            template_idx,
            scope: GroupScope::Configured,
            options,
            selected: 0,
            search: String::new(),
            search_active: false,
            report: None,
            error: None,
            logs: VecDeque::with_capacity(MAX_LOGS),
            help_overlay: false,
        };
        state.push_log(format!(
            "[INFO] Loaded {} players from {}",
            state.population.len(),
            state.source
        ));
        if let Err(err) = validate_selection(&state.metrics) {
            state.push_log(format!("[WARN] {err}"));
        }
        state.recompute();
        state
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    /// Population rows matching the search box, in population order.
    pub fn visible_rows(&self) -> Vec<usize> {
        let query = self.search.trim().to_lowercase();
        self.population
            .entities()
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                query.is_empty()
                    || e.name.to_lowercase().contains(&query)
                    || e.team
                        .as_deref()
                        .is_some_and(|t| t.to_lowercase().contains(&query))
            })
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn selected_row(&self) -> Option<usize> {
        self.visible_rows().get(self.selected).copied()
    }

    pub fn select_next(&mut self) {
        let total = self.visible_rows().len();
        self.selected = if total == 0 { 0 } else { (self.selected + 1) % total };
        self.recompute();
    }

    pub fn select_prev(&mut self) {
        let total = self.visible_rows().len();
        self.selected = match (total, self.selected) {
            (0, _) => 0,
            (_, 0) => total - 1,
            (_, n) => n - 1,
        };
        self.recompute();
    }

    pub fn clamp_selection(&mut self) {
        let total = self.visible_rows().len();
        if total == 0 {
            self.selected = 0;
        } else if self.selected >= total {
            self.selected = total - 1;
        }
    }

    pub fn set_search(&mut self, search: String) {
        self.search = search;
        self.selected = 0;
        self.recompute();
    }

    pub fn cycle_template(&mut self) {
        let next = match self.template_idx {
            Some(idx) => (idx + 1) % TEMPLATES.len(),
            None => 0,
        };
        self.template_idx = Some(next);
        let t = &TEMPLATES[next];
        let sel = t.resolve(&self.population);
        if !sel.missing.is_empty() {
            self.push_log(format!(
                "[WARN] {}: {} metrics not in export",
                t.name,
                sel.missing.len()
            ));
        }
        self.config.metrics.clear();
        self.config.template = Some(t.name.to_string());
        self.metrics = sel.metrics;
        self.push_log(format!("[INFO] Template {}", t.name));
        self.recompute();
    }

    pub fn cycle_scope(&mut self) {
        let groups = &self.options.position_groups;
        self.scope = match self.scope {
            GroupScope::Configured => GroupScope::SameAsPlayer,
            GroupScope::SameAsPlayer => match groups.first() {
                Some(g) => GroupScope::Only(*g),
                None => GroupScope::Configured,
            },
            GroupScope::Only(current) => {
                match groups.iter().position(|g| *g == current) {
                    Some(i) if i + 1 < groups.len() => GroupScope::Only(groups[i + 1]),
                    _ => GroupScope::Configured,
                }
            }
        };
        self.recompute();
    }

    pub fn scope_label(&self) -> String {
        match self.scope {
            GroupScope::Configured => "Configured".to_string(),
            GroupScope::SameAsPlayer => "Same group".to_string(),
            GroupScope::Only(g) => g.code().to_string(),
        }
    }

    /// The configured filter with the position scope applied.
    pub fn active_filter(&self) -> SampleFilter {
        let mut filter = self.config.filter.clone();
        let groups: Option<Vec<PositionGroup>> = match self.scope {
            GroupScope::Configured => None,
            GroupScope::SameAsPlayer => Some(
                self.selected_row()
                    .and_then(|row| self.population.get(row))
                    .and_then(|e| e.position_group)
                    .into_iter()
                    .collect(),
            ),
            GroupScope::Only(g) => Some(vec![g]),
        };
        if let Some(groups) = groups {
            filter.position_groups = groups.into_iter().collect();
        }
        filter
    }

    /// Re-rank the selected player. Called after every change of input.
    pub fn recompute(&mut self) {
        self.clamp_selection();
        let Some(row) = self.selected_row() else {
            self.report = None;
            self.error = None;
            return;
        };
        let filter = self.active_filter();
        let sample = filter_sample(&self.population, &filter);
        match rank_entity(&sample, row, &self.metrics, &self.config.ranking) {
            Ok(report) => {
                self.report = Some(report);
                self.error = None;
            }
            Err(err) => {
                self.report = None;
                self.error = Some(err.to_string());
            }
        }
    }

    pub fn chart(&self) -> Option<PizzaChart> {
        let report = self.report.as_ref()?;
        let mut header = self.config.chart_header();
        header.sample_positions = self.active_filter().position_groups.into_iter().collect();
        Some(PizzaChart::from_report(report, &header, &self.config.style))
    }

    pub fn export_svg(&mut self, dir: &Path) -> Result<PathBuf> {
        let chart = self.chart().context("no player selected")?;
        let path = dir.join(format!("{}.svg", file_stem(&chart.title)));
        write_svg(&path, &chart, &self.config.style)?;
        self.push_log(format!("[INFO] Wrote {}", path.display()));
        Ok(path)
    }

    pub fn export_xlsx(&mut self, dir: &Path) -> Result<PathBuf> {
        let report = self.report.clone().context("no player selected")?;
        let path = dir.join(format!("{}.xlsx", file_stem(&report.player)));
        let filter = self.active_filter();
        let sample = filter_sample(&self.population, &filter);
        let out = sample_export::export_workbook(
            &path,
            &report,
            &sample,
            &self.metrics,
            &self.config.ranking,
        )?;
        self.push_log(format!(
            "[INFO] Wrote {} ({} sample rows)",
            path.display(),
            out.sample_rows
        ));
        Ok(path)
    }

    pub fn template_label(&self) -> &str {
        match self.template_idx {
            Some(idx) => TEMPLATES[idx].name,
            None if self.config.metrics.is_empty() => self.config.template_name(),
            None => "Custom",
        }
    }
}
