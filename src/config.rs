use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ingest::HeaderStyle;
use crate::metric::{LowerIsBetter, Metric};
use crate::percentile::RankOptions;
use crate::pizza::{ChartHeader, ChartStyle};
use crate::population::Population;
use crate::sample_filter::SampleFilter;
use crate::template;

pub const DEFAULT_CONFIG_FILE: &str = "pizza_radar.json";
pub const DEFAULT_TEMPLATE: &str = "CF";

/// Caller-owned session configuration, passed into every core call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarConfig {
    pub data_path: Option<PathBuf>,
    pub header_style: HeaderStyle,
    pub filter: SampleFilter,
    /// Explicit axes; when empty the template decides.
    pub metrics: Vec<Metric>,
    pub template: Option<String>,
    pub ranking: RankOptions,
    pub style: ChartStyle,
    pub season: String,
}

impl RadarConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parse config {}", path.display()))
    }

    /// `.env.local`, `.env`, then the JSON file named by `PIZZA_CONFIG` (or the
    /// default file if present), then environment overrides.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");

        let path = env::var("PIZZA_CONFIG")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        let mut cfg = match path {
            Some(path) => Self::load(&path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::load(default)?
                } else {
                    Self::default()
                }
            }
        };
        for msg in cfg.apply_overrides(|key| env::var(key).ok()) {
            warn!("{msg}");
        }
        Ok(cfg)
    }

    /// Apply `PIZZA_*` overrides from `lookup`; returns a message per ignored value.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
        let mut ignored = Vec::new();
        if let Some(path) = lookup("PIZZA_DATA").filter(|v| !v.trim().is_empty()) {
            self.data_path = Some(PathBuf::from(path.trim()));
        }
        if let Some(raw) = lookup("PIZZA_MIN_MINUTES") {
            match raw.trim().parse::<u32>() {
                Ok(min) => self.filter.min_minutes = Some(min),
                Err(_) => ignored.push(format!("PIZZA_MIN_MINUTES: `{raw}` is not a number")),
            }
        }
        if let Some(raw) = lookup("PIZZA_LOWER_IS_BETTER") {
            let (set, unknown): (LowerIsBetter, Vec<String>) = LowerIsBetter::parse_list(&raw);
            for name in unknown {
                ignored.push(format!("PIZZA_LOWER_IS_BETTER: unknown metric `{name}`"));
            }
            self.ranking.lower_is_better = set;
        }
        if let Some(name) = lookup("PIZZA_TEMPLATE").filter(|v| !v.trim().is_empty()) {
            self.template = Some(name.trim().to_string());
        }
        ignored
    }

    /// Write atomically through a sibling temp file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self).context("serialize radar config")?;
        fs::write(&tmp, json).context("write radar config")?;
        fs::rename(&tmp, path).context("swap radar config")?;
        Ok(())
    }

    pub fn template_name(&self) -> &str {
        self.template.as_deref().unwrap_or(DEFAULT_TEMPLATE)
    }

    /// Axes for this session: the explicit list, else the template's metrics that
    /// the population carries. Missing template metrics are logged.
    pub fn resolve_metrics(&self, population: &Population) -> Vec<Metric> {
        if !self.metrics.is_empty() {
            return self.metrics.clone();
        }
        let Some(t) = template::find(self.template_name()) else {
            warn!(template = self.template_name(), "unknown template; no metrics selected");
            return Vec::new();
        };
        let sel = t.resolve(population);
        if !sel.missing.is_empty() {
            let names: Vec<&str> = sel.missing.iter().map(|m| m.label()).collect();
            warn!(template = t.name, missing = %names.join(", "), "template metrics absent from export");
        }
        sel.metrics
    }

    pub fn chart_header(&self) -> ChartHeader {
        ChartHeader {
            season: self.season.clone(),
            competition: None,
            sample_positions: self.filter.position_groups.iter().copied().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::percentile::TieMethod;
    use crate::position::PositionGroup;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_fields_default() {
        let cfg: RadarConfig = serde_json::from_str(r#"{"season": "25/26"}"#).unwrap();
        assert_eq!(cfg.season, "25/26");
        assert!(cfg.filter.is_unconstrained());
        assert_eq!(cfg.ranking.tie_method, TieMethod::Weak);
        assert!(cfg.ranking.lower_is_better.is_empty());
        assert_eq!(cfg.template_name(), "CF");
    }

    #[test]
    fn file_values_parse() {
        let raw = r#"{
            "filter": {"position_groups": ["CB", "FB"], "min_minutes": 900, "age_range": {"min": 18, "max": 25}},
            "metrics": ["Interceptions", "Aerial duels won, %"],
            "ranking": {"tie_method": "mean", "lower_is_better": ["Fouls"]},
            "style": {"scheme": {"kind": "performance", "gradient": "ocean"}}
        }"#;
        let cfg: RadarConfig = serde_json::from_str(raw).unwrap();
        assert!(cfg.filter.position_groups.contains(&PositionGroup::FullBack));
        assert_eq!(cfg.filter.min_minutes, Some(900));
        assert_eq!(cfg.metrics, vec![Metric::Interceptions, Metric::AerialDuelsWonPct]);
        assert_eq!(cfg.ranking.tie_method, TieMethod::Mean);
        assert!(cfg.ranking.lower_is_better.contains(Metric::Fouls));
        assert_eq!(cfg.style.width, 700);
    }

    #[test]
    fn environment_overrides_file() {
        let mut cfg = RadarConfig::default();
        let ignored = cfg.apply_overrides(lookup(&[
            ("PIZZA_DATA", "data/export.csv"),
            ("PIZZA_MIN_MINUTES", "many"),
            ("PIZZA_LOWER_IS_BETTER", "Red cards, Turnovers"),
            ("PIZZA_TEMPLATE", "#6"),
        ]));
        assert_eq!(cfg.data_path, Some(PathBuf::from("data/export.csv")));
        assert_eq!(cfg.filter.min_minutes, None);
        assert!(cfg.ranking.lower_is_better.contains(Metric::RedCards));
        assert_eq!(cfg.template_name(), "#6");
        assert_eq!(ignored.len(), 2);
    }

    #[test]
    fn template_metrics_fill_an_empty_selection() {
        let mut e = crate::population::Entity::new("A");
        e.metrics.insert(Metric::Goals, 0.5);
        e.metrics.insert(Metric::Shots, 2.0);
        let pop = Population::from_entities(vec![e]);
        let cfg = RadarConfig {
            template: Some("WF/AM".into()),
            ..RadarConfig::default()
        };
        assert_eq!(cfg.resolve_metrics(&pop), vec![Metric::Goals, Metric::Shots]);
        let cfg = RadarConfig {
            metrics: vec![Metric::Xa],
            ..cfg
        };
        assert_eq!(cfg.resolve_metrics(&pop), vec![Metric::Xa]);
    }
}
