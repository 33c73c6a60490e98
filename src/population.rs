use std::collections::{BTreeSet, HashMap};
use std::fmt;

use thiserror::Error;

use crate::metric::Metric;
use crate::position::PositionGroup;

/// Non-metric columns the sample filter and identity resolution rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Attribute {
    Team,
    Position,
    PositionGroup,
    Competition,
    Age,
    MinutesPlayed,
}

/// One player-team-period row of an export.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub name: String,
    pub team: Option<String>,
    pub position: Option<String>,
    pub position_group: Option<PositionGroup>,
    pub competition: Option<String>,
    pub age: Option<u32>,
    pub minutes_played: Option<u32>,
    pub metrics: HashMap<Metric, f64>,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            team: None,
            position: None,
            position_group: None,
            competition: None,
            age: None,
            minutes_played: None,
            metrics: HashMap::new(),
        }
    }

    /// Finite metric value, or `None` when the cell was empty or never exported.
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        self.metrics.get(&metric).copied().filter(|v| v.is_finite())
    }

    /// "Name - Team", the compound label shown in player pickers.
    pub fn display_label(&self) -> String {
        match &self.team {
            Some(team) => format!("{} - {}", self.name, team),
            None => self.name.clone(),
        }
    }
}

/// Read-only table of entities loaded once per session.
#[derive(Debug, Clone, Default)]
pub struct Population {
    entities: Vec<Entity>,
    attributes: BTreeSet<Attribute>,
    metrics: BTreeSet<Metric>,
}

impl Population {
    pub fn new(
        entities: Vec<Entity>,
        attributes: BTreeSet<Attribute>,
        metrics: BTreeSet<Metric>,
    ) -> Self {
        Self {
            entities,
            attributes,
            metrics,
        }
    }

    /// Build a population whose schema is whatever the entities carry.
    pub fn from_entities(entities: Vec<Entity>) -> Self {
        let mut attributes = BTreeSet::new();
        let mut metrics = BTreeSet::new();
        for e in &entities {
            if e.team.is_some() {
                attributes.insert(Attribute::Team);
            }
            if e.position.is_some() {
                attributes.insert(Attribute::Position);
            }
            if e.position_group.is_some() {
                attributes.insert(Attribute::PositionGroup);
            }
            if e.competition.is_some() {
                attributes.insert(Attribute::Competition);
            }
            if e.age.is_some() {
                attributes.insert(Attribute::Age);
            }
            if e.minutes_played.is_some() {
                attributes.insert(Attribute::MinutesPlayed);
            }
            metrics.extend(e.metrics.keys().copied());
        }
        Self::new(entities, attributes, metrics)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn get(&self, row: usize) -> Option<&Entity> {
        self.entities.get(row)
    }

    pub fn has_attribute(&self, attribute: Attribute) -> bool {
        self.attributes.contains(&attribute)
    }

    pub fn has_metric(&self, metric: Metric) -> bool {
        self.metrics.contains(&metric)
    }

    pub fn metrics(&self) -> impl Iterator<Item = Metric> + '_ {
        self.metrics.iter().copied()
    }

    /// Metrics offered as radar axes, in label order.
    pub fn available_metrics(&self) -> Vec<Metric> {
        let mut out: Vec<Metric> = self.metrics().filter(|m| m.is_rankable()).collect();
        out.sort_by_key(|m| m.label());
        out
    }

    /// Resolve a query to exactly one row.
    pub fn resolve(&self, query: &PlayerQuery) -> Result<usize, ResolveError> {
        match query {
            PlayerQuery::Row(row) => {
                if *row < self.entities.len() {
                    Ok(*row)
                } else {
                    Err(ResolveError::RowOutOfRange {
                        row: *row,
                        len: self.entities.len(),
                    })
                }
            }
            PlayerQuery::Name(name) => {
                let name = name.trim();
                let hits: Vec<usize> = self
                    .entities
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.name == name)
                    .map(|(idx, _)| idx)
                    .collect();
                match hits.as_slice() {
                    [] => Err(ResolveError::NotFound {
                        query: query.to_string(),
                    }),
                    [only] => Ok(*only),
                    many => Err(ResolveError::Ambiguous {
                        query: query.to_string(),
                        candidates: many
                            .iter()
                            .map(|idx| self.entities[*idx].display_label())
                            .collect(),
                    }),
                }
            }
            PlayerQuery::NameTeam { name, team } => {
                let (name, team) = (name.trim(), team.trim());
                let hits: Vec<usize> = self
                    .entities
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.name == name && e.team.as_deref() == Some(team))
                    .map(|(idx, _)| idx)
                    .collect();
                match hits.as_slice() {
                    [] => Err(ResolveError::NotFound {
                        query: query.to_string(),
                    }),
                    [only] => Ok(*only),
                    many => Err(ResolveError::Ambiguous {
                        query: query.to_string(),
                        candidates: many.iter().map(|idx| format!("row {idx}")).collect(),
                    }),
                }
            }
        }
    }
}

/// How a caller names the target entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerQuery {
    Name(String),
    NameTeam { name: String, team: String },
    Row(usize),
}

impl PlayerQuery {
    pub fn new(name: &str, team: Option<&str>) -> Self {
        match team.map(str::trim).filter(|t| !t.is_empty()) {
            Some(team) => PlayerQuery::NameTeam {
                name: name.to_string(),
                team: team.to_string(),
            },
            None => PlayerQuery::Name(name.to_string()),
        }
    }
}

impl fmt::Display for PlayerQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerQuery::Name(name) => write!(f, "{name}"),
            PlayerQuery::NameTeam { name, team } => write!(f, "{name} - {team}"),
            PlayerQuery::Row(row) => write!(f, "row {row}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no player matches `{query}`")]
    NotFound { query: String },
    #[error("`{query}` matches {} rows ({}); disambiguate by team", candidates.len(), candidates.join(", "))]
    Ambiguous {
        query: String,
        candidates: Vec<String>,
    },
    #[error("row {row} is out of range (population has {len} rows)")]
    RowOutOfRange { row: usize, len: usize },
}
