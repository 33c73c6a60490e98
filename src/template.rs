use serde::Serialize;

use crate::metric::Metric;
use crate::population::Population;
use crate::position::PositionGroup;

/// Named radar layout: axis list plus the groups it is usually compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Template {
    pub name: &'static str,
    pub metrics: &'static [Metric],
    pub compare_with: &'static [PositionGroup],
}

use Metric as M;
use PositionGroup as G;

pub const TEMPLATES: &[Template] = &[
    Template {
        name: "CB",
        metrics: &[
            M::SuccDefActions,
            M::ShotBlocked,
            M::Interceptions,
            M::Fouls,
            M::GroundDuelsWonPct,
            M::AerialDuelsWonPct,
            M::AttGroundDuels,
            M::AttAerialDuels,
            M::ProgPasses,
            M::ProgPassAccPct,
            M::ProgCarries,
            M::DribbleSuccPct,
        ],
        compare_with: &[G::CentreBack],
    },
    Template {
        name: "FB",
        metrics: &[
            M::ShorterPassAccPct,
            M::ProgPasses,
            M::ProgPassAccPct,
            M::ProgCarries,
            M::Dribbles,
            M::DribbleSuccPct,
            M::SuccDefActions,
            M::GroundDuelsWonPct,
            M::AerialDuelsWonPct,
            M::Assists,
            M::Xa,
            M::ShotsCreated,
        ],
        compare_with: &[G::FullBack],
    },
    Template {
        name: "#6",
        metrics: &[
            M::Passes,
            M::PassAccPct,
            M::DribbleSuccPct,
            M::ProgPasses,
            M::ProgPassAccPct,
            M::ProgCarries,
            M::AttGroundDuels,
            M::Interceptions,
            M::SuccDefActions,
            M::GroundDuelsWonPct,
            M::AerialDuelsWonPct,
            M::Fouls,
        ],
        compare_with: &[G::CentralMidfielder],
    },
    Template {
        name: "#8",
        metrics: &[
            M::Passes,
            M::PassAccPct,
            M::DribbleSuccPct,
            M::ProgPasses,
            M::ProgPassAccPct,
            M::ProgCarries,
            M::AttGroundDuels,
            M::Interceptions,
            M::SuccDefActions,
            M::Xg,
            M::Xa,
            M::ShotsCreated,
        ],
        compare_with: &[G::CentralMidfielder, G::AttackingMidfielder],
    },
    Template {
        name: "WF/AM",
        metrics: &[
            M::Goals,
            M::Xg,
            M::Shots,
            M::Assists,
            M::Xa,
            M::ShotsCreated,
            M::ProgPasses,
            M::ProgCarries,
            M::PassesToPa,
            M::Dribbles,
            M::DribbleSuccPct,
            M::FoulsDrawn,
        ],
        compare_with: &[G::WideMidfielder, G::AttackingMidfielder, G::WideForward],
    },
    Template {
        name: "CF",
        metrics: &[
            M::Goals,
            M::Xg,
            M::NpgMinusXg,
            M::Assists,
            M::Xa,
            M::PassesToPa,
            M::LongPassesReceived,
            M::AerialDuelsWon,
            M::DribbleSuccPct,
            M::AttGroundDuels,
            M::Interceptions,
            M::SuccDefActions,
        ],
        compare_with: &[G::CentreForward],
    },
    // Target-man profile; xG stands in for non-penalty xG, which exports do not carry.
    Template {
        name: "CF preset",
        metrics: &[
            M::Accelerations,
            M::OffensiveDuels,
            M::ProgCarries,
            M::AttAerialDuels,
            M::AerialDuelsWonPct,
            M::FoulsDrawn,
            M::LongPassesReceived,
            M::PassesReceived,
            M::ShorterPassAccPct,
            M::DribbleSuccPct,
            M::SuccDefActions,
            M::AttGroundDuels,
            M::Xg,
            M::Goals,
            M::Shots,
        ],
        compare_with: &[G::CentreForward],
    },
];

pub fn find(name: &str) -> Option<&'static Template> {
    let name = name.trim();
    TEMPLATES.iter().find(|t| t.name.eq_ignore_ascii_case(name))
}

/// Template axes split by whether the population can rank them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateSelection {
    pub metrics: Vec<Metric>,
    pub missing: Vec<Metric>,
}

impl Template {
    pub fn resolve(&self, population: &Population) -> TemplateSelection {
        let (metrics, missing) = self
            .metrics
            .iter()
            .copied()
            .partition(|m| population.has_metric(*m));
        TemplateSelection { metrics, missing }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::validate_selection;
    use crate::population::Entity;

    #[test]
    fn every_template_is_a_valid_selection() {
        for t in TEMPLATES {
            assert!(validate_selection(t.metrics).is_ok(), "{}", t.name);
            assert!(!t.compare_with.is_empty());
        }
    }

    #[test]
    fn lookup_ignores_case() {
        assert_eq!(find("wf/am").map(|t| t.name), Some("WF/AM"));
        assert_eq!(find(" cf ").map(|t| t.name), Some("CF"));
        assert!(find("GK").is_none());
    }

    #[test]
    fn missing_metrics_are_reported_in_order() {
        let mut e = Entity::new("A");
        e.metrics.insert(Metric::Xg, 0.3);
        e.metrics.insert(Metric::Goals, 0.2);
        let pop = Population::from_entities(vec![e]);
        let sel = find("CF").unwrap().resolve(&pop);
        assert_eq!(sel.metrics, vec![Metric::Goals, Metric::Xg]);
        assert_eq!(sel.missing.len(), 10);
        assert_eq!(sel.missing[0], Metric::NpgMinusXg);
    }
}
