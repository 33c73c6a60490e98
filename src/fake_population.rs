use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::metric::{Metric, MetricKind};
use crate::population::{Entity, Population};
use crate::position::PositionGroup;

const COMPETITIONS: &[&str] = &[
    "ENG Premier League",
    "ESP La Liga",
    "ITA Serie A",
    "GER Bundesliga",
    "FRA Ligue 1",
    "NED Eredivisie",
];

const TEAMS_PER_COMPETITION: usize = 8;

const FIRST: &[&str] = &[
    "J.", "A.", "M.", "L.", "K.", "T.", "R.", "D.", "S.", "P.", "E.", "N.",
];

const LAST: &[&str] = &[
    "Smith", "Garcia", "Rossi", "Müller", "Martin", "de Jong", "Silva", "Kane", "Moreno",
    "Bianchi", "Schmidt", "Dubois", "Bakker", "Santos", "Walker", "Fernández", "Ricci", "Weber",
];

/// Metrics the synthetic export carries, with a league-average per-90 level.
const PROFILE: &[(Metric, f64)] = &[
    (Metric::Goals, 0.18),
    (Metric::NonPenGoals, 0.16),
    (Metric::Xg, 0.17),
    (Metric::Shots, 1.4),
    (Metric::ShotsOnTargetPct, 35.0),
    (Metric::Assists, 0.12),
    (Metric::Xa, 0.11),
    (Metric::ShotsCreated, 0.9),
    (Metric::Passes, 38.0),
    (Metric::PassAccPct, 80.0),
    (Metric::ShorterPassAccPct, 86.0),
    (Metric::LongPasses, 4.0),
    (Metric::LongPassAccPct, 55.0),
    (Metric::PassesReceived, 30.0),
    (Metric::LongPassesReceived, 3.0),
    (Metric::ProgPasses, 5.5),
    (Metric::ProgPassAccPct, 70.0),
    (Metric::ProgCarries, 1.8),
    (Metric::PassesToPa, 1.2),
    (Metric::Dribbles, 2.2),
    (Metric::DribbleSuccPct, 52.0),
    (Metric::Accelerations, 1.0),
    (Metric::FoulsDrawn, 1.2),
    (Metric::SuccDefActions, 7.0),
    (Metric::Interceptions, 3.8),
    (Metric::ShotBlocked, 0.5),
    (Metric::AttGroundDuels, 6.5),
    (Metric::GroundDuelsWonPct, 60.0),
    (Metric::AttAerialDuels, 3.5),
    (Metric::AerialDuelsWonPct, 48.0),
    (Metric::OffensiveDuels, 5.0),
    (Metric::Fouls, 1.1),
    (Metric::YellowCards, 0.18),
    (Metric::RedCards, 0.01),
];

/// How strongly each group leans into a metric family, relative to average.
fn group_factor(group: PositionGroup, metric: Metric) -> f64 {
    use PositionGroup as G;
    let attacking = matches!(
        metric,
        Metric::Goals | Metric::NonPenGoals | Metric::Xg | Metric::Shots | Metric::PassesToPa
    );
    let creative = matches!(
        metric,
        Metric::Assists | Metric::Xa | Metric::ShotsCreated | Metric::Dribbles | Metric::ProgCarries
    );
    let defensive = matches!(
        metric,
        Metric::SuccDefActions
            | Metric::Interceptions
            | Metric::ShotBlocked
            | Metric::AttGroundDuels
            | Metric::AttAerialDuels
    );
    match (group, attacking, creative, defensive) {
        (G::CentreForward, true, _, _) => 2.6,
        (G::WideForward | G::AttackingMidfielder, true, _, _) => 1.7,
        (G::CentreBack | G::Goalkeeper, true, _, _) => 0.3,
        (G::WideForward | G::WideMidfielder | G::AttackingMidfielder, _, true, _) => 1.6,
        (G::CentreBack, _, true, _) => 0.4,
        (G::CentreBack | G::CentralMidfielder, _, _, true) => 1.5,
        (G::CentreForward | G::WideForward, _, _, true) => 0.6,
        _ => 1.0,
    }
}

/// Synthetic export for demos and benches; the same seed gives the same rows.
pub fn fake_population(rows: usize, seed: u64) -> Population {
    let mut rng = StdRng::seed_from_u64(seed);
    let groups = PositionGroup::ALL;
    let outfield = &groups[1..];
    let entities = (0..rows)
        .map(|idx| {
            let comp_idx = rng.gen_range(0..COMPETITIONS.len());
            let competition = COMPETITIONS[comp_idx];
            let team_no = rng.gen_range(0..TEAMS_PER_COMPETITION);
            let group = outfield[rng.gen_range(0..outfield.len())];
            let name = format!(
                "{} {}",
                FIRST[rng.gen_range(0..FIRST.len())],
                LAST[idx % LAST.len()]
            );

            let mut e = Entity::new(name);
            e.team = Some(format!("{} {}", &competition[..3], team_no + 1));
            e.position = Some(group.code().to_string());
            e.position_group = Some(group);
            e.competition = Some(competition.to_string());
            e.age = Some(rng.gen_range(17..=36));
            e.minutes_played = Some(rng.gen_range(90..=3420));
            for (metric, base) in PROFILE {
                if rng.gen_bool(0.02) {
                    continue;
                }
                let value = match metric.kind() {
                    MetricKind::Percentage => (base + rng.gen_range(-18.0..18.0)).clamp(0.0, 100.0),
                    _ => base * group_factor(group, *metric) * rng.gen_range(0.4..1.6),
                };
                e.metrics.insert(*metric, (value * 100.0).round() / 100.0);
            }
            e
        })
        .collect();
    Population::from_entities(entities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::Attribute;

    #[test]
    fn same_seed_same_rows() {
        let a = fake_population(50, 7);
        let b = fake_population(50, 7);
        assert_eq!(a.entities(), b.entities());
        assert_ne!(a.entities(), fake_population(50, 8).entities());
    }

    #[test]
    fn rows_carry_every_filter_column() {
        let pop = fake_population(200, 1);
        assert_eq!(pop.len(), 200);
        for attr in [
            Attribute::Team,
            Attribute::PositionGroup,
            Attribute::Competition,
            Attribute::Age,
            Attribute::MinutesPlayed,
        ] {
            assert!(pop.has_attribute(attr));
        }
        assert!(pop.has_metric(Metric::Xg));
        for e in pop.entities() {
            assert_ne!(e.position_group, Some(PositionGroup::Goalkeeper));
            let pct = e.metric(Metric::PassAccPct).unwrap_or(50.0);
            assert!((0.0..=100.0).contains(&pct));
        }
    }
}
