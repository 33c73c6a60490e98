use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::column_mapping;

/// Fewest axes a radar needs to read as a profile rather than a bar chart.
pub const MIN_RADAR_METRICS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetricCategory {
    Finishing,
    Creating,
    Passing,
    Progression,
    Dribbling,
    Defending,
    Duels,
    Crossing,
    Discipline,
    Goalkeeping,
    SetPieces,
    Profile,
}

impl MetricCategory {
    pub const ALL: [MetricCategory; 12] = [
        MetricCategory::Finishing,
        MetricCategory::Creating,
        MetricCategory::Passing,
        MetricCategory::Progression,
        MetricCategory::Dribbling,
        MetricCategory::Defending,
        MetricCategory::Duels,
        MetricCategory::Crossing,
        MetricCategory::Discipline,
        MetricCategory::Goalkeeping,
        MetricCategory::SetPieces,
        MetricCategory::Profile,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MetricCategory::Finishing => "Finishing",
            MetricCategory::Creating => "Creating",
            MetricCategory::Passing => "Passing",
            MetricCategory::Progression => "Progression",
            MetricCategory::Dribbling => "Dribbling",
            MetricCategory::Defending => "Defending",
            MetricCategory::Duels => "Duels",
            MetricCategory::Crossing => "Crossing",
            MetricCategory::Discipline => "Discipline",
            MetricCategory::Goalkeeping => "Goalkeeping",
            MetricCategory::SetPieces => "Set Pieces",
            MetricCategory::Profile => "Profile",
        }
    }
}

/// How a metric's raw value is normalised in the export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    Per90,
    SeasonTotal,
    Percentage,
    Ratio,
    Profile,
}

macro_rules! metric_table {
    ($($variant:ident => $label:literal, $category:ident, $kind:ident;)+) => {
        /// Canonical metric identifiers recognised by the ranking engine.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Metric {
            $($variant,)+
        }

        impl Metric {
            pub const ALL: &'static [Metric] = &[$(Metric::$variant,)+];

            /// Canonical column name, as it appears after remapping.
            pub fn label(self) -> &'static str {
                match self {
                    $(Metric::$variant => $label,)+
                }
            }

            pub fn category(self) -> MetricCategory {
                match self {
                    $(Metric::$variant => MetricCategory::$category,)+
                }
            }

            pub fn kind(self) -> MetricKind {
                match self {
                    $(Metric::$variant => MetricKind::$kind,)+
                }
            }
        }
    };
}

metric_table! {
    MatchesPlayed => "Matches played", Profile, Profile;
    MarketValue => "Market value", Profile, Profile;
    Height => "Height", Profile, Profile;
    Weight => "Weight", Profile, Profile;

    SuccAttackingActions => "Succ. Attacking Actions", Finishing, Per90;
    Goals => "Goals", Finishing, Per90;
    TotalGoals => "Total Goals", Finishing, SeasonTotal;
    NonPenGoals => "Non-Pen. Goals", Finishing, Per90;
    TotalNonPenGoals => "Total Non-Pen. Goals", Finishing, SeasonTotal;
    Xg => "xG", Finishing, Per90;
    TotalXg => "Total xG", Finishing, SeasonTotal;
    HeadedGoals => "Headed Goals", Finishing, Per90;
    TotalHeadedGoals => "Total Headed Goals", Finishing, SeasonTotal;
    Shots => "Shots", Finishing, Per90;
    TotalShots => "Total Shots", Finishing, SeasonTotal;
    ShotsOnTargetPct => "Shots on Target %", Finishing, Percentage;
    GoalConversionPct => "Goal Conversion %", Finishing, Percentage;
    XgPerShot => "xG per Shot", Finishing, Ratio;
    NpgMinusXg => "NPG-xG", Finishing, SeasonTotal;

    Assists => "Assists", Creating, Per90;
    TotalAssists => "Total Assists", Creating, SeasonTotal;
    Xa => "xA", Creating, Per90;
    TotalXa => "Total xA", Creating, SeasonTotal;
    ShotsCreated => "Shots Created", Creating, Per90;
    ShotAssists => "Shot assists", Creating, Per90;
    SecondAssists => "Second assists", Creating, Per90;
    ThirdAssists => "Third assists", Creating, Per90;
    SmartPasses => "Smart passes", Creating, Per90;
    SmartPassAccPct => "Smart Pass Acc. %", Creating, Percentage;

    Passes => "Passes", Passing, Per90;
    PassAccPct => "Pass Acc. %", Passing, Percentage;
    ForwardPasses => "Forward Passes", Passing, Per90;
    ForwardPassAccPct => "Forward Pass Acc. %", Passing, Percentage;
    BackPasses => "Back Passes", Passing, Per90;
    BackPassAccPct => "Back Pass Acc. %", Passing, Percentage;
    LateralPasses => "Lateral Passes", Passing, Per90;
    LateralPassAccPct => "Lateral Pass Acc. %", Passing, Percentage;
    ShorterPasses => "Shorter Passes", Passing, Per90;
    ShorterPassAccPct => "Shorter Pass Acc. %", Passing, Percentage;
    LongPasses => "Long Passes", Passing, Per90;
    LongPassAccPct => "Long Pass Acc. %", Passing, Percentage;
    AvgPassLength => "Avg Pass Length (m)", Passing, Ratio;
    AvgLongPassLength => "Avg Long Pass Length (m)", Passing, Ratio;
    PassesReceived => "Passes Received", Passing, Per90;
    LongPassesReceived => "Long Passes Received", Passing, Per90;

    ProgPasses => "Prog. Passes", Progression, Per90;
    ProgPassAccPct => "Prog. Pass Acc. %", Progression, Percentage;
    EfxProgPasses => "EFx Prog. Pass", Progression, Per90;
    ProgCarries => "Prog. Carries", Progression, Per90;
    DeepCompletions => "Deep Completions", Progression, Per90;
    PassesToF3 => "Passes to F3", Progression, Per90;
    PassToF3AccPct => "Pass to F3 Acc. %", Progression, Percentage;
    PassesToPa => "Passes to PA", Progression, Per90;
    PassesToPaAccPct => "Passes to PA Acc. %", Progression, Percentage;
    ThroughBalls => "Through Balls", Progression, Per90;
    ThroughBallAccPct => "Through Ball Acc. %", Progression, Percentage;

    Dribbles => "Dribbles", Dribbling, Per90;
    DribbleSuccPct => "Dribble Succ. %", Dribbling, Percentage;
    Accelerations => "Accelerations", Dribbling, Per90;
    FoulsDrawn => "Fouls Drawn", Dribbling, Per90;
    TouchesInPa => "Touches in PA", Dribbling, Per90;

    SuccDefActions => "Succ. Def. Actions", Defending, Per90;
    Interceptions => "Interceptions", Defending, Per90;
    PadjInterceptions => "PAdj Interceptions", Defending, Per90;
    ShotBlocked => "Shot Blocked", Defending, Per90;
    SlideTackles => "Slide Tackles", Defending, Per90;
    PadjSlidingTackles => "PAdj Sliding Tackles", Defending, Per90;

    CombinedDuels => "Combined Duels", Duels, Per90;
    CombinedDuelsWonPct => "Combined Duels Won %", Duels, Percentage;
    AttGroundDuels => "Att. Ground Duels", Duels, Per90;
    GroundDuelsWonPct => "Ground Duels Won %", Duels, Percentage;
    GroundDuelsWon => "Ground Duels Won", Duels, Per90;
    AttAerialDuels => "Att. Aerial Duels", Duels, Per90;
    AerialDuelsWonPct => "Aerial Duels Won %", Duels, Percentage;
    AerialDuelsWon => "Aerial Duels Won", Duels, Per90;
    OffensiveDuels => "Offensive Duels", Duels, Per90;
    OffensiveDuelsWonPct => "Offensive Duels Won %", Duels, Percentage;
    TotalDuelsWon => "Total Duels Won", Duels, Per90;
    TotalDuelPct => "Total Duel %", Duels, Percentage;
    DuelsContested => "Duels Contested", Duels, Per90;

    Crosses => "Crosses", Crossing, Per90;
    CrossAccPct => "Cross Acc. %", Crossing, Percentage;
    LeftFlankCrosses => "Left Flank Crosses", Crossing, Per90;
    LeftFlankCrossAccPct => "Left Flank Cross Acc. %", Crossing, Percentage;
    RightFlankCrosses => "Right Flank Crosses", Crossing, Per90;
    RightFlankCrossAccPct => "Right Flank Cross Acc. %", Crossing, Percentage;
    CrossesToPa => "Crosses to PA", Crossing, Per90;
    DeepCrosses => "Deep Crosses", Crossing, Per90;

    Fouls => "Fouls", Discipline, Per90;
    YellowCards => "Yellow cards", Discipline, Per90;
    TotalYellowCards => "Total Yellow cards", Discipline, SeasonTotal;
    RedCards => "Red cards", Discipline, Per90;
    TotalRedCards => "Total Red cards", Discipline, SeasonTotal;

    ConcededGoals => "Conceded Goals", Goalkeeping, Per90;
    TotalConcededGoals => "Total Conceded goals", Goalkeeping, SeasonTotal;
    ShotsFaced => "Shots Faced", Goalkeeping, Per90;
    TotalShotsFaced => "Total Shots Faced", Goalkeeping, SeasonTotal;
    CleanSheets => "Clean Sheets", Goalkeeping, SeasonTotal;
    SavePct => "Save %", Goalkeeping, Percentage;
    XgFaced => "xG Faced", Goalkeeping, Per90;
    TotalXgFaced => "Total xG Faced", Goalkeeping, SeasonTotal;
    PreventedGoals => "Prevented Goals", Goalkeeping, Per90;
    TotalPreventedGoals => "Total Prevented Goals", Goalkeeping, SeasonTotal;
    RecBackPasses => "Rec. Back Passes", Goalkeeping, Per90;
    Exits => "Exits", Goalkeeping, Per90;

    FreeKicks => "Free kicks per 90", SetPieces, Per90;
    DirectFreeKicks => "Direct free kicks per 90", SetPieces, Per90;
    DirectFreeKicksOnTargetPct => "Direct free kicks on target, %", SetPieces, Percentage;
    Corners => "Corners per 90", SetPieces, Per90;
    PenaltiesTaken => "Penalties taken", SetPieces, SeasonTotal;
    PenaltyConversionPct => "Penalty conversion, %", SetPieces, Percentage;
}

static BY_LABEL: Lazy<HashMap<String, Metric>> = Lazy::new(|| {
    Metric::ALL
        .iter()
        .map(|m| (m.label().to_lowercase(), *m))
        .collect()
});

impl Metric {
    /// Exact (case-insensitive) canonical label lookup, no vendor fallback.
    pub fn from_canonical(label: &str) -> Option<Metric> {
        BY_LABEL.get(&label.trim().to_lowercase()).copied()
    }

    /// Resolve a canonical label, falling back to the vendor column name.
    pub fn from_label(raw: &str) -> Option<Metric> {
        let key = raw.trim().to_lowercase();
        if let Some(m) = BY_LABEL.get(&key) {
            return Some(*m);
        }
        let canonical = column_mapping::canonical_name(raw.trim())?;
        BY_LABEL.get(&canonical.to_lowercase()).copied()
    }

    pub fn is_season_total(self) -> bool {
        self.kind() == MetricKind::SeasonTotal
    }

    /// Profile columns are numeric but never offered as radar axes.
    pub fn is_rankable(self) -> bool {
        self.kind() != MetricKind::Profile
    }

    pub fn in_category(category: MetricCategory) -> impl Iterator<Item = Metric> {
        Metric::ALL
            .iter()
            .copied()
            .filter(move |m| m.category() == category)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Metric {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Metric::from_label(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown metric `{raw}`")))
    }
}

/// Metrics whose percentile is inverted (smaller raw value ranks higher).
///
/// Membership is configuration: exports disagree on which disciplinary
/// columns belong here, so nothing is assumed by default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LowerIsBetter(BTreeSet<Metric>);

impl LowerIsBetter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, metric: Metric) -> bool {
        self.0.contains(&metric)
    }

    pub fn insert(&mut self, metric: Metric) -> bool {
        self.0.insert(metric)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Metric> + '_ {
        self.0.iter().copied()
    }

    /// Parse a comma-separated list of metric labels. Unknown labels are returned
    /// separately so the caller can report them.
    pub fn parse_list(raw: &str) -> (Self, Vec<String>) {
        let mut out = Self::default();
        let mut unknown = Vec::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match Metric::from_label(part) {
                Some(m) => {
                    out.insert(m);
                }
                None => unknown.push(part.to_string()),
            }
        }
        (out, unknown)
    }
}

impl FromIterator<Metric> for LowerIsBetter {
    fn from_iter<I: IntoIterator<Item = Metric>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("select at least {min} metrics for a radar (got {got})")]
    TooFew { min: usize, got: usize },
    #[error("metric `{0}` selected more than once")]
    Duplicate(Metric),
}

/// Caller-side check on a radar's axis list. The ranker itself accepts any list.
pub fn validate_selection(metrics: &[Metric]) -> Result<(), SelectionError> {
    let mut seen = HashSet::new();
    for m in metrics {
        if !seen.insert(*m) {
            return Err(SelectionError::Duplicate(*m));
        }
    }
    if metrics.len() < MIN_RADAR_METRICS {
        return Err(SelectionError::TooFew {
            min: MIN_RADAR_METRICS,
            got: metrics.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_unique() {
        let labels: HashSet<String> = Metric::ALL.iter().map(|m| m.label().to_lowercase()).collect();
        assert_eq!(labels.len(), Metric::ALL.len());
    }

    #[test]
    fn from_label_accepts_canonical_and_vendor_names() {
        assert_eq!(Metric::from_label("Prog. Passes"), Some(Metric::ProgPasses));
        assert_eq!(Metric::from_label("  prog. passes "), Some(Metric::ProgPasses));
        assert_eq!(
            Metric::from_label("Progressive passes per 90"),
            Some(Metric::ProgPasses)
        );
        assert_eq!(Metric::from_label("Dispossessed"), None);
    }

    #[test]
    fn season_totals_are_marked() {
        assert!(Metric::TotalGoals.is_season_total());
        assert!(!Metric::Goals.is_season_total());
        assert!(!Metric::Height.is_rankable());
    }

    #[test]
    fn lower_is_better_parses_and_reports_unknown() {
        let (set, unknown) = LowerIsBetter::parse_list("Fouls, Red cards,Dispossessed,");
        assert!(set.contains(Metric::Fouls));
        assert!(set.contains(Metric::RedCards));
        assert_eq!(set.len(), 2);
        assert_eq!(unknown, vec!["Dispossessed".to_string()]);
    }

    #[test]
    fn metric_serializes_as_label() {
        let json = serde_json::to_string(&vec![Metric::Xg, Metric::SavePct]).unwrap();
        assert_eq!(json, r#"["xG","Save %"]"#);
        let back: Vec<Metric> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![Metric::Xg, Metric::SavePct]);
    }

    #[test]
    fn selection_needs_six_distinct_metrics() {
        let five = [
            Metric::Goals,
            Metric::Xg,
            Metric::Shots,
            Metric::Assists,
            Metric::Xa,
        ];
        assert_eq!(
            validate_selection(&five),
            Err(SelectionError::TooFew { min: 6, got: 5 })
        );
        let mut six = five.to_vec();
        six.push(Metric::Dribbles);
        assert!(validate_selection(&six).is_ok());
        six.push(Metric::Goals);
        assert_eq!(validate_selection(&six), Err(SelectionError::Duplicate(Metric::Goals)));
    }
}
