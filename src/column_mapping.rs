use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Wyscout export header → canonical column name.
///
/// Identity and profile columns map onto themselves so a header is either known
/// or reported as unmapped.
const WYSCOUT_COLUMNS: &[(&str, &str)] = &[
    ("Player", "Player"),
    ("Team", "Team"),
    ("Team within selected timeframe", "Team within selected timeframe"),
    ("Position", "Position"),
    ("Position_Group", "Position_Group"),
    ("Competition", "Competition"),
    ("Age", "Age"),
    ("Market value", "Market value"),
    ("Contract expires", "Contract expires"),
    ("Matches played", "Matches played"),
    ("Minutes played", "Minutes played"),
    ("Birth country", "Birth country"),
    ("Passport country", "Passport country"),
    ("Foot", "Foot"),
    ("Height", "Height"),
    ("Weight", "Weight"),
    ("On loan", "On loan"),
    // Goals & assists (season totals)
    ("Goals", "Total Goals"),
    ("xG", "Total xG"),
    ("Assists", "Total Assists"),
    ("xA", "Total xA"),
    // Duels
    ("Duels per 90", "Combined Duels"),
    ("Duels won, %", "Combined Duels Won %"),
    // Defensive actions
    ("Successful defensive actions per 90", "Succ. Def. Actions"),
    ("Defensive duels per 90", "Att. Ground Duels"),
    ("Defensive duels won, %", "Ground Duels Won %"),
    ("Aerial duels per 90", "Att. Aerial Duels"),
    ("Aerial duels won, %", "Aerial Duels Won %"),
    ("Sliding tackles per 90", "Slide Tackles"),
    ("PAdj Sliding tackles", "PAdj Sliding Tackles"),
    ("Shots blocked per 90", "Shot Blocked"),
    ("Interceptions per 90", "Interceptions"),
    ("PAdj Interceptions", "PAdj Interceptions"),
    // Discipline
    ("Fouls per 90", "Fouls"),
    ("Yellow cards", "Total Yellow cards"),
    ("Yellow cards per 90", "Yellow cards"),
    ("Red cards", "Total Red cards"),
    ("Red cards per 90", "Red cards"),
    // Attacking actions
    ("Successful attacking actions per 90", "Succ. Attacking Actions"),
    ("Goals per 90", "Goals"),
    ("Non-penalty goals", "Total Non-Pen. Goals"),
    ("Non-penalty goals per 90", "Non-Pen. Goals"),
    ("xG per 90", "xG"),
    ("Head goals", "Total Headed Goals"),
    ("Head goals per 90", "Headed Goals"),
    // Shooting
    ("Shots", "Total Shots"),
    ("Shots per 90", "Shots"),
    ("Shots on target, %", "Shots on Target %"),
    ("Goal conversion, %", "Goal Conversion %"),
    // Crossing
    ("Assists per 90", "Assists"),
    ("Crosses per 90", "Crosses"),
    ("Accurate crosses, %", "Cross Acc. %"),
    ("Crosses from left flank per 90", "Left Flank Crosses"),
    ("Accurate crosses from left flank, %", "Left Flank Cross Acc. %"),
    ("Crosses from right flank per 90", "Right Flank Crosses"),
    ("Accurate crosses from right flank, %", "Right Flank Cross Acc. %"),
    ("Crosses to goalie box per 90", "Crosses to PA"),
    // Dribbling & carrying
    ("Dribbles per 90", "Dribbles"),
    ("Successful dribbles, %", "Dribble Succ. %"),
    ("Offensive duels per 90", "Offensive Duels"),
    ("Offensive duels won, %", "Offensive Duels Won %"),
    ("Touches in box per 90", "Touches in PA"),
    ("Progressive runs per 90", "Prog. Carries"),
    ("Accelerations per 90", "Accelerations"),
    // Receiving
    ("Received passes per 90", "Passes Received"),
    ("Received long passes per 90", "Long Passes Received"),
    ("Fouls suffered per 90", "Fouls Drawn"),
    // Passing
    ("Passes per 90", "Passes"),
    ("Accurate passes, %", "Pass Acc. %"),
    ("Forward passes per 90", "Forward Passes"),
    ("Accurate forward passes, %", "Forward Pass Acc. %"),
    ("Back passes per 90", "Back Passes"),
    ("Accurate back passes, %", "Back Pass Acc. %"),
    ("Lateral passes per 90", "Lateral Passes"),
    ("Accurate lateral passes, %", "Lateral Pass Acc. %"),
    ("Short / medium passes per 90", "Shorter Passes"),
    ("Accurate short / medium passes, %", "Shorter Pass Acc. %"),
    ("Long passes per 90", "Long Passes"),
    ("Accurate long passes, %", "Long Pass Acc. %"),
    ("Average pass length, m", "Avg Pass Length (m)"),
    ("Average long pass length, m", "Avg Long Pass Length (m)"),
    // Creative passing
    ("xA per 90", "xA"),
    ("Shot assists per 90", "Shot assists"),
    ("Second assists per 90", "Second assists"),
    ("Third assists per 90", "Third assists"),
    ("Smart passes per 90", "Smart passes"),
    ("Accurate smart passes, %", "Smart Pass Acc. %"),
    ("Key passes per 90", "Shots Created"),
    ("Passes to final third per 90", "Passes to F3"),
    ("Accurate passes to final third, %", "Pass to F3 Acc. %"),
    ("Passes to penalty area per 90", "Passes to PA"),
    ("Accurate passes to penalty area, %", "Passes to PA Acc. %"),
    ("Through passes per 90", "Through Balls"),
    ("Accurate through passes, %", "Through Ball Acc. %"),
    ("Deep completions per 90", "Deep Completions"),
    ("Deep completed crosses per 90", "Deep Crosses"),
    ("Progressive passes per 90", "Prog. Passes"),
    ("Accurate progressive passes, %", "Prog. Pass Acc. %"),
    // Goalkeeping
    ("Conceded goals", "Total Conceded goals"),
    ("Conceded goals per 90", "Conceded Goals"),
    ("Shots against", "Total Shots Faced"),
    ("Shots against per 90", "Shots Faced"),
    ("Clean sheets", "Clean Sheets"),
    ("Save rate, %", "Save %"),
    ("xG against", "Total xG Faced"),
    ("xG against per 90", "xG Faced"),
    ("Prevented goals", "Total Prevented Goals"),
    ("Prevented goals per 90", "Prevented Goals"),
    ("Back passes received as GK per 90", "Rec. Back Passes"),
    ("Exits per 90", "Exits"),
    // Set pieces
    ("Free kicks per 90", "Free kicks per 90"),
    ("Direct free kicks per 90", "Direct free kicks per 90"),
    ("Direct free kicks on target, %", "Direct free kicks on target, %"),
    ("Corners per 90", "Corners per 90"),
    ("Penalties taken", "Penalties taken"),
    ("Penalty conversion, %", "Penalty conversion, %"),
];

static MAPPING: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| WYSCOUT_COLUMNS.iter().copied().collect());

/// Canonical name for a vendor header, if the header is known.
pub fn canonical_name(source: &str) -> Option<&'static str> {
    MAPPING.get(source).copied()
}

/// True when the header is already a canonical name (a pre-remapped export).
pub fn is_canonical(name: &str) -> bool {
    WYSCOUT_COLUMNS.iter().any(|(_, canonical)| *canonical == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::Metric;

    #[test]
    fn per90_and_total_columns_are_distinguished() {
        assert_eq!(canonical_name("Goals"), Some("Total Goals"));
        assert_eq!(canonical_name("Goals per 90"), Some("Goals"));
        assert_eq!(canonical_name("Unknown column"), None);
    }

    #[test]
    fn every_mapped_metric_name_is_in_the_schema() {
        let identity = [
            "Player",
            "Team",
            "Team within selected timeframe",
            "Position",
            "Position_Group",
            "Competition",
            "Age",
            "Contract expires",
            "Minutes played",
            "Birth country",
            "Passport country",
            "Foot",
            "On loan",
        ];
        for (_, canonical) in WYSCOUT_COLUMNS {
            if identity.contains(canonical) {
                continue;
            }
            assert!(
                Metric::from_canonical(canonical).is_some(),
                "{canonical} has no Metric"
            );
        }
    }
}
