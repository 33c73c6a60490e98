use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Coarse positional bucket used to build comparison samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PositionGroup {
    #[serde(rename = "GK")]
    Goalkeeper,
    #[serde(rename = "CB")]
    CentreBack,
    #[serde(rename = "FB")]
    FullBack,
    #[serde(rename = "CM")]
    CentralMidfielder,
    #[serde(rename = "WM")]
    WideMidfielder,
    #[serde(rename = "AM")]
    AttackingMidfielder,
    #[serde(rename = "WF")]
    WideForward,
    #[serde(rename = "CF")]
    CentreForward,
}

impl PositionGroup {
    pub const ALL: [PositionGroup; 8] = [
        PositionGroup::Goalkeeper,
        PositionGroup::CentreBack,
        PositionGroup::FullBack,
        PositionGroup::CentralMidfielder,
        PositionGroup::WideMidfielder,
        PositionGroup::AttackingMidfielder,
        PositionGroup::WideForward,
        PositionGroup::CentreForward,
    ];

    pub fn code(self) -> &'static str {
        match self {
            PositionGroup::Goalkeeper => "GK",
            PositionGroup::CentreBack => "CB",
            PositionGroup::FullBack => "FB",
            PositionGroup::CentralMidfielder => "CM",
            PositionGroup::WideMidfielder => "WM",
            PositionGroup::AttackingMidfielder => "AM",
            PositionGroup::WideForward => "WF",
            PositionGroup::CentreForward => "CF",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        PositionGroup::ALL
            .into_iter()
            .find(|g| g.code().eq_ignore_ascii_case(code))
    }

    /// Assign a group from a detailed position string.
    ///
    /// Wyscout lists positions most-played first (`"LAMF, LW, CF"`), so only the
    /// first entry decides. Long-form names (`"Centre-Back"`) are accepted too.
    pub fn from_position(raw: &str) -> Option<Self> {
        let primary = raw.split(',').next()?.trim();
        if primary.is_empty() {
            return None;
        }
        if let Some(group) = PositionGroup::from_code(primary) {
            return Some(group);
        }
        let code = primary
            .trim_end_matches(|c: char| c.is_ascii_digit())
            .to_ascii_uppercase();
        let group = match code.as_str() {
            "GK" => PositionGroup::Goalkeeper,
            "LCB" | "RCB" => PositionGroup::CentreBack,
            "LB" | "RB" | "LWB" | "RWB" => PositionGroup::FullBack,
            "DMF" | "LDMF" | "RDMF" | "LCMF" | "RCMF" => PositionGroup::CentralMidfielder,
            "LW" | "RW" | "LAMF" | "RAMF" | "LM" | "RM" => PositionGroup::WideMidfielder,
            "AMF" => PositionGroup::AttackingMidfielder,
            "LWF" | "RWF" => PositionGroup::WideForward,
            "CF" | "ST" => PositionGroup::CentreForward,
            _ => return role_from_text(primary),
        };
        Some(group)
    }
}

fn role_from_text(raw: &str) -> Option<PositionGroup> {
    let s = raw.to_lowercase();
    if s.contains("goalkeeper") || s.contains("keeper") {
        return Some(PositionGroup::Goalkeeper);
    }
    if s.contains("centre-back") || s.contains("center-back") || s.contains("centre back") {
        return Some(PositionGroup::CentreBack);
    }
    if s.contains("full-back") || s.contains("wing-back") || s.contains("fullback") {
        return Some(PositionGroup::FullBack);
    }
    if s.contains("attacking midfield") {
        return Some(PositionGroup::AttackingMidfielder);
    }
    if s.contains("wide midfield") || s.contains("wing midfield") {
        return Some(PositionGroup::WideMidfielder);
    }
    if s.contains("midfield") {
        return Some(PositionGroup::CentralMidfielder);
    }
    if s.contains("winger") || s.contains("wide forward") {
        return Some(PositionGroup::WideForward);
    }
    if s.contains("forward") || s.contains("striker") {
        return Some(PositionGroup::CentreForward);
    }
    None
}

impl fmt::Display for PositionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for PositionGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PositionGroup::from_code(s)
            .or_else(|| PositionGroup::from_position(s))
            .ok_or_else(|| format!("unknown position group `{s}`"))
    }
}

/// "CBs", "CB, FB & WMs", or "All Positions" for an empty selection.
pub fn describe_groups(groups: &[PositionGroup]) -> String {
    match groups {
        [] => "All Positions".to_string(),
        [only] => format!("{only}s"),
        [init @ .., last] => {
            let head = init.iter().map(|g| g.code()).collect::<Vec<_>>().join(", ");
            format!("{head} & {last}s")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_listed_position_decides() {
        assert_eq!(
            PositionGroup::from_position("LAMF, LW, CF"),
            Some(PositionGroup::WideMidfielder)
        );
        assert_eq!(
            PositionGroup::from_position("RCB3, RB"),
            Some(PositionGroup::CentreBack)
        );
        assert_eq!(
            PositionGroup::from_position("LWF"),
            Some(PositionGroup::WideForward)
        );
        assert_eq!(PositionGroup::from_position("GK"), Some(PositionGroup::Goalkeeper));
        assert_eq!(PositionGroup::from_position(""), None);
        assert_eq!(PositionGroup::from_position("XYZ"), None);
    }

    #[test]
    fn long_form_names_are_understood() {
        assert_eq!(
            PositionGroup::from_position("Centre-Back"),
            Some(PositionGroup::CentreBack)
        );
        assert_eq!(
            PositionGroup::from_position("Defensive Midfielder"),
            Some(PositionGroup::CentralMidfielder)
        );
        assert_eq!(
            PositionGroup::from_position("Striker"),
            Some(PositionGroup::CentreForward)
        );
    }

    #[test]
    fn group_lists_read_naturally() {
        assert_eq!(describe_groups(&[]), "All Positions");
        assert_eq!(describe_groups(&[PositionGroup::CentreBack]), "CBs");
        assert_eq!(
            describe_groups(&[
                PositionGroup::CentreBack,
                PositionGroup::FullBack,
                PositionGroup::WideMidfielder
            ]),
            "CB, FB & WMs"
        );
    }

    #[test]
    fn parses_codes_case_insensitively() {
        assert_eq!("cm".parse::<PositionGroup>(), Ok(PositionGroup::CentralMidfielder));
        assert!("nope".parse::<PositionGroup>().is_err());
    }
}
