use serde::Deserialize;

use crate::scenario::Quality;

/// A recorded answer. Free text on a pending choice uses [`CUSTOM_INPUT`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserChoice {
    pub interaction_id: String,
    pub option_id: String,
    pub value: Quality,
}

pub const CUSTOM_INPUT: &str = "custom-input";

/// Percentage of the maximum possible points, rounded half up.
/// Zero when nothing has been answered yet.
pub fn score(choices: &[UserChoice]) -> u8 {
    if choices.is_empty() {
        return 0;
    }
    let points: u32 = choices.iter().map(|c| c.value.points()).sum();
    let n = choices.len() as u32;
    // round(100 * p / 3n) == floor((200p + 3n) / 6n)
    ((200 * points + 3 * n) / (6 * n)) as u8
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Tier {
    #[serde(default)]
    pub min_score: u8,
    pub label: String,
    #[serde(default)]
    pub blurb: String,
}

/// Score bands plus the band for everything below the lowest of them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TierTable {
    bands: Vec<Tier>,
    floor: Tier,
}

impl TierTable {
    pub fn new(bands: Vec<Tier>, floor: Tier) -> Self {
        Self { bands, floor }
    }

    pub fn classify(&self, score: u8) -> &Tier {
        // bands are not required to be sorted
        self.bands
            .iter()
            .filter(|t| score >= t.min_score)
            .max_by_key(|t| t.min_score)
            .unwrap_or(&self.floor)
    }
}

impl Default for TierTable {
    fn default() -> Self {
        let tier = |min_score, label: &str, blurb: &str| Tier {
            min_score,
            label: label.into(),
            blurb: blurb.into(),
        };
        Self::new(
            vec![
                tier(85, "Lead Counsel", "Outstanding performance!"),
                tier(70, "Associate Attorney", "Solid performance with room to grow."),
                tier(50, "Junior Associate", "A fair start. Review the consequences of each choice."),
            ],
            tier(0, "Law Clerk", "Keep practicing to improve your skills."),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(values: &[Quality]) -> Vec<UserChoice> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| UserChoice {
                interaction_id: format!("i{i}"),
                option_id: format!("o{i}"),
                value: *v,
            })
            .collect()
    }

    #[test]
    fn test_score_empty_is_zero() {
        assert_eq!(score(&[]), 0);
    }

    #[test]
    fn test_score_extremes() {
        assert_eq!(score(&answers(&[Quality::Good; 5])), 100);
        assert_eq!(score(&answers(&[Quality::Bad; 3])), 0);
        assert_eq!(score(&answers(&[Quality::Neutral; 4])), 33);
    }

    #[test]
    fn test_score_rounds_half_up() {
        // 3 + 0 = 3 of 6 -> 50
        assert_eq!(score(&answers(&[Quality::Good, Quality::Bad])), 50);
        // 3 + 1 = 4 of 6 -> 66.67 -> 67
        assert_eq!(score(&answers(&[Quality::Good, Quality::Neutral])), 67);
        // 3*5 + 1 = 16 of 18 -> 88.89 -> 89
        let mut v = vec![Quality::Good; 5];
        v.push(Quality::Neutral);
        assert_eq!(score(&answers(&v)), 89);
    }

    #[test]
    fn test_score_monotonic_in_good_answers() {
        let mut last = 0;
        for good in 0..=6 {
            let mut v = vec![Quality::Good; good];
            v.extend(vec![Quality::Bad; 6 - good]);
            let s = score(&answers(&v));
            assert!(s >= last, "{good} good answers scored {s} < {last}");
            last = s;
        }
        assert_eq!(last, 100);
    }

    #[test]
    fn test_default_tiers() {
        let tiers = TierTable::default();
        assert_eq!(tiers.classify(100).label, "Lead Counsel");
        assert_eq!(tiers.classify(85).label, "Lead Counsel");
        assert_eq!(tiers.classify(84).label, "Associate Attorney");
        assert_eq!(tiers.classify(70).label, "Associate Attorney");
        assert_eq!(tiers.classify(50).label, "Junior Associate");
        assert_eq!(tiers.classify(49).label, "Law Clerk");
        assert_eq!(tiers.classify(0).label, "Law Clerk");
    }

    #[test]
    fn test_tiers_from_config_unsorted() {
        let raw = r#"{
            "bands": [
                {"min_score": 60, "label": "Proficient"},
                {"min_score": 80, "label": "Expert"}
            ],
            "floor": {"label": "Developing"}
        }"#;
        let tiers: TierTable = serde_json::from_str(raw).unwrap();
        assert_eq!(tiers.classify(80).label, "Expert");
        assert_eq!(tiers.classify(79).label, "Proficient");
        assert_eq!(tiers.classify(59).label, "Developing");
    }
}
