use strum_macros::{AsRefStr, Display, EnumIter};

pub const STRONG_ACTIVATION_ABOVE: f64 = 0.4;
pub const MODERATE_ACTIVATION_ABOVE: f64 = 0.1;
pub const NEUTRAL_ABOVE: f64 = -0.1;
pub const MILD_SUPPRESSION_ABOVE: f64 = -0.4;

/// Qualitative bins for a mean enrichment score, ordered from highest to lowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, AsRefStr, EnumIter)]
pub enum Interpretation {
    #[strum(serialize = "strong activation")]
    StrongActivation,
    #[strum(serialize = "moderate activation")]
    ModerateActivation,
    #[strum(serialize = "neutral")]
    Neutral,
    #[strum(serialize = "mild suppression")]
    MildSuppression,
    #[strum(serialize = "strong suppression")]
    StrongSuppression,
}

impl Interpretation {
    pub fn from_score(score: f64) -> Self {
        if score > STRONG_ACTIVATION_ABOVE {
            Interpretation::StrongActivation
        } else if score > MODERATE_ACTIVATION_ABOVE {
            Interpretation::ModerateActivation
        } else if score > NEUTRAL_ABOVE {
            Interpretation::Neutral
        } else if score > MILD_SUPPRESSION_ABOVE {
            Interpretation::MildSuppression
        } else {
            Interpretation::StrongSuppression
        }
    }

    /// Label text, naming the condition the gene sets were projected onto when given.
    pub fn describe(&self, condition: Option<&str>) -> String {
        match (self, condition) {
            (Interpretation::Neutral, _) | (_, None) => self.to_string(),
            (_, Some(condition)) => format!("{} in {}", self, condition),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn boundaries_fall_into_lower_bin() {
        assert_eq!(Interpretation::from_score(0.4), Interpretation::ModerateActivation);
        assert_eq!(Interpretation::from_score(0.41), Interpretation::StrongActivation);
        assert_eq!(Interpretation::from_score(0.1), Interpretation::Neutral);
        assert_eq!(Interpretation::from_score(-0.1), Interpretation::MildSuppression);
        assert_eq!(Interpretation::from_score(-0.4), Interpretation::StrongSuppression);
        assert_eq!(Interpretation::from_score(0.0), Interpretation::Neutral);
    }

    #[test]
    fn labels_are_ordered() {
        let labels: Vec<String> = Interpretation::iter().map(|bin| bin.to_string()).collect();
        assert_eq!(
            labels,
            vec![
                "strong activation",
                "moderate activation",
                "neutral",
                "mild suppression",
                "strong suppression"
            ]
        );
    }

    #[test]
    fn direction_is_appended_to_non_neutral_labels() {
        assert_eq!(
            Interpretation::StrongActivation.describe(Some("disease")),
            "strong activation in disease"
        );
        assert_eq!(Interpretation::Neutral.describe(Some("disease")), "neutral");
        assert_eq!(Interpretation::MildSuppression.describe(None), "mild suppression");
    }
}
