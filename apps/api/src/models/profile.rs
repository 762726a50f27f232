use serde::{Deserialize, Serialize};

/// Biological sex as stored on the profile. Open-ended: anything other than
/// male/female deserializes to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    LightlyActive,
    ModeratelyActive,
    VeryActive,
    ExtraActive,
    #[serde(other)]
    Unrecognized,
}

impl ActivityLevel {
    /// TDEE multiplier. Unrecognized levels use the sedentary factor.
    pub fn factor(self) -> f64 {
        match self {
            ActivityLevel::Sedentary | ActivityLevel::Unrecognized => 1.2,
            ActivityLevel::LightlyActive => 1.375,
            ActivityLevel::ModeratelyActive => 1.55,
            ActivityLevel::VeryActive => 1.725,
            ActivityLevel::ExtraActive => 1.9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DietGoal {
    FatLoss,
    MuscleGain,
    Recomposition,
    Maintenance,
    #[serde(other)]
    Other,
}

/// Biometric and preference record owned by the user. Read-only input to the planner.
///
/// Every field is optional on the wire: forms are filled in incrementally and the
/// calculator reports what is still missing instead of failing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub age: Option<f64>,
    pub sex: Option<Sex>,
    pub height_cm: Option<f64>,
    pub current_weight_kg: Option<f64>,
    pub target_weight_kg: Option<f64>,
    pub activity_level: Option<ActivityLevel>,
    pub primary_goal: Option<DietGoal>,
    pub secondary_goal: Option<DietGoal>,
    pub dietary_preference: Option<String>,
    pub allergies: Vec<String>,
    pub disliked_ingredients: Vec<String>,
    pub preferred_ingredients: Vec<String>,
    pub preferred_cuisines: Vec<String>,
    pub disliked_cuisines: Vec<String>,
    pub medical_conditions: Vec<String>,
    pub medications: Vec<String>,
}

impl UserProfile {
    /// Allergies and dislikes, lowercased. An ingredient matching any of these is
    /// kept out of fallback dishes.
    pub fn excluded_terms(&self) -> Vec<String> {
        self.allergies
            .iter()
            .chain(self.disliked_ingredients.iter())
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_sex_deserializes_to_other() {
        let sex: Sex = serde_json::from_str(r#""non_binary""#).unwrap();
        assert_eq!(sex, Sex::Other);
    }

    #[test]
    fn test_unknown_activity_level_uses_sedentary_factor() {
        let level: ActivityLevel = serde_json::from_str(r#""couch_athlete""#).unwrap();
        assert_eq!(level, ActivityLevel::Unrecognized);
        assert!((level.factor() - 1.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_profile_deserializes_with_defaults() {
        let profile: UserProfile = serde_json::from_str(r#"{"age": 30}"#).unwrap();
        assert_eq!(profile.age, Some(30.0));
        assert!(profile.sex.is_none());
        assert!(profile.allergies.is_empty());
    }

    #[test]
    fn test_out_of_range_and_fractional_ages_still_deserialize() {
        let negative: UserProfile = serde_json::from_str(r#"{"age": -5}"#).unwrap();
        assert_eq!(negative.age, Some(-5.0));
        let fractional: UserProfile = serde_json::from_str(r#"{"age": 29.5}"#).unwrap();
        assert_eq!(fractional.age, Some(29.5));
    }

    #[test]
    fn test_excluded_terms_merges_allergies_and_dislikes() {
        let profile = UserProfile {
            allergies: vec!["Peanut ".to_string()],
            disliked_ingredients: vec!["Salmon".to_string(), " ".to_string()],
            ..Default::default()
        };
        assert_eq!(profile.excluded_terms(), vec!["peanut", "salmon"]);
    }
}
