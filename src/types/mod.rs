//! Core domain types shared across the crate.
//!
//! The serde wire form of every type here matches the JSON schemas the
//! oracle is instructed to emit: snake_case enum values, `meal_name` and
//! `nutrition_info` field spellings, and `created_date` as a `YYYY-MM-DD`
//! string. Enumerated fields are closed tagged variants; membership is
//! checked by exhaustive matching at validation time, never by comparing
//! loose strings downstream.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// Conversation participant role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System instruction.
    System,
    /// Human user message.
    User,
    /// Assistant (oracle) message.
    Assistant,
}

impl ChatRole {
    /// Wire name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single message in the session transcript.
///
/// The transcript is append-only within a session; it is discarded only by
/// an explicit session reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message author.
    pub role: ChatRole,
    /// Plain text content.
    pub content: String,
}

impl ChatMessage {
    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Build an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }

    /// Build a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Profile enums
// ---------------------------------------------------------------------------

/// User activity level, one of a closed 5-value set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    /// Little to no exercise.
    Sedentary,
    /// Light exercise 1-3 days/week.
    LightlyActive,
    /// Moderate exercise 3-5 days/week.
    ModeratelyActive,
    /// Hard exercise 6-7 days/week.
    VeryActive,
    /// Physical job or twice-daily training.
    ExtremelyActive,
}

impl ActivityLevel {
    /// All wire values, in declaration order. Embedded verbatim in the
    /// extraction schema so the oracle knows the allowed set.
    pub const ALLOWED: [&'static str; 5] = [
        "sedentary",
        "lightly_active",
        "moderately_active",
        "very_active",
        "extremely_active",
    ];

    /// Parse a wire value. Returns `None` for anything outside the set.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sedentary" => Some(Self::Sedentary),
            "lightly_active" => Some(Self::LightlyActive),
            "moderately_active" => Some(Self::ModeratelyActive),
            "very_active" => Some(Self::VeryActive),
            "extremely_active" => Some(Self::ExtremelyActive),
            _ => None,
        }
    }

    /// Wire form of this value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sedentary => "sedentary",
            Self::LightlyActive => "lightly_active",
            Self::ModeratelyActive => "moderately_active",
            Self::VeryActive => "very_active",
            Self::ExtremelyActive => "extremely_active",
        }
    }
}

/// User health goal, one of a closed 5-value set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    /// Lose weight.
    WeightLoss,
    /// Gain weight.
    WeightGain,
    /// Hold current weight.
    Maintenance,
    /// Build muscle mass.
    MuscleGain,
    /// General wellbeing, no weight target.
    GeneralHealth,
}

impl Goal {
    /// All wire values, in declaration order.
    pub const ALLOWED: [&'static str; 5] = [
        "weight_loss",
        "weight_gain",
        "maintenance",
        "muscle_gain",
        "general_health",
    ];

    /// Parse a wire value. Returns `None` for anything outside the set.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "weight_loss" => Some(Self::WeightLoss),
            "weight_gain" => Some(Self::WeightGain),
            "maintenance" => Some(Self::Maintenance),
            "muscle_gain" => Some(Self::MuscleGain),
            "general_health" => Some(Self::GeneralHealth),
            _ => None,
        }
    }

    /// Wire form of this value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WeightLoss => "weight_loss",
            Self::WeightGain => "weight_gain",
            Self::Maintenance => "maintenance",
            Self::MuscleGain => "muscle_gain",
            Self::GeneralHealth => "general_health",
        }
    }
}

/// Dietary restriction, one of a closed 9-value set including `none`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DietaryRestriction {
    /// No restriction.
    None,
    /// No meat.
    Vegetarian,
    /// No animal products.
    Vegan,
    /// No gluten.
    GlutenFree,
    /// No dairy.
    DairyFree,
    /// No tree nuts or peanuts.
    NutFree,
    /// Reduced carbohydrate intake.
    LowCarb,
    /// Ketogenic diet.
    Keto,
    /// Paleolithic diet.
    Paleo,
}

impl DietaryRestriction {
    /// All wire values, in declaration order.
    pub const ALLOWED: [&'static str; 9] = [
        "none",
        "vegetarian",
        "vegan",
        "gluten_free",
        "dairy_free",
        "nut_free",
        "low_carb",
        "keto",
        "paleo",
    ];

    /// Parse a wire value. Returns `None` for anything outside the set.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Self::None),
            "vegetarian" => Some(Self::Vegetarian),
            "vegan" => Some(Self::Vegan),
            "gluten_free" => Some(Self::GlutenFree),
            "dairy_free" => Some(Self::DairyFree),
            "nut_free" => Some(Self::NutFree),
            "low_carb" => Some(Self::LowCarb),
            "keto" => Some(Self::Keto),
            "paleo" => Some(Self::Paleo),
            _ => None,
        }
    }

    /// Wire form of this value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Vegetarian => "vegetarian",
            Self::Vegan => "vegan",
            Self::GlutenFree => "gluten_free",
            Self::DairyFree => "dairy_free",
            Self::NutFree => "nut_free",
            Self::LowCarb => "low_carb",
            Self::Keto => "keto",
            Self::Paleo => "paleo",
        }
    }
}

/// Meal slot within a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealTime {
    /// Morning meal.
    Breakfast,
    /// Midday meal.
    Lunch,
    /// Evening meal.
    Dinner,
    /// Between-meal snacks, planned as one slot.
    Snacks,
}

impl MealTime {
    /// All wire values, in declaration order.
    pub const ALLOWED: [&'static str; 4] = ["breakfast", "lunch", "dinner", "snacks"];

    /// Parse a wire value. Returns `None` for anything outside the set.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "breakfast" => Some(Self::Breakfast),
            "lunch" => Some(Self::Lunch),
            "dinner" => Some(Self::Dinner),
            "snacks" => Some(Self::Snacks),
            _ => None,
        }
    }

    /// Wire form of this value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::Snacks => "snacks",
        }
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// User profile extracted from the conversation transcript.
///
/// Numeric fields are positive; `activity_level`, `goal`, and every element
/// of `dietary_restrictions` are members of their closed sets. Both are
/// enforced by the extractor, so holding a `UserProfile` means the data has
/// already passed validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User's name.
    pub name: String,
    /// Age in years.
    pub age: u32,
    /// Self-described gender.
    pub gender: String,
    /// Height in centimeters.
    pub height_cm: f64,
    /// Current weight in kilograms.
    pub weight_kg: f64,
    /// Target weight in kilograms, if the user has one.
    pub target_weight_kg: Option<f64>,
    /// Activity level.
    pub activity_level: ActivityLevel,
    /// Primary health goal.
    pub goal: Goal,
    /// Dietary restrictions.
    pub dietary_restrictions: Vec<DietaryRestriction>,
    /// Food allergies, free text.
    #[serde(default)]
    pub allergies: Vec<String>,
    /// Food preferences and likes, free text.
    #[serde(default)]
    pub preferences: Vec<String>,
    /// Foods the user dislikes, free text.
    #[serde(default)]
    pub dislikes: Vec<String>,
    /// Named time-of-day → description (e.g. "wake_up" → "6:30").
    #[serde(default)]
    pub daily_routine: BTreeMap<String, String>,
    /// Cooking skill label (e.g. "beginner").
    pub cooking_skill: String,
    /// Grocery budget label, if mentioned.
    pub budget_constraint: Option<String>,
    /// Cultural food preferences, free text.
    #[serde(default)]
    pub cultural_preferences: Vec<String>,
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// Per-meal nutrition figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionInfo {
    /// Energy in kilocalories.
    pub calories: u32,
    /// Protein in grams.
    pub protein: f64,
    /// Carbohydrates in grams.
    pub carbs: f64,
    /// Fat in grams.
    pub fat: f64,
}

/// A single planned meal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    /// Slot within the day.
    pub meal_time: MealTime,
    /// Dish name.
    pub meal_name: String,
    /// Short description of the dish.
    pub description: String,
    /// Ingredient list.
    pub ingredients: Vec<String>,
    /// Ordered preparation steps.
    pub instructions: Vec<String>,
    /// Nutrition figures for this meal.
    pub nutrition_info: NutritionInfo,
    /// Preparation time label (e.g. "10 min").
    pub prep_time: String,
    /// Cooking time label.
    pub cooking_time: String,
    /// Difficulty label (e.g. "easy").
    pub difficulty: String,
}

/// One day of the weekly plan.
///
/// Invariant: the four totals equal the sum of the corresponding per-meal
/// figures, within the assembler's tolerance. The extractor accepts what
/// the oracle reported; the assembler verifies and corrects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPlan {
    /// Day label (e.g. "Monday").
    pub day: String,
    /// Ordered meals for the day.
    pub meals: Vec<Meal>,
    /// Sum of meal calories.
    pub total_calories: u32,
    /// Sum of meal protein in grams.
    pub total_protein: f64,
    /// Sum of meal carbs in grams.
    pub total_carbs: f64,
    /// Sum of meal fat in grams.
    pub total_fat: f64,
    /// Free-text notes for the day.
    pub notes: Option<String>,
}

/// Weekly aggregate figures over the seven daily plans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySummary {
    /// Sum of the seven daily calorie totals.
    pub total_calories: u32,
    /// Mean of the seven daily protein totals.
    pub avg_protein: f64,
    /// Mean of the seven daily carb totals.
    pub avg_carbs: f64,
    /// Mean of the seven daily fat totals.
    pub avg_fat: f64,
}

/// A complete seven-day diet plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyDietPlan {
    /// The profile the plan was generated for.
    pub user_profile: UserProfile,
    /// Exactly seven daily plans, in week order.
    pub daily_plans: Vec<DailyPlan>,
    /// Weekly aggregate figures.
    pub weekly_summary: WeeklySummary,
    /// Free-text recommendations.
    pub recommendations: Vec<String>,
    /// Shopping list with duplicates merged.
    pub shopping_list: Vec<String>,
    /// Creation date as `YYYY-MM-DD`.
    pub created_date: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_level_round_trip() {
        for value in ActivityLevel::ALLOWED {
            let parsed = ActivityLevel::parse(value).expect("allowed value should parse");
            assert_eq!(parsed.as_str(), value);
        }
    }

    #[test]
    fn test_activity_level_rejects_unknown() {
        assert!(ActivityLevel::parse("super_active").is_none());
        assert!(ActivityLevel::parse("").is_none());
        assert!(ActivityLevel::parse("Sedentary").is_none(), "case sensitive");
    }

    #[test]
    fn test_goal_round_trip() {
        for value in Goal::ALLOWED {
            let parsed = Goal::parse(value).expect("allowed value should parse");
            assert_eq!(parsed.as_str(), value);
        }
    }

    #[test]
    fn test_dietary_restriction_round_trip() {
        for value in DietaryRestriction::ALLOWED {
            let parsed = DietaryRestriction::parse(value).expect("allowed value should parse");
            assert_eq!(parsed.as_str(), value);
        }
    }

    #[test]
    fn test_meal_time_rejects_unknown() {
        assert!(MealTime::parse("brunch").is_none());
        assert!(MealTime::parse("supper").is_none());
    }

    #[test]
    fn test_enum_serde_matches_wire_form() {
        let json = serde_json::to_string(&ActivityLevel::LightlyActive).expect("serialize");
        assert_eq!(json, "\"lightly_active\"");
        let back: ActivityLevel = serde_json::from_str("\"very_active\"").expect("deserialize");
        assert_eq!(back, ActivityLevel::VeryActive);

        let json = serde_json::to_string(&MealTime::Breakfast).expect("serialize");
        assert_eq!(json, "\"breakfast\"");
    }

    #[test]
    fn test_chat_message_constructors() {
        let msg = ChatMessage::user("hello");
        assert_eq!(msg.role, ChatRole::User);
        assert_eq!(msg.content, "hello");
        assert_eq!(ChatMessage::assistant("hi").role, ChatRole::Assistant);
        assert_eq!(ChatMessage::system("sys").role.as_str(), "system");
    }

    #[test]
    fn test_profile_serde_round_trip() {
        let profile = UserProfile {
            name: "Maria".to_owned(),
            age: 30,
            gender: "female".to_owned(),
            height_cm: 167.6,
            weight_kg: 81.6,
            target_weight_kg: Some(68.0),
            activity_level: ActivityLevel::Sedentary,
            goal: Goal::WeightLoss,
            dietary_restrictions: vec![DietaryRestriction::None],
            allergies: vec![],
            preferences: vec!["italian".to_owned()],
            dislikes: vec![],
            daily_routine: BTreeMap::from([("work".to_owned(), "9-5".to_owned())]),
            cooking_skill: "beginner".to_owned(),
            budget_constraint: None,
            cultural_preferences: vec![],
        };

        let json = serde_json::to_string(&profile).expect("serialize");
        assert!(json.contains("\"activity_level\":\"sedentary\""));
        assert!(json.contains("\"goal\":\"weight_loss\""));

        let back: UserProfile = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, profile);
    }
}
