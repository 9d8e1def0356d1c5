//! Plan extraction: oracle JSON into a validated [`WeeklyDietPlan`].

use chrono::NaiveDate;
use serde_json::Value;

use super::{
    coerce_f64, coerce_u32, parse_object, profile::profile_from_map, require_array, require_f64,
    require_object, require_str, require_u32, string_list, ExtractError,
};
use crate::types::{DailyPlan, Meal, MealTime, NutritionInfo, WeeklyDietPlan, WeeklySummary};

/// Days a weekly plan must cover.
pub const DAYS_PER_WEEK: usize = 7;

/// Parse raw oracle output into a validated weekly plan.
///
/// Structural validation only: exactly seven daily plans, every meal time a
/// known value, every nutrition figure a number, `created_date` an ISO date.
/// Whether the reported totals agree with their parts is the assembler's
/// concern, not this function's.
pub fn extract_plan(raw: &str) -> Result<WeeklyDietPlan, ExtractError> {
    let map = parse_object(raw)?;

    let profile_map = require_object(&map, "$", "user_profile")?;
    let user_profile = profile_from_map(profile_map, "$.user_profile")?;

    let days = require_array(&map, "$", "daily_plans")?;
    if days.len() != DAYS_PER_WEEK {
        return Err(ExtractError::schema(
            "$.daily_plans",
            format!("expected exactly {DAYS_PER_WEEK} daily plans, found {}", days.len()),
        ));
    }
    let daily_plans = days
        .iter()
        .enumerate()
        .map(|(i, day)| parse_daily_plan(day, &format!("$.daily_plans[{i}]")))
        .collect::<Result<Vec<_>, _>>()?;

    let summary_map = require_object(&map, "$", "weekly_summary")?;
    let weekly_summary = WeeklySummary {
        total_calories: require_u32(summary_map, "$.weekly_summary", "total_calories")?,
        avg_protein: require_f64(summary_map, "$.weekly_summary", "avg_protein")?,
        avg_carbs: require_f64(summary_map, "$.weekly_summary", "avg_carbs")?,
        avg_fat: require_f64(summary_map, "$.weekly_summary", "avg_fat")?,
    };

    let created_date = require_str(&map, "$", "created_date")?;
    if NaiveDate::parse_from_str(&created_date, "%Y-%m-%d").is_err() {
        return Err(ExtractError::schema(
            "$.created_date",
            format!("`{created_date}` is not a YYYY-MM-DD date"),
        ));
    }

    Ok(WeeklyDietPlan {
        user_profile,
        daily_plans,
        weekly_summary,
        recommendations: string_list(&map, "$", "recommendations")?,
        shopping_list: dedupe_shopping_list(string_list(&map, "$", "shopping_list")?),
        created_date,
    })
}

fn parse_daily_plan(value: &Value, path: &str) -> Result<DailyPlan, ExtractError> {
    let Value::Object(map) = value else {
        return Err(ExtractError::schema(
            path,
            format!("expected an object, found {}", super::type_name(value)),
        ));
    };

    let meals_path = super::join(path, "meals");
    let meals = require_array(map, path, "meals")?
        .iter()
        .enumerate()
        .map(|(i, meal)| parse_meal(meal, &format!("{meals_path}[{i}]")))
        .collect::<Result<Vec<_>, _>>()?;
    if meals.is_empty() {
        return Err(ExtractError::schema(meals_path, "a daily plan must have at least one meal"));
    }

    Ok(DailyPlan {
        day: require_str(map, path, "day")?,
        meals,
        total_calories: require_u32(map, path, "total_calories")?,
        total_protein: require_f64(map, path, "total_protein")?,
        total_carbs: require_f64(map, path, "total_carbs")?,
        total_fat: require_f64(map, path, "total_fat")?,
        notes: super::optional_str(map, path, "notes")?,
    })
}

fn parse_meal(value: &Value, path: &str) -> Result<Meal, ExtractError> {
    let Value::Object(map) = value else {
        return Err(ExtractError::schema(
            path,
            format!("expected an object, found {}", super::type_name(value)),
        ));
    };

    let meal_time_raw = require_str(map, path, "meal_time")?;
    let meal_time = MealTime::parse(&meal_time_raw).ok_or_else(|| {
        ExtractError::schema(
            super::join(path, "meal_time"),
            format!(
                "`{meal_time_raw}` is not one of: {}",
                MealTime::ALLOWED.join(", ")
            ),
        )
    })?;

    let nutrition_path = super::join(path, "nutrition_info");
    let nutrition_map = require_object(map, path, "nutrition_info")?;
    let nutrition_info = NutritionInfo {
        calories: nutrition_value(nutrition_map, &nutrition_path, "calories")
            .and_then(|v| coerce_u32(&v, &format!("{nutrition_path}.calories")))?,
        protein: nutrition_value(nutrition_map, &nutrition_path, "protein")
            .and_then(|v| coerce_f64(&v, &format!("{nutrition_path}.protein")))?,
        carbs: nutrition_value(nutrition_map, &nutrition_path, "carbs")
            .and_then(|v| coerce_f64(&v, &format!("{nutrition_path}.carbs")))?,
        fat: nutrition_value(nutrition_map, &nutrition_path, "fat")
            .and_then(|v| coerce_f64(&v, &format!("{nutrition_path}.fat")))?,
    };

    Ok(Meal {
        meal_time,
        meal_name: require_str(map, path, "meal_name")?,
        description: require_str(map, path, "description")?,
        ingredients: string_list(map, path, "ingredients")?,
        instructions: string_list(map, path, "instructions")?,
        nutrition_info,
        prep_time: require_str(map, path, "prep_time")?,
        cooking_time: require_str(map, path, "cooking_time")?,
        difficulty: require_str(map, path, "difficulty")?,
    })
}

fn nutrition_value(
    map: &serde_json::Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<Value, ExtractError> {
    map.get(key)
        .cloned()
        .ok_or_else(|| ExtractError::schema(super::join(path, key), "required field is missing"))
}

/// Case-insensitive first-occurrence dedupe of shopping list items.
///
/// "Olive Oil" and "olive oil" are the same item; the first spelling wins
/// and relative order is preserved.
fn dedupe_shopping_list(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.trim().to_lowercase()))
        .collect()
}
