//! Profile extraction: oracle JSON into a validated [`UserProfile`].

use std::collections::BTreeMap;

use serde_json::Value;

use super::{
    optional_f64, optional_str, parse_object, require_f64, require_positive, require_str,
    require_u32, string_list, ExtractError,
};
use crate::types::{ActivityLevel, DietaryRestriction, Goal, UserProfile};

/// Parse raw oracle output into a validated profile.
///
/// Pure function of its input: calling it again on the same text yields the
/// same profile. Enum fields are checked against their allowed value sets
/// and report the full set on mismatch; measurements must be positive.
pub fn extract_profile(raw: &str) -> Result<UserProfile, ExtractError> {
    let map = parse_object(raw)?;
    profile_from_map(&map, "$")
}

/// Validate a profile object found at `path` inside a larger document.
///
/// The plan extractor reuses this for the `user_profile` echoed back by the
/// oracle, so a corrupted echo fails with the same precision as a failed
/// top-level extraction.
pub(crate) fn profile_from_map(
    map: &serde_json::Map<String, Value>,
    path: &str,
) -> Result<UserProfile, ExtractError> {
    let age = require_u32(map, path, "age")?;
    if age == 0 {
        return Err(ExtractError::schema(
            super::join(path, "age"),
            "expected a positive value, found 0",
        ));
    }

    let height_path = super::join(path, "height_cm");
    let weight_path = super::join(path, "weight_kg");
    let target_path = super::join(path, "target_weight_kg");
    let height_cm = require_positive(require_f64(map, path, "height_cm")?, &height_path)?;
    let weight_kg = require_positive(require_f64(map, path, "weight_kg")?, &weight_path)?;
    let target_weight_kg = optional_f64(map, path, "target_weight_kg")?
        .map(|w| require_positive(w, &target_path))
        .transpose()?;

    let activity_level = parse_enum(
        map,
        path,
        "activity_level",
        ActivityLevel::parse,
        &ActivityLevel::ALLOWED,
    )?;
    let goal = parse_enum(map, path, "goal", Goal::parse, &Goal::ALLOWED)?;
    let dietary_restrictions = parse_restrictions(map, path)?;

    Ok(UserProfile {
        name: require_str(map, path, "name")?,
        age,
        gender: require_str(map, path, "gender")?,
        height_cm,
        weight_kg,
        target_weight_kg,
        activity_level,
        goal,
        dietary_restrictions,
        allergies: string_list(map, path, "allergies")?,
        preferences: string_list(map, path, "preferences")?,
        dislikes: string_list(map, path, "dislikes")?,
        daily_routine: parse_routine(map, path)?,
        cooking_skill: require_str(map, path, "cooking_skill")?,
        budget_constraint: optional_str(map, path, "budget_constraint")?,
        cultural_preferences: string_list(map, path, "cultural_preferences")?,
    })
}

fn parse_enum<T>(
    map: &serde_json::Map<String, Value>,
    path: &str,
    key: &str,
    parse: fn(&str) -> Option<T>,
    allowed: &[&str],
) -> Result<T, ExtractError> {
    let raw = require_str(map, path, key)?;
    parse(&raw).ok_or_else(|| {
        ExtractError::schema(
            super::join(path, key),
            format!("`{raw}` is not one of: {}", allowed.join(", ")),
        )
    })
}

fn parse_restrictions(
    map: &serde_json::Map<String, Value>,
    path: &str,
) -> Result<Vec<DietaryRestriction>, ExtractError> {
    let full = super::join(path, "dietary_restrictions");
    let names = string_list(map, path, "dietary_restrictions")?;
    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            DietaryRestriction::parse(name).ok_or_else(|| {
                ExtractError::schema(
                    format!("{full}[{i}]"),
                    format!(
                        "`{name}` is not one of: {}",
                        DietaryRestriction::ALLOWED.join(", ")
                    ),
                )
            })
        })
        .collect()
}

fn parse_routine(
    map: &serde_json::Map<String, Value>,
    path: &str,
) -> Result<BTreeMap<String, String>, ExtractError> {
    let full = super::join(path, "daily_routine");
    match map.get("daily_routine") {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::Object(obj)) => obj
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => Ok((k.clone(), s.clone())),
                other => Err(ExtractError::schema(
                    format!("{full}.{k}"),
                    format!("expected a string, found {}", super::type_name(other)),
                )),
            })
            .collect(),
        Some(other) => Err(ExtractError::schema(
            full,
            format!("expected an object, found {}", super::type_name(other)),
        )),
    }
}
