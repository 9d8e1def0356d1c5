//! Reconciling plan aggregates against their parts.
//!
//! The oracle reports per-day totals and a weekly summary, but arithmetic is
//! not its strong suit. The assembler recomputes every aggregate from the
//! meal-level figures, compares against what was reported within a small
//! tolerance, and replaces disagreeing values. Disagreements are warnings,
//! never failures: a plan that parsed structurally always assembles.

use serde::Serialize;

use crate::extract::plan::DAYS_PER_WEEK;
use crate::types::{DailyPlan, WeeklyDietPlan, WeeklySummary};

/// Relative tolerance for aggregate comparison.
const RELATIVE_TOLERANCE: f64 = 0.01;
/// Absolute floor so tiny aggregates are not flagged for rounding noise.
const ABSOLUTE_FLOOR: f64 = 0.5;

/// One reported aggregate that disagreed with its recomputed value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateMismatch {
    /// Which aggregate disagreed, e.g. `daily_plans[1].total_calories`.
    pub field: String,
    /// The value the oracle reported.
    pub reported: f64,
    /// The value recomputed from the parts.
    pub recomputed: f64,
}

/// Recompute all aggregates, correcting any that fall outside tolerance.
///
/// Returns the corrected plan together with one mismatch record per
/// corrected field. Each mismatch is also logged at warn level.
pub fn assemble(mut plan: WeeklyDietPlan) -> (WeeklyDietPlan, Vec<AggregateMismatch>) {
    let mut mismatches = Vec::new();

    for (i, day) in plan.daily_plans.iter_mut().enumerate() {
        reconcile_day(day, i, &mut mismatches);
    }
    reconcile_summary(&plan.daily_plans, &mut plan.weekly_summary, &mut mismatches);

    for m in &mismatches {
        tracing::warn!(
            field = %m.field,
            reported = m.reported,
            recomputed = m.recomputed,
            "corrected aggregate that disagreed with its parts"
        );
    }

    (plan, mismatches)
}

fn reconcile_day(day: &mut DailyPlan, index: usize, mismatches: &mut Vec<AggregateMismatch>) {
    let calories: u32 = day
        .meals
        .iter()
        .fold(0u32, |acc, m| acc.saturating_add(m.nutrition_info.calories));
    let protein: f64 = day.meals.iter().map(|m| m.nutrition_info.protein).sum();
    let carbs: f64 = day.meals.iter().map(|m| m.nutrition_info.carbs).sum();
    let fat: f64 = day.meals.iter().map(|m| m.nutrition_info.fat).sum();

    let prefix = format!("daily_plans[{index}]");
    correct_u32(&mut day.total_calories, calories, &prefix, "total_calories", mismatches);
    correct_f64(&mut day.total_protein, protein, &prefix, "total_protein", mismatches);
    correct_f64(&mut day.total_carbs, carbs, &prefix, "total_carbs", mismatches);
    correct_f64(&mut day.total_fat, fat, &prefix, "total_fat", mismatches);
}

fn reconcile_summary(
    days: &[DailyPlan],
    summary: &mut WeeklySummary,
    mismatches: &mut Vec<AggregateMismatch>,
) {
    // Daily totals are already corrected at this point, so the weekly
    // figures derive from trusted values.
    let calories: u32 = days
        .iter()
        .fold(0u32, |acc, d| acc.saturating_add(d.total_calories));
    let day_count = DAYS_PER_WEEK as f64;
    let avg_protein = days.iter().map(|d| d.total_protein).sum::<f64>() / day_count;
    let avg_carbs = days.iter().map(|d| d.total_carbs).sum::<f64>() / day_count;
    let avg_fat = days.iter().map(|d| d.total_fat).sum::<f64>() / day_count;

    let prefix = "weekly_summary";
    correct_u32(&mut summary.total_calories, calories, prefix, "total_calories", mismatches);
    correct_f64(&mut summary.avg_protein, avg_protein, prefix, "avg_protein", mismatches);
    correct_f64(&mut summary.avg_carbs, avg_carbs, prefix, "avg_carbs", mismatches);
    correct_f64(&mut summary.avg_fat, avg_fat, prefix, "avg_fat", mismatches);
}

fn within_tolerance(reported: f64, recomputed: f64) -> bool {
    let diff = (reported - recomputed).abs();
    let allowed = (recomputed.abs() * RELATIVE_TOLERANCE).max(ABSOLUTE_FLOOR);
    diff <= allowed
}

fn correct_u32(
    slot: &mut u32,
    recomputed: u32,
    prefix: &str,
    name: &str,
    mismatches: &mut Vec<AggregateMismatch>,
) {
    if !within_tolerance(f64::from(*slot), f64::from(recomputed)) {
        mismatches.push(AggregateMismatch {
            field: format!("{prefix}.{name}"),
            reported: f64::from(*slot),
            recomputed: f64::from(recomputed),
        });
        *slot = recomputed;
    }
}

fn correct_f64(
    slot: &mut f64,
    recomputed: f64,
    prefix: &str,
    name: &str,
    mismatches: &mut Vec<AggregateMismatch>,
) {
    if !within_tolerance(*slot, recomputed) {
        mismatches.push(AggregateMismatch {
            field: format!("{prefix}.{name}"),
            reported: *slot,
            recomputed,
        });
        *slot = recomputed;
    }
}
