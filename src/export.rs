//! Rendering an assembled plan into a shareable document.
//!
//! The renderer sits behind a trait so the document format is a seam rather
//! than a hard-wired choice. The shipped implementation produces Markdown
//! with a fixed outline: title, profile summary, weekly overview, one
//! section per day, shopping list, recommendations.

use std::fmt::Write as _;

use thiserror::Error;

use crate::types::WeeklyDietPlan;

/// Failure while rendering a plan.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The plan could not be formatted into the target document.
    #[error("failed to render plan: {0}")]
    Render(String),
}

/// A rendered plan document.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    /// Document bytes, encoding per the renderer.
    pub bytes: Vec<u8>,
    /// File extension the document should be saved under, without the dot.
    pub extension: &'static str,
}

impl RenderedDocument {
    /// Size of the rendered document in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the document is empty. A successful render never is.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Turns an assembled plan into a document.
pub trait PlanRenderer: Send + Sync {
    /// Render the plan.
    fn render(&self, plan: &WeeklyDietPlan) -> Result<RenderedDocument, ExportError>;
}

/// Markdown renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl PlanRenderer for MarkdownRenderer {
    fn render(&self, plan: &WeeklyDietPlan) -> Result<RenderedDocument, ExportError> {
        let mut out = String::new();
        render_markdown(plan, &mut out).map_err(|e| ExportError::Render(e.to_string()))?;
        Ok(RenderedDocument {
            bytes: out.into_bytes(),
            extension: "md",
        })
    }
}

fn render_markdown(plan: &WeeklyDietPlan, out: &mut String) -> std::fmt::Result {
    let profile = &plan.user_profile;

    writeln!(out, "# Personalized Weekly Diet Plan")?;
    writeln!(out)?;
    writeln!(out, "Prepared for **{}** on {}.", profile.name, plan.created_date)?;
    writeln!(out)?;

    writeln!(out, "## Profile Summary")?;
    writeln!(out)?;
    writeln!(out, "| | |")?;
    writeln!(out, "|---|---|")?;
    writeln!(out, "| Age | {} |", profile.age)?;
    writeln!(out, "| Gender | {} |", profile.gender)?;
    writeln!(out, "| Height | {:.1} cm |", profile.height_cm)?;
    writeln!(out, "| Weight | {:.1} kg |", profile.weight_kg)?;
    if let Some(target) = profile.target_weight_kg {
        writeln!(out, "| Target weight | {target:.1} kg |")?;
    }
    writeln!(out, "| Activity level | {} |", profile.activity_level.as_str())?;
    writeln!(out, "| Goal | {} |", profile.goal.as_str())?;
    if !profile.dietary_restrictions.is_empty() {
        let restrictions: Vec<_> = profile
            .dietary_restrictions
            .iter()
            .map(|r| r.as_str())
            .collect();
        writeln!(out, "| Dietary restrictions | {} |", restrictions.join(", "))?;
    }
    if !profile.allergies.is_empty() {
        writeln!(out, "| Allergies | {} |", profile.allergies.join(", "))?;
    }
    writeln!(out)?;

    let summary = &plan.weekly_summary;
    writeln!(out, "## Weekly Overview")?;
    writeln!(out)?;
    writeln!(out, "- Total calories: {} kcal", summary.total_calories)?;
    writeln!(out, "- Average daily protein: {:.1} g", summary.avg_protein)?;
    writeln!(out, "- Average daily carbs: {:.1} g", summary.avg_carbs)?;
    writeln!(out, "- Average daily fat: {:.1} g", summary.avg_fat)?;
    writeln!(out)?;

    for day in &plan.daily_plans {
        writeln!(out, "## {}", day.day)?;
        writeln!(out)?;
        writeln!(
            out,
            "Daily totals: {} kcal, {:.1} g protein, {:.1} g carbs, {:.1} g fat",
            day.total_calories, day.total_protein, day.total_carbs, day.total_fat
        )?;
        writeln!(out)?;
        for meal in &day.meals {
            writeln!(out, "### {}: {}", title_case(meal.meal_time.as_str()), meal.meal_name)?;
            writeln!(out)?;
            writeln!(out, "{}", meal.description)?;
            writeln!(out)?;
            writeln!(
                out,
                "*{} kcal | {:.1} g protein | {:.1} g carbs | {:.1} g fat | prep {} | cook {} | {}*",
                meal.nutrition_info.calories,
                meal.nutrition_info.protein,
                meal.nutrition_info.carbs,
                meal.nutrition_info.fat,
                meal.prep_time,
                meal.cooking_time,
                meal.difficulty
            )?;
            writeln!(out)?;
            if !meal.ingredients.is_empty() {
                writeln!(out, "Ingredients:")?;
                for item in &meal.ingredients {
                    writeln!(out, "- {item}")?;
                }
                writeln!(out)?;
            }
            if !meal.instructions.is_empty() {
                writeln!(out, "Instructions:")?;
                for (i, step) in meal.instructions.iter().enumerate() {
                    writeln!(out, "{}. {step}", i.saturating_add(1))?;
                }
                writeln!(out)?;
            }
        }
        if let Some(notes) = &day.notes {
            writeln!(out, "> {notes}")?;
            writeln!(out)?;
        }
    }

    if !plan.shopping_list.is_empty() {
        writeln!(out, "## Shopping List")?;
        writeln!(out)?;
        for item in &plan.shopping_list {
            writeln!(out, "- [ ] {item}")?;
        }
        writeln!(out)?;
    }

    if !plan.recommendations.is_empty() {
        writeln!(out, "## Recommendations")?;
        writeln!(out)?;
        for rec in &plan.recommendations {
            writeln!(out, "- {rec}")?;
        }
        writeln!(out)?;
    }

    Ok(())
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
