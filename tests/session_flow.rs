#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
// End-to-end consultation flow against a fixture oracle.
//
// Drives the full lifecycle: chat, profile extraction, plan generation,
// finalize, export. The oracle returns canned responses in whatever shape
// the operation expects (fenced JSON for extraction, bare JSON for plans)
// and counts its calls so guard tests can assert zero oracle traffic.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use nutriplan::dietitian::{Dietitian, DietitianError};
use nutriplan::export::MarkdownRenderer;
use nutriplan::providers::{CompletionRequest, LlmProvider, OracleError, OracleResponse};
use nutriplan::session::{SessionState, SessionStore};
use nutriplan::types::{ActivityLevel, DietaryRestriction, Goal, MealTime};

/// Fixture oracle: responds from a script and counts every call.
struct FixtureOracle {
    script: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl FixtureOracle {
    fn new(script: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for FixtureOracle {
    async fn complete(&self, _request: CompletionRequest) -> Result<OracleResponse, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            return Err(OracleError::Unavailable("fixture script exhausted".to_owned()));
        }
        Ok(OracleResponse {
            text: script.remove(0),
            model: "fixture".to_owned(),
        })
    }

    fn model_id(&self) -> &str {
        "fixture"
    }
}

fn profile_response() -> String {
    // Fenced, the way chat models usually return JSON.
    let profile = json!({
        "name": "Maria Santos",
        "age": 30,
        "gender": "female",
        "height_cm": 167.6,
        "weight_kg": 81.6,
        "target_weight_kg": 68.0,
        "activity_level": "sedentary",
        "goal": "weight_loss",
        "dietary_restrictions": ["none"],
        "allergies": [],
        "preferences": ["italian", "mexican"],
        "dislikes": ["mushrooms"],
        "daily_routine": {"work": "9-5 desk job"},
        "cooking_skill": "beginner",
        "budget_constraint": null,
        "cultural_preferences": []
    });
    format!("```json\n{profile}\n```")
}

fn plan_response() -> String {
    let meal = |time: &str, name: &str, calories: u32| {
        json!({
            "meal_time": time,
            "meal_name": name,
            "description": format!("{name}, portioned for steady weight loss."),
            "ingredients": ["olive oil", "vegetables", "protein"],
            "instructions": ["prep ingredients", "cook", "serve"],
            "nutrition_info": {"calories": calories, "protein": 30.0, "carbs": 50.0, "fat": 16.0},
            "prep_time": "10 min",
            "cooking_time": "20 min",
            "difficulty": "easy"
        })
    };
    let days: Vec<_> = [
        "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
    ]
    .iter()
    .map(|day| {
        json!({
            "day": day,
            "meals": [
                meal("breakfast", "Veggie Omelette", 300),
                meal("lunch", "Chicken Burrito Bowl", 500),
                meal("dinner", "Zucchini Pasta", 700)
            ],
            // Deliberately wrong: the meals sum to 1500.
            "total_calories": 1600,
            "total_protein": 90.0,
            "total_carbs": 150.0,
            "total_fat": 48.0,
            "notes": "Drink water with every meal."
        })
    })
    .collect();

    json!({
        "user_profile": {
            "name": "Maria Santos",
            "age": 30,
            "gender": "female",
            "height_cm": 167.6,
            "weight_kg": 81.6,
            "target_weight_kg": 68.0,
            "activity_level": "sedentary",
            "goal": "weight_loss",
            "dietary_restrictions": ["none"],
            "cooking_skill": "beginner"
        },
        "daily_plans": days,
        "weekly_summary": {"total_calories": 11200, "avg_protein": 90.0, "avg_carbs": 150.0, "avg_fat": 48.0},
        "recommendations": ["Meal prep on Sundays", "Aim for 8000 steps a day"],
        "shopping_list": ["olive oil", "Olive Oil", "vegetables", "protein"],
        "created_date": "2026-08-30"
    })
    .to_string()
}

fn dietitian_with(script: Vec<String>) -> (Dietitian, Arc<FixtureOracle>) {
    let oracle = FixtureOracle::new(script);
    let dietitian = Dietitian::new(
        oracle.clone(),
        Arc::new(MarkdownRenderer),
        SessionStore::new(),
    );
    (dietitian, oracle)
}

#[tokio::test]
async fn full_consultation_reaches_finalized_with_valid_plan() {
    let (dietitian, oracle) = dietitian_with(vec![
        "Hi Maria! Tell me about your routine.".to_owned(),
        "Got it. What cuisines do you enjoy?".to_owned(),
        profile_response(),
        plan_response(),
    ]);
    let id = dietitian.start_session();
    assert_eq!(dietitian.state(id).await.unwrap(), SessionState::Idle);

    dietitian.chat(id, "Hi, I'm Maria, I want to lose weight").await.unwrap();
    dietitian.chat(id, "I work a desk job and love Italian food").await.unwrap();
    assert_eq!(dietitian.state(id).await.unwrap(), SessionState::Chatting);

    let profile = dietitian.extract_profile(id).await.unwrap();
    assert_eq!(profile.name, "Maria Santos");
    assert_eq!(profile.activity_level, ActivityLevel::Sedentary);
    assert_eq!(profile.goal, Goal::WeightLoss);
    assert_eq!(profile.dietary_restrictions, vec![DietaryRestriction::None]);
    assert_eq!(dietitian.state(id).await.unwrap(), SessionState::ProfileReady);

    let outcome = dietitian.generate_plan(id).await.unwrap();
    assert_eq!(outcome.plan.daily_plans.len(), 7);
    for day in &outcome.plan.daily_plans {
        for meal in &day.meals {
            assert!(matches!(
                meal.meal_time,
                MealTime::Breakfast | MealTime::Lunch | MealTime::Dinner | MealTime::Snacks
            ));
        }
    }
    assert_eq!(dietitian.state(id).await.unwrap(), SessionState::PlanReady);

    dietitian.finalize(id).await.unwrap();
    assert_eq!(dietitian.state(id).await.unwrap(), SessionState::Finalized);
    assert_eq!(oracle.calls(), 4);
}

#[tokio::test]
async fn assembler_corrects_reported_totals_during_generation() {
    let (dietitian, _oracle) = dietitian_with(vec![
        "Tell me more.".to_owned(),
        profile_response(),
        plan_response(),
    ]);
    let id = dietitian.start_session();

    dietitian.chat(id, "hello").await.unwrap();
    dietitian.extract_profile(id).await.unwrap();
    let outcome = dietitian.generate_plan(id).await.unwrap();

    // Meals of 300 + 500 + 700 beat the reported 1600 per day.
    for day in &outcome.plan.daily_plans {
        assert_eq!(day.total_calories, 1500);
    }
    assert_eq!(outcome.plan.weekly_summary.total_calories, 10500);
    assert!(outcome
        .corrections
        .iter()
        .any(|c| c.field == "weekly_summary.total_calories"));
}

#[tokio::test]
async fn shopping_list_is_deduped_in_generated_plan() {
    let (dietitian, _oracle) = dietitian_with(vec![
        "Tell me more.".to_owned(),
        profile_response(),
        plan_response(),
    ]);
    let id = dietitian.start_session();

    dietitian.chat(id, "hello").await.unwrap();
    dietitian.extract_profile(id).await.unwrap();
    let outcome = dietitian.generate_plan(id).await.unwrap();

    assert_eq!(
        outcome.plan.shopping_list,
        vec!["olive oil", "vegetables", "protein"]
    );
}

#[tokio::test]
async fn out_of_order_operations_cost_no_oracle_calls() {
    let (dietitian, oracle) = dietitian_with(vec![]);
    let id = dietitian.start_session();

    // Extraction from Idle.
    assert!(matches!(
        dietitian.extract_profile(id).await.unwrap_err(),
        DietitianError::Guard(_)
    ));
    // Plan generation from Idle.
    assert!(matches!(
        dietitian.generate_plan(id).await.unwrap_err(),
        DietitianError::Guard(_)
    ));
    // Export without a plan.
    assert!(matches!(
        dietitian.export(id).await.unwrap_err(),
        DietitianError::Guard(_)
    ));
    // Finalize without a plan.
    assert!(matches!(
        dietitian.finalize(id).await.unwrap_err(),
        DietitianError::Guard(_)
    ));

    assert_eq!(oracle.calls(), 0);
}

#[tokio::test]
async fn plan_generation_from_chatting_is_rejected_before_the_oracle() {
    let (dietitian, oracle) = dietitian_with(vec!["Hello!".to_owned()]);
    let id = dietitian.start_session();

    dietitian.chat(id, "hi").await.unwrap();
    assert!(matches!(
        dietitian.generate_plan(id).await.unwrap_err(),
        DietitianError::Guard(_)
    ));
    // Only the chat reached the oracle.
    assert_eq!(oracle.calls(), 1);
}

#[tokio::test]
async fn export_renders_every_day_and_survives_finalize() {
    let (dietitian, _oracle) = dietitian_with(vec![
        "Tell me more.".to_owned(),
        profile_response(),
        plan_response(),
    ]);
    let id = dietitian.start_session();

    dietitian.chat(id, "hello").await.unwrap();
    dietitian.extract_profile(id).await.unwrap();
    dietitian.generate_plan(id).await.unwrap();

    let before = dietitian.export(id).await.unwrap();
    dietitian.finalize(id).await.unwrap();
    let after = dietitian.export(id).await.unwrap();
    assert_eq!(before.bytes, after.bytes);

    let text = String::from_utf8(after.bytes).unwrap();
    assert!(text.contains("Maria Santos"));
    for day in ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"] {
        assert!(text.contains(&format!("## {day}")));
    }
    // Export shows the corrected totals, not the oracle's arithmetic.
    assert!(text.contains("Daily totals: 1500 kcal"));
}

#[tokio::test]
async fn malformed_plan_fails_without_corrupting_the_session() {
    let (dietitian, _oracle) = dietitian_with(vec![
        "Tell me more.".to_owned(),
        profile_response(),
        "{\"daily_plans\": \"nope\"}".to_owned(),
        plan_response(),
    ]);
    let id = dietitian.start_session();

    dietitian.chat(id, "hello").await.unwrap();
    dietitian.extract_profile(id).await.unwrap();

    let err = dietitian.generate_plan(id).await.unwrap_err();
    assert!(matches!(err, DietitianError::Extract(_)));
    assert_eq!(dietitian.state(id).await.unwrap(), SessionState::ProfileReady);

    // The next attempt succeeds from the same state.
    let outcome = dietitian.generate_plan(id).await.unwrap();
    assert_eq!(outcome.plan.daily_plans.len(), 7);
}

#[tokio::test]
async fn reset_allows_a_fresh_consultation() {
    let (dietitian, _oracle) = dietitian_with(vec![
        "Tell me more.".to_owned(),
        profile_response(),
        plan_response(),
        "Welcome back!".to_owned(),
    ]);
    let id = dietitian.start_session();

    dietitian.chat(id, "hello").await.unwrap();
    dietitian.extract_profile(id).await.unwrap();
    dietitian.generate_plan(id).await.unwrap();

    dietitian.reset(id).await.unwrap();
    assert_eq!(dietitian.state(id).await.unwrap(), SessionState::Idle);
    assert!(matches!(
        dietitian.export(id).await.unwrap_err(),
        DietitianError::Guard(_)
    ));

    let reply = dietitian.chat(id, "hi again").await.unwrap();
    assert_eq!(reply, "Welcome back!");
}

#[tokio::test]
async fn concurrent_sessions_do_not_interfere() {
    let (dietitian, oracle) = dietitian_with(vec![
        "Reply one.".to_owned(),
        "Reply two.".to_owned(),
    ]);
    let a = dietitian.start_session();
    let b = dietitian.start_session();

    dietitian.chat(a, "hello from a").await.unwrap();
    dietitian.chat(b, "hello from b").await.unwrap();

    assert_eq!(dietitian.state(a).await.unwrap(), SessionState::Chatting);
    assert_eq!(dietitian.state(b).await.unwrap(), SessionState::Chatting);
    assert_eq!(dietitian.sessions().len(), 2);
    assert_eq!(oracle.calls(), 2);
}
