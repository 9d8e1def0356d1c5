//! Prompt construction for the three oracle tasks.
//!
//! Pure functions of their inputs: no clock, no config, no side effects.
//! The chat payload carries the persona and the guided example exchanges;
//! the two extraction payloads carry a chain-of-thought preamble and the
//! literal target schema. Schema instructions are never omitted for
//! extraction tasks; the extractor depends on the oracle being told the
//! exact shape to emit.

use crate::types::{ChatMessage, UserProfile};

// ---------------------------------------------------------------------------
// Generation settings per task
// ---------------------------------------------------------------------------

/// Token limit and temperature for one oracle task.
#[derive(Debug, Clone, Copy)]
pub struct GenerationSettings {
    /// Maximum tokens in the response.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Free chat: conversational, moderate length.
pub const CHAT_SETTINGS: GenerationSettings = GenerationSettings {
    max_tokens: 500,
    temperature: 0.7,
};

/// Profile extraction: near-deterministic.
pub const EXTRACTION_SETTINGS: GenerationSettings = GenerationSettings {
    max_tokens: 1000,
    temperature: 0.1,
};

/// Plan generation: long output, low temperature.
pub const PLAN_SETTINGS: GenerationSettings = GenerationSettings {
    max_tokens: 2000,
    temperature: 0.3,
};

// ---------------------------------------------------------------------------
// Persona and guided examples
// ---------------------------------------------------------------------------

/// Dietitian persona system prompt used for free chat.
const PERSONA_PROMPT: &str = "\
You are Dr. Sarah Chen, a certified clinical nutritionist and registered \
dietitian with over 15 years of experience. You specialize in creating \
personalized, evidence-based diet plans that consider individual \
preferences, cultural backgrounds, and lifestyle factors.

Your approach is:
- Warm, empathetic, and professional
- Evidence-based and scientifically sound
- Culturally sensitive and inclusive
- Practical and sustainable for real-life implementation
- Focused on long-term health outcomes

You should:
1. Ask thoughtful, targeted questions to understand the user's complete health profile
2. Provide clear, actionable advice
3. Consider medical conditions, allergies, and dietary restrictions
4. Offer practical meal suggestions that fit the user's lifestyle
5. Explain the reasoning behind your recommendations
6. Be encouraging and supportive throughout the conversation

Remember: You're not just providing meal plans; you're building a \
relationship and understanding the user's unique situation to create the \
most effective nutrition strategy.";

/// System prompt for the profile extraction task.
const EXTRACTION_ROLE_PROMPT: &str =
    "You are a data extraction specialist. Extract user information and return ONLY valid JSON.";

/// System prompt for the plan generation task.
const PLAN_ROLE_PROMPT: &str =
    "You are a nutrition expert. Create personalized diet plans and return ONLY valid JSON.";

/// Chain-of-thought preamble for profile extraction.
const PROFILE_COT_PROMPT: &str = "\
Let me think through this step by step to extract the user's complete profile:

1. First, I need to identify all the personal information mentioned
2. Then, I should categorize their preferences and restrictions
3. Next, I'll assess their lifestyle and routine patterns
4. Finally, I'll determine their goals and constraints

Let me analyze the conversation systematically...";

/// Chain-of-thought preamble for meal planning.
const PLAN_COT_PROMPT: &str = "\
Now let me think through creating a personalized meal plan:

1. Based on the user's profile, what are their caloric needs?
2. How should I distribute calories across meals given their routine?
3. What foods align with their preferences and restrictions?
4. How can I make the plan practical for their cooking skills?
5. What cultural elements should I incorporate?

Let me work through this systematically...";

/// Guided example exchanges prepended to chat payloads.
///
/// These steer the conversation toward collecting the fields the profile
/// schema needs. They are never included in extraction payloads.
const GUIDED_EXAMPLES: [(&str, &str); 3] = [
    (
        "Hi, I want to lose weight",
        "Hello! I'm Dr. Sarah Chen, and I'm here to help you create a personalized \
         weight loss plan. To get started, I'd like to understand your current \
         situation better. Could you tell me:\n\n\
         1. What's your current weight and height?\n\
         2. How much weight would you like to lose?\n\
         3. What's your typical daily routine like?\n\
         4. Do you have any dietary restrictions or food allergies?\n\
         5. What's your cooking experience level?\n\n\
         This will help me create a plan that fits your lifestyle and preferences.",
    ),
    (
        "I'm 30, female, 5'6\", 180 lbs, want to lose 30 lbs",
        "Thank you for sharing those details! Let me ask a few more questions to \
         create the most effective plan:\n\n\
         1. What's your current activity level?\n\
         2. What's your typical work schedule and daily routine?\n\
         3. Do you have any favorite foods or cuisines you'd like to include?\n\
         4. Are there any foods you absolutely dislike?\n\
         5. What's your experience with meal planning and cooking?\n\
         6. Do you have any medical conditions or take medications that might \
         affect your diet?\n\n\
         Based on your stats, a healthy weight loss goal would be 1-2 pounds per \
         week, which is sustainable and safe.",
    ),
    (
        "I work 9-5, mostly sedentary, love Italian and Mexican food, beginner cook",
        "Perfect! I can see you have a busy work schedule and enjoy flavorful \
         cuisines. Let me gather a bit more information to tailor your plan:\n\n\
         1. What time do you usually wake up and go to bed?\n\
         2. Do you prefer to cook meals in advance or prepare them fresh each day?\n\
         3. Are you open to trying new ingredients or do you prefer familiar foods?\n\
         4. Do you have any food allergies or intolerances?\n\
         5. What's your typical budget for groceries?",
    ),
];

// ---------------------------------------------------------------------------
// Literal extraction schemas
// ---------------------------------------------------------------------------

/// Literal profile schema embedded in the extraction prompt.
///
/// Field names, types, and enumerated value sets here must stay in lockstep
/// with [`crate::types::UserProfile`] and the extractor's checks.
pub const PROFILE_SCHEMA: &str = r#"{
    "name": "string",
    "age": integer,
    "gender": "string",
    "height_cm": float,
    "weight_kg": float,
    "target_weight_kg": float or null,
    "activity_level": "sedentary|lightly_active|moderately_active|very_active|extremely_active",
    "goal": "weight_loss|weight_gain|maintenance|muscle_gain|general_health",
    "dietary_restrictions": ["none|vegetarian|vegan|gluten_free|dairy_free|nut_free|low_carb|keto|paleo"],
    "allergies": ["list", "of", "allergies"],
    "preferences": ["list", "of", "preferences"],
    "dislikes": ["list", "of", "dislikes"],
    "daily_routine": {"key": "value"},
    "cooking_skill": "string",
    "budget_constraint": "string" or null,
    "cultural_preferences": ["list", "of", "preferences"]
}"#;

/// Literal plan schema embedded in the generation prompt.
pub const PLAN_SCHEMA: &str = r#"{
    "user_profile": {...the profile exactly as provided...},
    "daily_plans": [
        {
            "day": "Monday",
            "meals": [
                {
                    "meal_time": "breakfast|lunch|dinner|snacks",
                    "meal_name": "string",
                    "description": "string",
                    "ingredients": ["list", "of", "ingredients"],
                    "instructions": ["step", "by", "step", "instructions"],
                    "nutrition_info": {"calories": integer, "protein": float, "carbs": float, "fat": float},
                    "prep_time": "string",
                    "cooking_time": "string",
                    "difficulty": "string"
                }
            ],
            "total_calories": integer,
            "total_protein": float,
            "total_carbs": float,
            "total_fat": float,
            "notes": "string"
        }
    ],
    "weekly_summary": {"total_calories": integer, "avg_protein": float, "avg_carbs": float, "avg_fat": float},
    "recommendations": ["list", "of", "recommendations"],
    "shopping_list": ["list", "of", "items"],
    "created_date": "YYYY-MM-DD"
}"#;

// ---------------------------------------------------------------------------
// Payload builders
// ---------------------------------------------------------------------------

/// Build the chat payload: persona, guided examples, then the transcript.
///
/// The transcript is expected to already end with the user's latest message.
pub fn chat_payload(transcript: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(
        transcript
            .len()
            .saturating_add(GUIDED_EXAMPLES.len().saturating_mul(2))
            .saturating_add(1),
    );

    messages.push(ChatMessage::system(PERSONA_PROMPT));
    for (user, assistant) in GUIDED_EXAMPLES {
        messages.push(ChatMessage::user(user));
        messages.push(ChatMessage::assistant(assistant));
    }
    messages.extend(transcript.iter().cloned());
    messages
}

/// Build the profile-extraction payload.
///
/// The transcript is serialized as JSON inside a single user message along
/// with the chain-of-thought preamble and the literal profile schema.
pub fn profile_extraction_payload(transcript: &[ChatMessage]) -> Vec<ChatMessage> {
    let history = serde_json::to_string_pretty(transcript).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to serialize transcript for extraction prompt");
        "[]".to_owned()
    });

    let instruction = format!(
        "Based on the conversation history below, extract the user's complete \
         profile in a structured JSON format.\n\n\
         {PROFILE_COT_PROMPT}\n\n\
         Conversation History:\n{history}\n\n\
         Please extract all available information and return ONLY a valid JSON \
         object that matches this structure:\n{PROFILE_SCHEMA}\n\n\
         If any information is not available, use null or empty arrays as \
         appropriate. Return ONLY the JSON, no additional text."
    );

    vec![
        ChatMessage::system(EXTRACTION_ROLE_PROMPT),
        ChatMessage::user(instruction),
    ]
}

/// Build the plan-generation payload for a validated profile.
pub fn plan_generation_payload(profile: &UserProfile) -> Vec<ChatMessage> {
    let profile_json = serde_json::to_string_pretty(profile).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to serialize profile for plan prompt");
        "{}".to_owned()
    });

    let instruction = format!(
        "Create a personalized weekly diet plan for the user based on their \
         profile.\n\n\
         {PLAN_COT_PROMPT}\n\n\
         User Profile:\n{profile_json}\n\n\
         Please create a complete weekly diet plan with exactly 7 daily plans \
         and return ONLY a valid JSON object that matches this structure:\n\
         {PLAN_SCHEMA}\n\n\
         Make the plan practical, culturally appropriate, and aligned with \
         their goals and preferences. Return ONLY the JSON, no additional text."
    );

    vec![
        ChatMessage::system(PLAN_ROLE_PROMPT),
        ChatMessage::user(instruction),
    ]
}
