//! Nutriplan — an AI dietitian session engine.
//!
//! Turns a turn-by-turn conversation with an LLM dietitian persona into two
//! validated artifacts: a [`types::UserProfile`] and a seven-day
//! [`types::WeeklyDietPlan`], then assembles them into an exportable document.
//!
//! See `DESIGN.md` for full architecture documentation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod assembler;
pub mod config;
pub mod dietitian;
pub mod export;
pub mod extract;
pub mod logging;
pub mod prompt;
pub mod providers;
pub mod session;
pub mod types;
