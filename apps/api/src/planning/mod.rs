// Meal-plan generation and macro optimization.
// Prompt → provider chain → schema repair → (fallback) → merge → store.

pub mod fallback;
pub mod generator;
pub mod handlers;
pub mod merge;
pub mod pantry;
pub mod prompt_builder;
pub mod prompts;
pub mod responses;
pub mod schema;
pub mod store;
