// Shared prompt fragments.
// Feature prompts live next to the code that uses them (see planning/prompts.rs).
// This file contains only the cross-cutting numeric rules.

/// Appended to every prompt that asks for nutrient values.
pub const NUMERIC_RULES: &str = "\
    RULES FOR NUMBERS: every calories/protein/carbs/fat/quantity value is a plain JSON number, \
    never a string and never a range. Calories are kcal, macros are grams. \
    Nutrient values are ABSOLUTE for the stated quantity, NOT per 100 g.";
