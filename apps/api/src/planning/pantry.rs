//! Built-in pantry for dishes composed without a provider.
//!
//! Foods are stored per 100 g and only become canonical `Ingredient`s through
//! `NutrientDensity::portion` inside the randomized search. Templates are
//! filtered against the user's allergies, dislikes and diet before use, and the
//! choice for a given (day, slot) is deterministic.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::fallback::{compose_dish, Candidate, FallbackResult, SearchConfig};
use crate::models::plan::{MacroTotals, NutrientDensity};
use crate::models::profile::UserProfile;

#[derive(Debug)]
pub struct PantryFood {
    pub name: &'static str,
    pub density: NutrientDensity,
    pub serving_g: f64,
    pub tags: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MealKind {
    Breakfast,
    Snack,
    Main,
}

impl MealKind {
    pub fn for_slot(slot: &str) -> Self {
        let slot = slot.to_lowercase();
        if slot.contains("breakfast") {
            MealKind::Breakfast
        } else if slot.contains("snack") {
            MealKind::Snack
        } else {
            MealKind::Main
        }
    }
}

#[derive(Debug)]
pub struct DishTemplate {
    pub name: &'static str,
    pub kind: MealKind,
    pub foods: &'static [&'static str],
}

const DAIRY: &[&str] = &["dairy", "milk", "lactose", "animal"];
const GLUTEN: &[&str] = &["gluten", "wheat"];
const POULTRY: &[&str] = &["poultry", "meat", "animal"];

macro_rules! food {
    ($name:literal, $kcal:literal, $p:literal, $c:literal, $f:literal, $serving:literal, $tags:expr) => {
        PantryFood {
            name: $name,
            density: NutrientDensity::new($kcal, $p, $c, $f),
            serving_g: $serving,
            tags: $tags,
        }
    };
}

pub static FOODS: &[PantryFood] = &[
    food!("rolled oats", 389.0, 16.9, 66.3, 6.9, 50.0, &["oats"]),
    food!("semi-skimmed milk", 50.0, 3.3, 4.8, 2.0, 200.0, DAIRY),
    food!("banana", 89.0, 1.1, 22.8, 0.3, 120.0, &["fruit"]),
    food!("blueberries", 57.0, 0.7, 14.5, 0.3, 80.0, &["fruit", "berry"]),
    food!("plain greek yogurt", 59.0, 10.3, 3.6, 0.4, 170.0, DAIRY),
    food!("eggs", 143.0, 12.6, 0.7, 9.5, 100.0, &["egg", "animal"]),
    food!("whole wheat bread", 247.0, 13.0, 41.0, 3.4, 60.0, GLUTEN),
    food!("avocado", 160.0, 2.0, 8.5, 14.7, 70.0, &["fruit"]),
    food!("almonds", 579.0, 21.2, 21.6, 49.9, 25.0, &["nut", "tree nut", "almond"]),
    food!("peanut butter", 588.0, 25.1, 20.0, 50.4, 20.0, &["peanut", "nut", "legume"]),
    food!("apple", 52.0, 0.3, 13.8, 0.2, 150.0, &["fruit"]),
    food!("cottage cheese", 98.0, 11.1, 3.4, 4.3, 150.0, DAIRY),
    food!("hummus", 166.0, 7.9, 14.3, 9.6, 60.0, &["chickpea", "legume", "sesame"]),
    food!("carrots", 41.0, 0.9, 9.6, 0.2, 100.0, &["vegetable"]),
    food!("chicken breast", 165.0, 31.0, 0.0, 3.6, 130.0, POULTRY),
    food!("turkey breast", 147.0, 30.1, 0.0, 2.1, 120.0, POULTRY),
    food!("salmon fillet", 208.0, 20.4, 0.0, 13.4, 130.0, &["fish", "seafood", "animal"]),
    food!("shrimp", 99.0, 24.0, 0.2, 0.3, 120.0, &["shellfish", "seafood", "crustacean", "animal"]),
    food!("lean beef", 217.0, 26.1, 0.0, 11.8, 120.0, &["beef", "red meat", "meat", "animal"]),
    food!("firm tofu", 144.0, 17.3, 2.8, 8.7, 150.0, &["soy"]),
    food!("cooked lentils", 116.0, 9.0, 20.1, 0.4, 180.0, &["legume"]),
    food!("cooked chickpeas", 164.0, 8.9, 27.4, 2.6, 150.0, &["chickpea", "legume"]),
    food!("cooked brown rice", 123.0, 2.7, 25.6, 1.0, 150.0, &["rice", "grain"]),
    food!("cooked quinoa", 120.0, 4.4, 21.3, 1.9, 150.0, &["grain"]),
    food!("baked sweet potato", 90.0, 2.0, 20.7, 0.2, 180.0, &["vegetable"]),
    food!("whole wheat pasta", 149.0, 5.8, 30.1, 1.7, 160.0, GLUTEN),
    food!("broccoli", 35.0, 2.4, 7.2, 0.4, 120.0, &["vegetable"]),
    food!("spinach", 23.0, 2.9, 3.6, 0.4, 60.0, &["vegetable"]),
    food!("mixed salad greens", 17.0, 1.5, 3.3, 0.2, 80.0, &["vegetable"]),
    food!("tomato", 18.0, 0.9, 3.9, 0.2, 100.0, &["vegetable", "nightshade"]),
    food!("feta cheese", 264.0, 14.2, 4.1, 21.3, 30.0, DAIRY),
    food!("olive oil", 884.0, 0.0, 0.0, 100.0, 10.0, &["oil"]),
];

pub static TEMPLATES: &[DishTemplate] = &[
    DishTemplate {
        name: "Overnight oats with blueberries",
        kind: MealKind::Breakfast,
        foods: &["rolled oats", "semi-skimmed milk", "blueberries"],
    },
    DishTemplate {
        name: "Greek yogurt parfait",
        kind: MealKind::Breakfast,
        foods: &["plain greek yogurt", "blueberries", "rolled oats", "almonds"],
    },
    DishTemplate {
        name: "Scrambled eggs on toast with spinach",
        kind: MealKind::Breakfast,
        foods: &["eggs", "whole wheat bread", "spinach"],
    },
    DishTemplate {
        name: "Avocado toast with eggs",
        kind: MealKind::Breakfast,
        foods: &["whole wheat bread", "avocado", "eggs"],
    },
    DishTemplate {
        name: "Banana peanut butter oats",
        kind: MealKind::Breakfast,
        foods: &["rolled oats", "banana", "peanut butter"],
    },
    DishTemplate {
        name: "Tofu scramble with tomato",
        kind: MealKind::Breakfast,
        foods: &["firm tofu", "spinach", "tomato", "olive oil"],
    },
    DishTemplate {
        name: "Apple with peanut butter",
        kind: MealKind::Snack,
        foods: &["apple", "peanut butter"],
    },
    DishTemplate {
        name: "Greek yogurt with berries",
        kind: MealKind::Snack,
        foods: &["plain greek yogurt", "blueberries"],
    },
    DishTemplate {
        name: "Hummus with carrot sticks",
        kind: MealKind::Snack,
        foods: &["hummus", "carrots"],
    },
    DishTemplate {
        name: "Cottage cheese with banana",
        kind: MealKind::Snack,
        foods: &["cottage cheese", "banana"],
    },
    DishTemplate {
        name: "Almonds and an apple",
        kind: MealKind::Snack,
        foods: &["almonds", "apple"],
    },
    DishTemplate {
        name: "Fruit plate",
        kind: MealKind::Snack,
        foods: &["apple", "banana", "blueberries"],
    },
    DishTemplate {
        name: "Grilled chicken with brown rice and broccoli",
        kind: MealKind::Main,
        foods: &["chicken breast", "cooked brown rice", "broccoli", "olive oil"],
    },
    DishTemplate {
        name: "Baked salmon with sweet potato",
        kind: MealKind::Main,
        foods: &["salmon fillet", "baked sweet potato", "spinach", "olive oil"],
    },
    DishTemplate {
        name: "Beef and quinoa bowl",
        kind: MealKind::Main,
        foods: &["lean beef", "cooked quinoa", "tomato", "olive oil"],
    },
    DishTemplate {
        name: "Tofu stir-fry with rice",
        kind: MealKind::Main,
        foods: &["firm tofu", "cooked brown rice", "broccoli", "olive oil"],
    },
    DishTemplate {
        name: "Lentil and sweet potato bowl",
        kind: MealKind::Main,
        foods: &["cooked lentils", "baked sweet potato", "spinach", "olive oil"],
    },
    DishTemplate {
        name: "Turkey pasta with tomato",
        kind: MealKind::Main,
        foods: &["turkey breast", "whole wheat pasta", "tomato", "olive oil"],
    },
    DishTemplate {
        name: "Chickpea salad with feta",
        kind: MealKind::Main,
        foods: &["cooked chickpeas", "mixed salad greens", "tomato", "feta cheese", "olive oil"],
    },
    DishTemplate {
        name: "Shrimp and quinoa with broccoli",
        kind: MealKind::Main,
        foods: &["shrimp", "cooked quinoa", "broccoli", "olive oil"],
    },
    DishTemplate {
        name: "Vegetable rice bowl",
        kind: MealKind::Main,
        foods: &["cooked brown rice", "broccoli", "carrots", "olive oil"],
    },
];

pub fn food(name: &str) -> Option<&'static PantryFood> {
    FOODS.iter().find(|f| f.name == name)
}

/// Tags a dietary preference rules out.
fn diet_exclusions(preference: Option<&str>) -> &'static [&'static str] {
    let Some(pref) = preference.map(str::to_lowercase) else {
        return &[];
    };
    if pref.contains("vegan") || pref.contains("plant") {
        &["animal"]
    } else if pref.contains("vegetarian") {
        &["meat", "poultry", "fish", "seafood"]
    } else if pref.contains("pescatarian") || pref.contains("pescetarian") {
        &["meat", "poultry"]
    } else {
        &[]
    }
}

impl PantryFood {
    /// Whether an allergy/dislike term or a diet exclusion rules this food out.
    fn is_excluded(&self, terms: &[String], diet: &[&str]) -> bool {
        if self.tags.iter().any(|t| diet.contains(t)) {
            return true;
        }
        terms.iter().any(|term| {
            let term = term.as_str();
            self.name.contains(term)
                || term.contains(self.name)
                || self.tags.iter().any(|t| *t == term || term.contains(t) || t.contains(term))
        })
    }

    pub fn candidate(&self) -> Candidate {
        Candidate {
            name: self.name.to_string(),
            density: self.density,
            serving_g: self.serving_g,
        }
    }
}

impl DishTemplate {
    fn is_allowed(&self, terms: &[String], diet: &[&str]) -> bool {
        self.foods
            .iter()
            .all(|name| food(name).is_some_and(|f| !f.is_excluded(terms, diet)))
    }

    pub fn candidates(&self) -> Vec<Candidate> {
        self.foods
            .iter()
            .filter_map(|name| food(name))
            .map(PantryFood::candidate)
            .collect()
    }
}

/// Templates of `kind` that are safe for `profile`, in declaration order.
pub fn allowed_templates(kind: MealKind, profile: &UserProfile) -> Vec<&'static DishTemplate> {
    let terms = profile.excluded_terms();
    let diet = diet_exclusions(profile.dietary_preference.as_deref());
    TEMPLATES
        .iter()
        .filter(|t| t.kind == kind && t.is_allowed(&terms, diet))
        .collect()
}

fn slot_seed(day_index: usize, slot_index: usize) -> u64 {
    ((day_index as u64) << 32) | slot_index as u64
}

/// Composes a dish for one (day, slot) of a fallback week.
///
/// Falls back to main-course templates when nothing of the slot's own kind is
/// allowed; returns an empty meal only when no template survives the filters.
pub fn compose_for_slot(
    slot: &str,
    day_index: usize,
    slot_index: usize,
    target: &MacroTotals,
    profile: &UserProfile,
) -> FallbackResult {
    let kind = MealKind::for_slot(slot);
    let mut templates = allowed_templates(kind, profile);
    if templates.is_empty() && kind != MealKind::Main {
        templates = allowed_templates(MealKind::Main, profile);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(slot_seed(day_index, slot_index));
    let (name, candidates) = match templates.get((day_index + slot_index) % templates.len().max(1)) {
        Some(template) => (template.name, template.candidates()),
        None => {
            tracing::warn!("No pantry template fits the profile for {slot}");
            ("", Vec::new())
        }
    };
    compose_dish(slot, name, &candidates, target, &SearchConfig::default(), &mut rng)
}
