use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::plan::WeeklyMealPlan;

/// One row of `weekly_meal_plans`. Exactly one per user; replaced wholesale on write.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StoredPlanRow {
    pub user_id: Uuid,
    pub plan: Json<WeeklyMealPlan>,
    pub updated_at: DateTime<Utc>,
}
