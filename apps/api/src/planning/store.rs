//! Persistence collaborator for weekly plans: one JSON document per user,
//! last write wins.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::plan::WeeklyMealPlan;
use crate::models::stored_plan::StoredPlanRow;

#[async_trait]
pub trait PlanStore: Send + Sync {
    /// `None` when the user has no plan yet; that is not an error.
    async fn get(&self, user_id: Uuid) -> Result<Option<WeeklyMealPlan>, AppError>;

    /// Inserts or fully replaces the user's plan.
    async fn upsert(&self, user_id: Uuid, plan: &WeeklyMealPlan) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PgPlanStore {
    pool: PgPool,
}

impl PgPlanStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlanStore for PgPlanStore {
    async fn get(&self, user_id: Uuid) -> Result<Option<WeeklyMealPlan>, AppError> {
        let row = sqlx::query_as::<_, StoredPlanRow>(
            "SELECT user_id, plan, updated_at FROM weekly_meal_plans WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            debug!("Loaded weekly plan for user {} (updated {})", r.user_id, r.updated_at);
            r.plan.0
        }))
    }

    async fn upsert(&self, user_id: Uuid, plan: &WeeklyMealPlan) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO weekly_meal_plans (user_id, plan, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id) DO UPDATE
            SET plan = EXCLUDED.plan, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user_id)
        .bind(Json(plan))
        .execute(&self.pool)
        .await?;

        debug!("Stored weekly plan for user {user_id}");
        Ok(())
    }
}
