//! Social year repository.

use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use sodalis_core::fee::SocialYear;
use uuid::Uuid;

use super::{RepositoryError, violation};
use crate::entities::social_years;
use crate::tenant::TenantConnection;

impl From<social_years::Model> for SocialYear {
    fn from(model: social_years::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            start_date: model.start_date,
            end_date: model.end_date,
            is_current: model.is_current,
        }
    }
}

/// Input for opening a social year.
#[derive(Debug, Clone)]
pub struct CreateSocialYearInput {
    /// Display name, e.g. "2024/2025".
    pub name: String,
    /// First day.
    pub start_date: NaiveDate,
    /// Last day.
    pub end_date: NaiveDate,
    /// Make this the current year. Clears the flag on every other year.
    pub is_current: bool,
}

impl CreateSocialYearInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        let mut fields = Vec::new();
        if self.name.trim().is_empty() {
            fields.push(violation("name", "required", "name is required"));
        }
        if self.end_date <= self.start_date {
            fields.push(violation(
                "end_date",
                "invalid_range",
                "end date must be after start date",
            ));
        }
        if fields.is_empty() {
            Ok(())
        } else {
            Err(RepositoryError::Validation(fields))
        }
    }
}

/// Social year repository.
#[derive(Debug, Clone)]
pub struct SocialYearRepository {
    db: DatabaseConnection,
    schema: String,
}

impl SocialYearRepository {
    /// Creates a new social year repository for the given tenant schema.
    #[must_use]
    pub const fn new(db: DatabaseConnection, schema: String) -> Self {
        Self { db, schema }
    }

    /// Opens a social year.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty name or an inverted range,
    /// or a database error (including a duplicate name).
    pub async fn create(
        &self,
        input: CreateSocialYearInput,
    ) -> Result<SocialYear, RepositoryError> {
        input.validate()?;

        let conn = TenantConnection::begin(&self.db, &self.schema).await?;
        if input.is_current {
            social_years::Entity::update_many()
                .col_expr(social_years::Column::IsCurrent, Expr::value(false))
                .filter(social_years::Column::IsCurrent.eq(true))
                .exec(conn.transaction())
                .await?;
        }
        let model = social_years::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(input.name.trim().to_string()),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            is_current: Set(input.is_current),
            created_at: Set(Utc::now().into()),
        }
        .insert(conn.transaction())
        .await?;
        conn.commit().await?;

        Ok(model.into())
    }

    /// Finds a social year by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<SocialYear>, RepositoryError> {
        let conn = TenantConnection::begin(&self.db, &self.schema).await?;
        let model = social_years::Entity::find_by_id(id).one(conn.transaction()).await?;
        conn.commit().await?;
        Ok(model.map(SocialYear::from))
    }

    /// The year new fees default to, if one is flagged.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_current(&self) -> Result<Option<SocialYear>, RepositoryError> {
        let conn = TenantConnection::begin(&self.db, &self.schema).await?;
        let model = social_years::Entity::find()
            .filter(social_years::Column::IsCurrent.eq(true))
            .one(conn.transaction())
            .await?;
        conn.commit().await?;
        Ok(model.map(SocialYear::from))
    }

    /// Lists every social year, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<SocialYear>, RepositoryError> {
        let conn = TenantConnection::begin(&self.db, &self.schema).await?;
        let rows = social_years::Entity::find()
            .order_by_desc(social_years::Column::StartDate)
            .all(conn.transaction())
            .await?;
        conn.commit().await?;
        Ok(rows.into_iter().map(SocialYear::from).collect())
    }
}
