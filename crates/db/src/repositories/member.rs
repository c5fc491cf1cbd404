//! Member repository.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder, QuerySelect,
    Set,
};
use sodalis_core::fee::Member;
use sodalis_shared::types::{PageRequest, PageResponse};
use uuid::Uuid;

use super::{RepositoryError, violation};
use crate::entities::members;
use crate::tenant::TenantConnection;

impl From<members::Model> for Member {
    fn from(model: members::Model) -> Self {
        Self {
            id: model.id,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

/// Input for registering a member.
#[derive(Debug, Clone)]
pub struct CreateMemberInput {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact address.
    pub email: Option<String>,
}

impl CreateMemberInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        let mut fields = Vec::new();
        if self.first_name.trim().is_empty() {
            fields.push(violation("first_name", "required", "first name is required"));
        }
        if self.last_name.trim().is_empty() {
            fields.push(violation("last_name", "required", "last name is required"));
        }
        if let Some(email) = self.email.as_deref()
            && !email.trim().is_empty()
            && !email.contains('@')
        {
            fields.push(violation("email", "invalid", "email address is not valid"));
        }
        if fields.is_empty() {
            Ok(())
        } else {
            Err(RepositoryError::Validation(fields))
        }
    }
}

/// Member repository for registry operations.
#[derive(Debug, Clone)]
pub struct MemberRepository {
    db: DatabaseConnection,
    schema: String,
}

impl MemberRepository {
    /// Creates a new member repository for the given tenant schema.
    #[must_use]
    pub const fn new(db: DatabaseConnection, schema: String) -> Self {
        Self { db, schema }
    }

    /// Registers a member.
    ///
    /// # Errors
    ///
    /// Returns a validation error listing every rejected field, or a
    /// database error.
    pub async fn create(&self, input: CreateMemberInput) -> Result<Member, RepositoryError> {
        input.validate()?;

        let conn = TenantConnection::begin(&self.db, &self.schema).await?;
        let model = members::ActiveModel {
            id: Set(Uuid::now_v7()),
            first_name: Set(input.first_name.trim().to_string()),
            last_name: Set(input.last_name.trim().to_string()),
            email: Set(input
                .email
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())),
            created_at: Set(Utc::now().into()),
        }
        .insert(conn.transaction())
        .await?;
        conn.commit().await?;

        Ok(model.into())
    }

    /// Finds a member by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Member>, RepositoryError> {
        let conn = TenantConnection::begin(&self.db, &self.schema).await?;
        let model = members::Entity::find_by_id(id).one(conn.transaction()).await?;
        conn.commit().await?;
        Ok(model.map(Member::from))
    }

    /// Lists members ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, page: &PageRequest) -> Result<PageResponse<Member>, RepositoryError> {
        let conn = TenantConnection::begin(&self.db, &self.schema).await?;
        let total = members::Entity::find().count(conn.transaction()).await?;
        let rows = members::Entity::find()
            .order_by_asc(members::Column::LastName)
            .order_by_asc(members::Column::FirstName)
            .offset(page.offset())
            .limit(page.limit())
            .all(conn.transaction())
            .await?;
        conn.commit().await?;

        let data = rows.into_iter().map(Member::from).collect();
        Ok(PageResponse::new(data, page, total))
    }
}
