//! `SeaORM` Entity for movements table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{MovementType, PaymentMethod};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub movement_type: MovementType,
    pub category_id: Uuid,
    pub description: String,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub amount: Decimal,
    pub paid_at: Date,
    pub social_year_id: Option<Uuid>,
    pub member_id: Option<Uuid>,
    pub payment_method: Option<PaymentMethod>,
    pub receipt_number: Option<String>,
    pub notes: Option<String>,
    #[sea_orm(unique)]
    pub source_fee_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::movement_categories::Entity",
        from = "Column::CategoryId",
        to = "super::movement_categories::Column::Id"
    )]
    MovementCategories,
    #[sea_orm(
        belongs_to = "super::fees::Entity",
        from = "Column::SourceFeeId",
        to = "super::fees::Column::Id"
    )]
    Fees,
}

impl Related<super::movement_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MovementCategories.def()
    }
}

impl Related<super::fees::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Fees.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
