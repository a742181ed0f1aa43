//! Donations recorded against an NGO.
//!
//! Only the webhook recorder writes `completed` rows; the pair
//! `(transaction_hash, status)` is unique so a charge code completes at most
//! one donation.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "donations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub donor_id: i64,
    pub ngo_id: i64,
    pub amount: Decimal,
    pub currency: String,
    /// Processor charge code for completed rows, client reference otherwise
    pub transaction_hash: String,
    pub status: DonationStatus,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ngo::Entity",
        from = "Column::NgoId",
        to = "super::ngo::Column::Id"
    )]
    Ngo,
}

impl Related<super::ngo::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ngo.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
