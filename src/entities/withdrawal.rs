use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "withdrawals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub ngo_id: i64,
    pub amount: Decimal,
    #[sea_orm(column_type = "Text")]
    pub purpose: String,
    pub status: WithdrawalStatus,
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
