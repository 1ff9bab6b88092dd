use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{OrderStatus, OrderType};

/// Canonical record of a single pickup-clean-deliver transaction.
/// `status` is only ever written through the transition table; `version`
/// backs the compare-and-swap on concurrent status updates.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Display short code (`DJ-XXXX`), derived from `id` at creation.
    /// Not unique; it cycles every 10,000 orders.
    pub order_number: String,

    pub customer_id: Uuid,
    pub merchant_id: Uuid,
    pub merchant_location_id: Uuid,
    pub pickup_driver_id: Option<Uuid>,
    pub delivery_driver_id: Option<Uuid>,

    pub order_type: OrderType,
    pub status: OrderStatus,

    pub subtotal: Decimal,
    pub tax: Decimal,
    pub service_fee: Decimal,
    pub delivery_fee: Decimal,
    pub tip: Decimal,
    pub discount: Decimal,
    pub total_amount: Decimal,

    pub pickup_address_id: Uuid,
    pub delivery_address_id: Uuid,

    pub scheduled_pickup_at: Option<DateTime<Utc>>,
    pub actual_pickup_at: Option<DateTime<Utc>>,
    pub scheduled_delivery_at: Option<DateTime<Utc>>,
    pub actual_delivery_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Optimistic-concurrency counter, bumped on every status write.
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
    #[sea_orm(has_many = "super::order_status_history::Entity")]
    StatusHistory,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::order_status_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StatusHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
