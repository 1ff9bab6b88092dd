use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, NotSet, PaginatorTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{
        order::{self, Entity as OrderEntity},
        order_item::{self, Entity as OrderItemEntity},
        order_status_history::{self, Entity as StatusHistoryEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::{generate_short_code, is_valid_short_code, OrderStatus, OrderType},
};

/// Request/response types for the order service.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    pub customer_id: Uuid,
    pub merchant_id: Uuid,
    pub merchant_location_id: Uuid,
    pub order_type: OrderType,
    pub pickup_address_id: Uuid,
    pub delivery_address_id: Uuid,
    #[validate(length(min = 1, message = "Order must have at least one item"))]
    pub items: Vec<CreateOrderItem>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub service_fee: Decimal,
    pub delivery_fee: Decimal,
    pub tip: Decimal,
    pub discount: Decimal,
    pub total_amount: Decimal,
    pub scheduled_pickup_at: Option<DateTime<Utc>>,
    pub scheduled_delivery_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderItem {
    pub service_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub instructions: Option<String>,
    pub photo_url: Option<String>,
    pub fabric: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    #[validate(length(max = 1024, message = "Notes must be at most 1024 characters"))]
    pub notes: Option<String>,
    /// Order version the caller last observed. When set, the update only
    /// applies if the order has not changed since; a stale value fails
    /// with a conflict.
    #[serde(default)]
    pub version: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub service_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub instructions: Option<String>,
    pub photo_url: Option<String>,
    pub fabric: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusHistoryEntry {
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Full order representation, including line items in insertion order
/// and the append-only status history in transition order.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: i64,
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
    pub version: i32,
    pub items: Vec<OrderItemResponse>,
    pub status_history: Vec<StatusHistoryEntry>,
}

/// Lighter representation for list endpoints.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderSummary {
    pub id: i64,
    pub order_number: String,
    pub customer_id: Uuid,
    pub merchant_id: Uuid,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderListResponse {
    pub items: Vec<OrderSummary>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

/// The monetary breakdown must balance: every component non-negative and
/// `total = subtotal + tax + service_fee + delivery_fee + tip - discount`.
fn validate_monetary_breakdown(request: &CreateOrderRequest) -> Result<(), ServiceError> {
    let components = [
        ("subtotal", request.subtotal),
        ("tax", request.tax),
        ("service_fee", request.service_fee),
        ("delivery_fee", request.delivery_fee),
        ("tip", request.tip),
        ("discount", request.discount),
        ("total_amount", request.total_amount),
    ];
    for (name, value) in components {
        if value < Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "{} must be non-negative",
                name
            )));
        }
    }

    let expected = request.subtotal + request.tax + request.service_fee + request.delivery_fee
        + request.tip
        - request.discount;
    if request.total_amount != expected {
        return Err(ServiceError::ValidationError(format!(
            "total_amount {} does not match monetary breakdown (expected {})",
            request.total_amount, expected
        )));
    }

    Ok(())
}

/// Line items need a positive quantity and a consistent extended price.
fn validate_items(items: &[CreateOrderItem]) -> Result<(), ServiceError> {
    for (idx, item) in items.iter().enumerate() {
        if item.quantity < 1 {
            return Err(ServiceError::ValidationError(format!(
                "item {} quantity must be positive",
                idx
            )));
        }
        if item.unit_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "item {} unit_price must be non-negative",
                idx
            )));
        }
        let expected = item.unit_price * Decimal::from(item.quantity);
        if item.total_price != expected {
            return Err(ServiceError::ValidationError(format!(
                "item {} total_price {} does not equal quantity * unit_price ({})",
                idx, item.total_price, expected
            )));
        }
    }
    Ok(())
}

/// Service owning the canonical order records. All status writes go
/// through the transition table; nothing else mutates `orders.status`.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a new order in `PENDING_PAYMENT` together with its line
    /// items, in one transaction. The short code is derived from the
    /// assigned id before commit.
    #[instrument(skip(self, request), fields(customer_id = %request.customer_id, merchant_id = %request.merchant_id))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;
        validate_monetary_breakdown(&request)?;
        validate_items(&request.items)?;

        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        let order_active = order::ActiveModel {
            id: NotSet,
            // Derived from the assigned id below.
            order_number: Set(String::new()),
            customer_id: Set(request.customer_id),
            merchant_id: Set(request.merchant_id),
            merchant_location_id: Set(request.merchant_location_id),
            pickup_driver_id: Set(None),
            delivery_driver_id: Set(None),
            order_type: Set(request.order_type),
            status: Set(OrderStatus::initial()),
            subtotal: Set(request.subtotal),
            tax: Set(request.tax),
            service_fee: Set(request.service_fee),
            delivery_fee: Set(request.delivery_fee),
            tip: Set(request.tip),
            discount: Set(request.discount),
            total_amount: Set(request.total_amount),
            pickup_address_id: Set(request.pickup_address_id),
            delivery_address_id: Set(request.delivery_address_id),
            scheduled_pickup_at: Set(request.scheduled_pickup_at),
            actual_pickup_at: Set(None),
            scheduled_delivery_at: Set(request.scheduled_delivery_at),
            actual_delivery_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            version: Set(1),
        };

        let inserted = order_active.insert(&txn).await.map_err(|e| {
            error!(error = %e, "Failed to insert order");
            ServiceError::DatabaseError(e)
        })?;
        let order_id = inserted.id;

        let mut with_code: order::ActiveModel = inserted.into();
        with_code.order_number = Set(generate_short_code(order_id));
        let order_model = with_code.update(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to persist order short code");
            ServiceError::DatabaseError(e)
        })?;

        let mut item_models = Vec::with_capacity(request.items.len());
        for (position, item) in request.items.iter().enumerate() {
            let item_active = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                service_id: Set(item.service_id),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                total_price: Set(item.total_price),
                instructions: Set(item.instructions.clone()),
                photo_url: Set(item.photo_url.clone()),
                fabric: Set(item.fabric.clone()),
                position: Set(position as i32),
                created_at: Set(now),
            };
            let item_model = item_active.insert(&txn).await.map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to insert order item");
                ServiceError::DatabaseError(e)
            })?;
            item_models.push(item_model);
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit order creation");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order_id, order_number = %order_model.order_number, "Order created");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::OrderCreated(order_id)).await {
                warn!(error = %e, order_id = %order_id, "Failed to send order created event");
            }
        }

        // History records transitions; a fresh order has none yet.
        Ok(assemble_response(order_model, item_models, Vec::new()))
    }

    /// Retrieves an order with items and status history.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: i64) -> Result<Option<OrderResponse>, ServiceError> {
        let db = &*self.db_pool;

        let Some(order_model) = OrderEntity::find_by_id(order_id).one(db).await? else {
            return Ok(None);
        };

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::Position)
            .all(db)
            .await?;

        let history = StatusHistoryEntity::find()
            .filter(order_status_history::Column::OrderId.eq(order_id))
            .order_by_asc(order_status_history::Column::Id)
            .all(db)
            .await?;

        Ok(Some(assemble_response(order_model, items, history)))
    }

    /// Looks up an order by its display short code. Codes collide across
    /// the 10,000-order cycle; the newest match wins.
    #[instrument(skip(self))]
    pub async fn get_order_by_short_code(
        &self,
        short_code: &str,
    ) -> Result<Option<OrderResponse>, ServiceError> {
        if !is_valid_short_code(short_code) {
            return Err(ServiceError::ValidationError(format!(
                "{} is not a valid order short code",
                short_code
            )));
        }

        let db = &*self.db_pool;
        let Some(order_model) = OrderEntity::find()
            .filter(order::Column::OrderNumber.eq(short_code))
            .order_by_desc(order::Column::Id)
            .one(db)
            .await?
        else {
            return Ok(None);
        };

        self.get_order(order_model.id).await
    }

    /// Lists orders, newest first, with optional status and customer
    /// filters.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        page: u64,
        limit: u64,
        status: Option<OrderStatus>,
        customer_id: Option<Uuid>,
    ) -> Result<OrderListResponse, ServiceError> {
        let db = &*self.db_pool;
        let page = page.max(1);
        let limit = limit.clamp(1, 100);

        let mut query = OrderEntity::find().order_by_desc(order::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status));
        }
        if let Some(customer_id) = customer_id {
            query = query.filter(order::Column::CustomerId.eq(customer_id));
        }

        let paginator = query.paginate(db, limit);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page - 1).await?;

        let items = orders
            .into_iter()
            .map(|m| OrderSummary {
                id: m.id,
                order_number: m.order_number,
                customer_id: m.customer_id,
                merchant_id: m.merchant_id,
                order_type: m.order_type,
                status: m.status,
                total_amount: m.total_amount,
                created_at: m.created_at,
                updated_at: m.updated_at,
            })
            .collect();

        Ok(OrderListResponse {
            items,
            total,
            page,
            limit,
        })
    }

    /// Advances an order's status. The target must be a legal successor
    /// of the current status; the write is a compare-and-swap on the
    /// order's version so two racing updates cannot both apply from the
    /// same stale read. Exactly one history row is appended per accepted
    /// transition; a rejected transition writes nothing. Callers may pin
    /// the version they last observed to detect intervening writes.
    #[instrument(skip(self, request), fields(order_id = %order_id, target = %request.status))]
    pub async fn update_order_status(
        &self,
        order_id: i64,
        request: UpdateOrderStatusRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to start transaction for status update");
            ServiceError::DatabaseError(e)
        })?;

        let order_model = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                warn!(order_id = %order_id, "Order not found for status update");
                ServiceError::NotFound(format!("Order {} not found", order_id))
            })?;

        let current = order_model.status;
        let target = request.status;

        if !current.can_transition_to(target) {
            info!(
                order_id = %order_id,
                from = %current,
                to = %target,
                "Rejected illegal status transition"
            );
            return Err(ServiceError::InvalidTransition {
                from: current,
                to: target,
            });
        }

        // Compare-and-swap against the version the caller saw, or the one
        // just read when the caller did not pin one.
        let expected_version = request.version.unwrap_or(order_model.version);

        let mut update = OrderEntity::update_many()
            .col_expr(order::Column::Status, Expr::value(target))
            .col_expr(order::Column::UpdatedAt, Expr::value(now))
            .col_expr(order::Column::Version, Expr::value(expected_version + 1))
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Version.eq(expected_version));

        // Entering these statuses records the corresponding actual time.
        match target {
            OrderStatus::PickedUp => {
                update = update.col_expr(order::Column::ActualPickupAt, Expr::value(Some(now)));
            }
            OrderStatus::Delivered => {
                update = update.col_expr(order::Column::ActualDeliveryAt, Expr::value(Some(now)));
            }
            _ => {}
        }

        let result = update.exec(&txn).await?;
        if result.rows_affected == 0 {
            warn!(order_id = %order_id, "Stale version during status update");
            return Err(ServiceError::ConcurrentModification(order_id));
        }

        let history_active = order_status_history::ActiveModel {
            id: NotSet,
            order_id: Set(order_id),
            status: Set(target),
            notes: Set(request.notes.clone()),
            created_at: Set(now),
        };
        history_active.insert(&txn).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit status update");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order_id, from = %current, to = %target, "Order status updated");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::OrderStatusChanged {
                    order_id,
                    from: current,
                    to: target,
                })
                .await
            {
                warn!(error = %e, order_id = %order_id, "Failed to send status changed event");
            }
        }

        self.get_order(order_id).await?.ok_or_else(|| {
            ServiceError::InternalError(format!("Order {} vanished after update", order_id))
        })
    }

    /// Cancels an order through the regular transition path.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn cancel_order(
        &self,
        order_id: i64,
        reason: Option<String>,
    ) -> Result<OrderResponse, ServiceError> {
        let response = self
            .update_order_status(
                order_id,
                UpdateOrderStatusRequest {
                    status: OrderStatus::Cancelled,
                    notes: reason,
                    version: None,
                },
            )
            .await?;

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::OrderCancelled(order_id)).await {
                warn!(error = %e, order_id = %order_id, "Failed to send order cancelled event");
            }
        }

        Ok(response)
    }
}

fn assemble_response(
    order_model: order::Model,
    items: Vec<order_item::Model>,
    history: Vec<order_status_history::Model>,
) -> OrderResponse {
    OrderResponse {
        id: order_model.id,
        order_number: order_model.order_number,
        customer_id: order_model.customer_id,
        merchant_id: order_model.merchant_id,
        merchant_location_id: order_model.merchant_location_id,
        pickup_driver_id: order_model.pickup_driver_id,
        delivery_driver_id: order_model.delivery_driver_id,
        order_type: order_model.order_type,
        status: order_model.status,
        subtotal: order_model.subtotal,
        tax: order_model.tax,
        service_fee: order_model.service_fee,
        delivery_fee: order_model.delivery_fee,
        tip: order_model.tip,
        discount: order_model.discount,
        total_amount: order_model.total_amount,
        pickup_address_id: order_model.pickup_address_id,
        delivery_address_id: order_model.delivery_address_id,
        scheduled_pickup_at: order_model.scheduled_pickup_at,
        actual_pickup_at: order_model.actual_pickup_at,
        scheduled_delivery_at: order_model.scheduled_delivery_at,
        actual_delivery_at: order_model.actual_delivery_at,
        created_at: order_model.created_at,
        updated_at: order_model.updated_at,
        version: order_model.version,
        items: items
            .into_iter()
            .map(|m| OrderItemResponse {
                id: m.id,
                service_id: m.service_id,
                quantity: m.quantity,
                unit_price: m.unit_price,
                total_price: m.total_price,
                instructions: m.instructions,
                photo_url: m.photo_url,
                fabric: m.fabric,
            })
            .collect(),
        status_history: history
            .into_iter()
            .map(|m| StatusHistoryEntry {
                status: m.status,
                notes: m.notes,
                created_at: m.created_at,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_request() -> CreateOrderRequest {
        CreateOrderRequest {
            customer_id: Uuid::new_v4(),
            merchant_id: Uuid::new_v4(),
            merchant_location_id: Uuid::new_v4(),
            order_type: OrderType::OnDemand,
            pickup_address_id: Uuid::new_v4(),
            delivery_address_id: Uuid::new_v4(),
            items: vec![CreateOrderItem {
                service_id: Uuid::new_v4(),
                quantity: 2,
                unit_price: dec!(5.00),
                total_price: dec!(10.00),
                instructions: None,
                photo_url: None,
                fabric: Some("wool".to_string()),
            }],
            subtotal: dec!(10.00),
            tax: dec!(0.80),
            service_fee: dec!(1.00),
            delivery_fee: dec!(3.00),
            tip: dec!(2.00),
            discount: dec!(1.80),
            total_amount: dec!(15.00),
            scheduled_pickup_at: None,
            scheduled_delivery_at: None,
        }
    }

    #[test]
    fn balanced_breakdown_passes() {
        assert!(validate_monetary_breakdown(&sample_request()).is_ok());
    }

    #[test]
    fn mismatched_total_is_rejected() {
        let mut request = sample_request();
        request.total_amount = dec!(20.00);
        assert!(matches!(
            validate_monetary_breakdown(&request),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn negative_component_is_rejected() {
        let mut request = sample_request();
        request.tip = dec!(-1.00);
        assert!(validate_monetary_breakdown(&request).is_err());
    }

    #[test]
    fn discount_subtracts_from_total() {
        let mut request = sample_request();
        request.discount = dec!(0.00);
        request.total_amount = dec!(16.80);
        assert!(validate_monetary_breakdown(&request).is_ok());
    }

    #[test]
    fn item_extended_price_must_match() {
        let mut items = sample_request().items;
        items[0].total_price = dec!(9.00);
        assert!(validate_items(&items).is_err());
    }

    #[test]
    fn zero_quantity_item_is_rejected() {
        let mut items = sample_request().items;
        items[0].quantity = 0;
        assert!(validate_items(&items).is_err());
    }
}
