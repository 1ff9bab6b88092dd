use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "DryJet API",
        version = "1.0.0",
        description = r#"
# DryJet Laundry Logistics API

API for managing on-demand laundry and dry-cleaning orders: order intake,
the pickup/processing/delivery lifecycle, and status history.

## Order Lifecycle

Orders move through a fixed set of statuses. Every change is validated
against the transition table and recorded in an append-only status
history; illegal jumps are rejected with `400 Bad Request`.

## Error Handling

Errors use a consistent JSON body with appropriate HTTP status codes:

```json
{
  "error": "Bad Request",
  "message": "Invalid status transition from DELIVERED to PICKED_UP",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

## Pagination

List endpoints accept `page` (default 1) and `limit` (default 20, max 100).
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Orders", description = "Order management endpoints")
    ),
    paths(
        crate::handlers::orders::list_orders,
        crate::handlers::orders::create_order,
        crate::handlers::orders::get_order,
        crate::handlers::orders::get_order_by_short_code,
        crate::handlers::orders::update_order_status,
        crate::handlers::orders::cancel_order,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::ListQuery,
            crate::models::OrderStatus,
            crate::models::OrderType,
            crate::services::orders::CreateOrderRequest,
            crate::services::orders::CreateOrderItem,
            crate::services::orders::UpdateOrderStatusRequest,
            crate::services::orders::OrderResponse,
            crate::services::orders::OrderItemResponse,
            crate::services::orders::StatusHistoryEntry,
            crate::services::orders::OrderSummary,
            crate::services::orders::OrderListResponse,
            crate::handlers::orders::CancelOrderRequest,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
