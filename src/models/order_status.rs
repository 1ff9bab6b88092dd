use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The twelve statuses an order moves through between checkout and
/// delivery (or cancellation/refund). Stored as strings in the database
/// and rendered as SCREAMING_SNAKE_CASE on the wire.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[sea_orm(string_value = "PENDING_PAYMENT")]
    PendingPayment,
    #[sea_orm(string_value = "PAYMENT_CONFIRMED")]
    PaymentConfirmed,
    #[sea_orm(string_value = "DRIVER_ASSIGNED")]
    DriverAssigned,
    #[sea_orm(string_value = "PICKED_UP")]
    PickedUp,
    #[sea_orm(string_value = "IN_TRANSIT_TO_MERCHANT")]
    InTransitToMerchant,
    #[sea_orm(string_value = "RECEIVED_BY_MERCHANT")]
    ReceivedByMerchant,
    #[sea_orm(string_value = "IN_PROCESS")]
    InProcess,
    #[sea_orm(string_value = "READY_FOR_DELIVERY")]
    ReadyForDelivery,
    #[sea_orm(string_value = "OUT_FOR_DELIVERY")]
    OutForDelivery,
    #[sea_orm(string_value = "DELIVERED")]
    Delivered,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
    #[sea_orm(string_value = "REFUNDED")]
    Refunded,
}

impl OrderStatus {
    /// Status every order is created in.
    pub const fn initial() -> Self {
        OrderStatus::PendingPayment
    }

    /// Legal successor statuses for `self`. Terminal statuses return the
    /// empty slice. The table is fixed and shared by every caller; the
    /// persistence layer must never write a transition outside of it.
    pub fn next_legal_statuses(self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            PendingPayment => &[PaymentConfirmed, Cancelled],
            PaymentConfirmed => &[DriverAssigned, Cancelled],
            DriverAssigned => &[PickedUp, Cancelled],
            PickedUp => &[InTransitToMerchant, Cancelled],
            InTransitToMerchant => &[ReceivedByMerchant, Cancelled],
            ReceivedByMerchant => &[InProcess],
            InProcess => &[ReadyForDelivery],
            ReadyForDelivery => &[OutForDelivery],
            OutForDelivery => &[Delivered, Cancelled],
            Delivered => &[],
            Cancelled => &[Refunded],
            Refunded => &[],
        }
    }

    /// Whether moving from `self` to `target` is a legal transition.
    /// Same-status updates are not in the table and are rejected.
    pub fn can_transition_to(self, target: OrderStatus) -> bool {
        self.next_legal_statuses().contains(&target)
    }

    /// A terminal status has no legal successors.
    pub fn is_terminal(self) -> bool {
        self.next_legal_statuses().is_empty()
    }
}

/// How the order was placed.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    #[sea_orm(string_value = "ON_DEMAND")]
    OnDemand,
    #[sea_orm(string_value = "SCHEDULED")]
    Scheduled,
    #[sea_orm(string_value = "SUBSCRIPTION")]
    Subscription,
}

#[cfg(test)]
mod tests {
    use super::OrderStatus::{self, *};
    use sea_orm::Iterable;

    #[test]
    fn initial_status_is_pending_payment() {
        assert_eq!(OrderStatus::initial(), PendingPayment);
    }

    #[test]
    fn terminal_statuses_have_no_successors() {
        assert!(Delivered.next_legal_statuses().is_empty());
        assert!(Refunded.next_legal_statuses().is_empty());
        assert!(Delivered.is_terminal());
        assert!(Refunded.is_terminal());
    }

    #[test]
    fn only_delivered_and_refunded_are_terminal() {
        let terminals: Vec<OrderStatus> = OrderStatus::iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminals, vec![Delivered, Refunded]);
    }

    #[test]
    fn table_is_deterministic_across_calls() {
        for status in OrderStatus::iter() {
            assert_eq!(status.next_legal_statuses(), status.next_legal_statuses());
        }
    }

    #[test]
    fn canonical_edges_are_present() {
        assert!(PendingPayment.can_transition_to(PaymentConfirmed));
        assert!(PendingPayment.can_transition_to(Cancelled));
        assert!(PaymentConfirmed.can_transition_to(DriverAssigned));
        assert!(DriverAssigned.can_transition_to(PickedUp));
        assert!(PickedUp.can_transition_to(InTransitToMerchant));
        assert!(InTransitToMerchant.can_transition_to(ReceivedByMerchant));
        assert!(ReceivedByMerchant.can_transition_to(InProcess));
        assert!(InProcess.can_transition_to(ReadyForDelivery));
        assert!(ReadyForDelivery.can_transition_to(OutForDelivery));
        assert!(OutForDelivery.can_transition_to(Delivered));
        assert!(OutForDelivery.can_transition_to(Cancelled));
        assert!(Cancelled.can_transition_to(Refunded));
    }

    #[test]
    fn post_delivery_refund_is_not_allowed() {
        assert!(!Delivered.can_transition_to(Refunded));
    }

    #[test]
    fn same_status_updates_are_rejected() {
        for status in OrderStatus::iter() {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn mid_process_statuses_cannot_be_cancelled() {
        assert!(!ReceivedByMerchant.can_transition_to(Cancelled));
        assert!(!InProcess.can_transition_to(Cancelled));
        assert!(!ReadyForDelivery.can_transition_to(Cancelled));
    }

    #[test]
    fn skipping_ahead_is_rejected() {
        assert!(!PendingPayment.can_transition_to(OutForDelivery));
        assert!(!PaymentConfirmed.can_transition_to(Delivered));
        assert!(!PickedUp.can_transition_to(InProcess));
    }

    #[test]
    fn wire_format_is_screaming_snake_case() {
        let json = serde_json::to_string(&InTransitToMerchant).unwrap();
        assert_eq!(json, "\"IN_TRANSIT_TO_MERCHANT\"");
        let parsed: OrderStatus = serde_json::from_str("\"READY_FOR_DELIVERY\"").unwrap();
        assert_eq!(parsed, ReadyForDelivery);
        assert!(serde_json::from_str::<OrderStatus>("\"SHIPPED\"").is_err());
    }
}
