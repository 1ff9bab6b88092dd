pub mod order_status;
pub mod short_code;

pub use order_status::{OrderStatus, OrderType};
pub use short_code::{generate_short_code, is_valid_short_code, short_code_suffix};
