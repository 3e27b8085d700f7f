mod coupon;

pub use coupon::*;
