//! Layout negotiation for new arrays.
//!
//! `order` holds the symbolic order tokens and their pure resolution against
//! source contiguity flags, `strides` the stride arithmetic, and `resolver`
//! turns a resolution into a concrete allocation plan.

pub mod order;
pub mod resolver;
pub mod strides;

pub use order::{resolve_order, Order, OrderResolution, ResolvedOrder};
pub use resolver::{plan_like, LayoutPlan};
pub use strides::{keep_order_strides, ContiguityFlags};
