//! Services: generic CRUD over the SQL builder, plus the account, link, review, order and promotion operations built on it.

mod accounts;
mod crud;
mod links;
mod orders;
mod promotions;
mod reviews;
mod validation;

pub use accounts::AccountService;
pub use crud::CrudService;
pub use links::LinkService;
pub use orders::{order_number, order_total, OrderService};
pub use promotions::{coupon_problem, discount_for, round_money, AppliedCoupon, PromotionService};
pub use reviews::ReviewService;
pub use validation::RequestValidator;
