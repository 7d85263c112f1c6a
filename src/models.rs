pub mod auth;
pub mod catalog;
pub mod customer;
pub mod dashboard;
pub mod finance;
pub mod nfe;
pub mod payment;
pub mod sale;
pub mod service_order;
