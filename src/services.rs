pub mod auth;
pub mod budget;
pub mod catalog_service;
pub mod customer_service;
pub mod dashboard_service;
pub mod finance_service;
pub mod fiscal_gateway;
pub mod nfe_service;
pub mod order_service;
pub mod payment_gateway;
pub mod payment_service;
pub mod sale_service;
pub mod status_policy;
