pub mod customer_repo;
pub use customer_repo::CustomerRepository;
pub mod catalog_repo;
pub use catalog_repo::CatalogRepository;
pub mod order_repo;
pub use order_repo::OrderRepository;
pub mod sale_repo;
pub use sale_repo::SaleRepository;
pub mod payment_repo;
pub use payment_repo::PaymentRepository;
pub mod nfe_repo;
pub use nfe_repo::NfeRepository;
pub mod finance_repo;
pub use finance_repo::FinanceRepository;
pub mod dashboard_repo;
pub use dashboard_repo::DashboardRepository;
