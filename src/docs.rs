// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Clientes ---
        handlers::customers::create_customer,
        handlers::customers::list_customers,
        handlers::customers::get_customer,
        handlers::customers::update_customer,
        handlers::customers::delete_customer,
        handlers::customers::create_vehicle,
        handlers::customers::list_vehicles,
        handlers::customers::update_vehicle,
        handlers::customers::delete_vehicle,

        // --- Catálogo ---
        handlers::catalog::create_product,
        handlers::catalog::list_products,
        handlers::catalog::get_product,
        handlers::catalog::update_product,
        handlers::catalog::stock_entry,
        handlers::catalog::create_service,
        handlers::catalog::list_services,
        handlers::catalog::update_service,

        // --- Ordens de serviço ---
        handlers::orders::create_order,
        handlers::orders::list_orders,
        handlers::orders::get_board,
        handlers::orders::get_order,
        handlers::orders::update_order,
        handlers::orders::save_budget,
        handlers::orders::transition_order,
        handlers::orders::get_actions,

        // --- Vendas ---
        handlers::sales::create_sale,
        handlers::sales::replace_items,
        handlers::sales::transition_sale,
        handlers::sales::list_sales,
        handlers::sales::get_sale,

        // --- Pagamentos ---
        handlers::payments::start_order_payment,
        handlers::payments::start_sale_payment,
        handlers::payments::get_payment,
        handlers::payments::cancel_payment,

        // --- Financeiro ---
        handlers::finance::create_transaction,
        handlers::finance::list_transactions,
        handlers::finance::cash_flow_summary,
        handlers::finance::delete_transaction,

        // --- NF-e ---
        handlers::nfe::create_nfe,
        handlers::nfe::list_nfes,
        handlers::nfe::get_nfe,
        handlers::nfe::authorize_nfe,
        handlers::nfe::cancel_nfe,
        handlers::nfe::nfe_status,
        handlers::nfe::delete_nfe,

        // --- Dashboard ---
        handlers::dashboard::get_summary,
        handlers::dashboard::get_revenue_chart,
    ),
    components(
        schemas(
            // --- Clientes ---
            models::customer::TipoPessoa,
            models::customer::CustomerStatus,
            models::customer::Customer,
            models::customer::Vehicle,

            // --- Catálogo ---
            models::catalog::Product,
            models::catalog::Service,

            // --- Ordens de serviço ---
            models::service_order::OrderStatus,
            models::service_order::LineKind,
            models::service_order::Order,
            models::service_order::OrderItem,
            models::service_order::OrderSummary,
            models::service_order::OrderDetail,
            models::service_order::OrderAction,
            models::service_order::BoardColumn,

            // --- Vendas ---
            models::sale::SaleStatus,
            models::sale::Sale,
            models::sale::SaleItem,
            models::sale::SaleDetail,

            // --- Pagamentos ---
            models::payment::PaymentMethod,
            models::payment::PaymentStatus,
            models::payment::Payment,

            // --- Financeiro ---
            models::finance::TransactionKind,
            models::finance::Transaction,
            models::finance::CashFlowSummary,

            // --- NF-e ---
            models::nfe::NfeStatus,
            models::nfe::Nfe,
            models::nfe::NfeItem,
            models::nfe::NfeDetail,

            // --- Dashboard ---
            models::dashboard::StatusCount,
            models::dashboard::DashboardSummary,
            models::dashboard::RevenueChartEntry,

            // --- Payloads ---
            services::budget::BudgetLineInput,
            services::sale_service::SaleLineInput,
            handlers::customers::CustomerPayload,
            handlers::customers::VehiclePayload,
            handlers::catalog::ProductPayload,
            handlers::catalog::StockEntryPayload,
            handlers::catalog::ServicePayload,
            handlers::orders::OrderHeaderPayload,
            handlers::orders::CreateOrderPayload,
            handlers::orders::BudgetPayload,
            handlers::orders::OrderTransitionPayload,
            handlers::sales::CreateSalePayload,
            handlers::sales::SaleItemsPayload,
            handlers::sales::SaleTransitionPayload,
            handlers::payments::StartPaymentPayload,
            handlers::finance::CreateTransactionPayload,
            handlers::nfe::CreateNfePayload,
            handlers::nfe::CancelNfePayload,
        )
    ),
    tags(
        (name = "Clientes", description = "Cadastro de Clientes e Veículos"),
        (name = "Catálogo", description = "Peças (com estoque) e Serviços"),
        (name = "Ordens de Serviço", description = "Orçamento, Aprovação e Execução das OS"),
        (name = "Vendas", description = "Vendas de Balcão"),
        (name = "Pagamentos", description = "Cobrança via Dinheiro, PIX e Cartão"),
        (name = "Financeiro", description = "Lançamentos e Fluxo de Caixa"),
        (name = "NF-e", description = "Emissão e Cancelamento de Notas Fiscais"),
        (name = "Dashboard", description = "Indicadores e Gráficos Gerenciais")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
