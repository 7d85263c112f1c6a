// src/models/dashboard.rs

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::models::service_order::OrderStatus;

#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: OrderStatus,
    pub quantidade: i64,
}

// 1. Resumo do Mês (Os Cards do Topo)
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub ordens_por_status: Vec<StatusCount>,
    pub receitas_mes: Decimal,
    pub despesas_mes: Decimal,
    pub saldo_mes: Decimal,
    pub vendas_finalizadas_mes: i64,
    pub nfes_autorizadas_mes: i64,
}

// 2. Gráfico de Receitas (Últimos 30 dias)
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevenueChartEntry {
    pub date: Option<String>, // YYYY-MM-DD
    pub total: Option<Decimal>,
}
