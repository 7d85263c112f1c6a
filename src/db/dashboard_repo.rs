// src/db/dashboard_repo.rs

use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::dashboard::{DashboardSummary, RevenueChartEntry, StatusCount},
};

#[derive(Clone)]
pub struct DashboardRepository {
    pool: PgPool,
}

impl DashboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // 1. Resumo Geral
    pub async fn get_summary(&self) -> Result<DashboardSummary, AppError> {
        // Snapshot consistente dos números
        let mut tx = self.pool.begin().await?;

        // A. Ordens por status
        let ordens_por_status = sqlx::query_as::<_, StatusCount>(
            r#"
            SELECT status, COUNT(*) AS quantidade
            FROM orders
            GROUP BY status
            ORDER BY status
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        // B. Entradas e saídas do mês corrente
        let (receitas_mes, despesas_mes): (Decimal, Decimal) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(valor) FILTER (WHERE tipo IN ('RECEITA', 'DEPOSITO')), 0),
                COALESCE(SUM(valor) FILTER (WHERE tipo IN ('DESPESA', 'SAQUE')), 0)
            FROM transactions
            WHERE date_trunc('month', data) = date_trunc('month', CURRENT_DATE)
            "#,
        )
        .fetch_one(&mut *tx)
        .await?;

        // C. Vendas finalizadas no mês
        let vendas_finalizadas_mes: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM sales
            WHERE status = 'FINALIZADA'
              AND date_trunc('month', finalizada_em) = date_trunc('month', NOW())
            "#,
        )
        .fetch_one(&mut *tx)
        .await?;

        // D. Notas autorizadas no mês
        let nfes_autorizadas_mes: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM nfes
            WHERE status = 'AUTORIZADA'
              AND date_trunc('month', autorizada_em) = date_trunc('month', NOW())
            "#,
        )
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(DashboardSummary {
            ordens_por_status,
            receitas_mes,
            despesas_mes,
            saldo_mes: receitas_mes - despesas_mes,
            vendas_finalizadas_mes,
            nfes_autorizadas_mes,
        })
    }

    // 2. Gráfico de Linha (Últimos 30 dias)
    pub async fn get_revenue_last_30_days(&self) -> Result<Vec<RevenueChartEntry>, AppError> {
        let data = sqlx::query_as::<_, RevenueChartEntry>(
            r#"
            SELECT
                to_char(data, 'YYYY-MM-DD') AS "date",
                SUM(valor) AS "total"
            FROM transactions
            WHERE tipo = 'RECEITA'
              AND data >= (CURRENT_DATE - INTERVAL '30 days')
            GROUP BY 1
            ORDER BY 1 ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(data)
    }
}
