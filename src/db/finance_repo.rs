// src/db/finance_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::finance::{Transaction, TransactionKind},
};

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub tipo: TransactionKind,
    pub descricao: String,
    pub valor: Decimal,
    pub data: NaiveDate,
    pub categoria: Option<String>,
    pub order_id: Option<Uuid>,
    pub sale_id: Option<Uuid>,
    pub payment_id: Option<Uuid>,
    pub criado_por: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub inicio: Option<NaiveDate>,
    pub fim: Option<NaiveDate>,
    pub tipo: Option<TransactionKind>,
    pub order_id: Option<Uuid>,
    pub sale_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct FinanceRepository {
    pool: PgPool,
}

impl FinanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  MOVIMENTAÇÕES (Caixa)
    // =========================================================================

    pub async fn create_transaction<'e, E>(&self, executor: E, data: &NewTransaction) -> Result<Transaction, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (
                tipo, descricao, valor, data, categoria,
                order_id, sale_id, payment_id, criado_por
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(data.tipo)
        .bind(&data.descricao)
        .bind(data.valor)
        .bind(data.data)
        .bind(&data.categoria)
        .bind(data.order_id)
        .bind(data.sale_id)
        .bind(data.payment_id)
        .bind(data.criado_por)
        .fetch_one(executor)
        .await?;

        Ok(transaction)
    }

    pub async fn list_transactions<'e, E>(&self, executor: E, filter: &TransactionFilter) -> Result<Vec<Transaction>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let transactions = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT * FROM transactions
            WHERE ($1::date IS NULL OR data >= $1)
              AND ($2::date IS NULL OR data <= $2)
              AND ($3::transaction_kind IS NULL OR tipo = $3)
              AND ($4::uuid IS NULL OR order_id = $4)
              AND ($5::uuid IS NULL OR sale_id = $5)
            ORDER BY data DESC, created_at DESC
            "#,
        )
        .bind(filter.inicio)
        .bind(filter.fim)
        .bind(filter.tipo)
        .bind(filter.order_id)
        .bind(filter.sale_id)
        .fetch_all(executor)
        .await?;

        Ok(transactions)
    }

    pub async fn delete_transaction(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
