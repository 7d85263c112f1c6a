// src/db/payment_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::payment::{Payment, PaymentMethod, PaymentStatus, PaymentTarget},
};

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub target: PaymentTarget,
    pub metodo: PaymentMethod,
    pub valor: Decimal,
    pub status: PaymentStatus,
    pub emitir_nfe: bool,
    pub created_by: Option<Uuid>,
}

// (order_id, sale_id) para as colunas do alvo
fn target_columns(target: PaymentTarget) -> (Option<Uuid>, Option<Uuid>) {
    match target {
        PaymentTarget::Order(id) => (Some(id), None),
        PaymentTarget::Sale(id) => (None, Some(id)),
    }
}

#[derive(Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert<'e, E>(&self, executor: E, data: &NewPayment) -> Result<Payment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (order_id, sale_id) = target_columns(data.target);

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (order_id, sale_id, metodo, valor, status, emitir_nfe, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(sale_id)
        .bind(data.metodo)
        .bind(data.valor)
        .bind(data.status)
        .bind(data.emitir_nfe)
        .bind(data.created_by)
        .fetch_one(executor)
        .await?;

        Ok(payment)
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Payment>, AppError> {
        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(payment)
    }

    pub async fn lock<'e, E>(&self, executor: E, id: Uuid) -> Result<Payment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Pagamento {}", id)))
    }

    /// Pagamentos ainda sem status final, dos mais antigos aos mais novos.
    pub async fn list_open(&self) -> Result<Vec<Payment>, AppError> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM payments
            WHERE status IN ('PENDENTE', 'PROCESSANDO')
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    /// Existe pagamento ainda em andamento para o alvo?
    pub async fn has_open<'e, E>(&self, executor: E, target: PaymentTarget) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (order_id, sale_id) = target_columns(target);
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM payments
                WHERE order_id IS NOT DISTINCT FROM $1
                  AND sale_id IS NOT DISTINCT FROM $2
                  AND status IN ('PENDENTE', 'PROCESSANDO')
            )
            "#,
        )
        .bind(order_id)
        .bind(sale_id)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }

    pub async fn sum_approved<'e, E>(&self, executor: E, target: PaymentTarget) -> Result<Decimal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (order_id, sale_id) = target_columns(target);
        let total: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(valor), 0) FROM payments
            WHERE order_id IS NOT DISTINCT FROM $1
              AND sale_id IS NOT DISTINCT FROM $2
              AND status = 'APROVADO'
            "#,
        )
        .bind(order_id)
        .bind(sale_id)
        .fetch_one(executor)
        .await?;
        Ok(total)
    }

    pub async fn list_for<'e, E>(&self, executor: E, target: PaymentTarget) -> Result<Vec<Payment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (order_id, sale_id) = target_columns(target);
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM payments
            WHERE order_id IS NOT DISTINCT FROM $1
              AND sale_id IS NOT DISTINCT FROM $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(order_id)
        .bind(sale_id)
        .fetch_all(executor)
        .await?;
        Ok(payments)
    }

    pub async fn set_gateway_id<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        gateway_id: &str,
        status: PaymentStatus,
    ) -> Result<Payment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments SET gateway_id = $2, status = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(gateway_id)
        .bind(status)
        .fetch_one(executor)
        .await?;
        Ok(payment)
    }

    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: PaymentStatus,
        mensagem: Option<&str>,
    ) -> Result<Payment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments SET status = $2, mensagem = COALESCE($3, mensagem), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(mensagem)
        .fetch_one(executor)
        .await?;
        Ok(payment)
    }
}
