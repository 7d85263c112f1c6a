// src/db/sale_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::sale::{Sale, SaleItem, SaleStatus},
    services::budget::{ComposedBudget, ComposedLine},
};

#[derive(Clone)]
pub struct SaleRepository {
    pool: PgPool,
}

impl SaleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_sale<'e, E>(
        &self,
        executor: E,
        customer_id: Option<Uuid>,
        observacoes: Option<&str>,
    ) -> Result<Sale, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            "INSERT INTO sales (customer_id, observacoes) VALUES ($1, $2) RETURNING *",
        )
        .bind(customer_id)
        .bind(observacoes)
        .fetch_one(executor)
        .await?;
        Ok(sale)
    }

    pub async fn find_sale<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(sale)
    }

    pub async fn lock_sale<'e, E>(&self, executor: E, id: Uuid) -> Result<Sale, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Venda {}", id)))
    }

    pub async fn list_sales(&self, status: Option<SaleStatus>, limit: i64, offset: i64) -> Result<Vec<Sale>, AppError> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT * FROM sales
            WHERE ($1::sale_status IS NULL OR status = $1)
            ORDER BY numero DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(sales)
    }

    pub async fn update_status<'e, E>(&self, executor: E, id: Uuid, status: SaleStatus) -> Result<Sale, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            UPDATE sales SET
                status = $2,
                finalizada_em = CASE WHEN $2 = 'FINALIZADA'::sale_status THEN NOW() ELSE finalizada_em END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_one(executor)
        .await?;
        Ok(sale)
    }

    pub async fn update_totals<'e, E>(&self, executor: E, id: Uuid, budget: &ComposedBudget) -> Result<Sale, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            UPDATE sales SET total_descontos = $2, total = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(budget.total_descontos)
        .bind(budget.total)
        .fetch_one(executor)
        .await?;
        Ok(sale)
    }

    // =========================================================================
    //  ITENS
    // =========================================================================

    pub async fn delete_items<'e, E>(&self, executor: E, sale_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM sale_items WHERE sale_id = $1")
            .bind(sale_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn insert_item<'e, E>(&self, executor: E, sale_id: Uuid, line: &ComposedLine) -> Result<SaleItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, SaleItem>(
            r#"
            INSERT INTO sale_items (
                sale_id, product_id, descricao, quantidade,
                valor_unitario, desconto, subtotal, posicao
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(sale_id)
        .bind(line.item_id)
        .bind(&line.descricao)
        .bind(line.quantidade)
        .bind(line.valor_unitario)
        .bind(line.desconto)
        .bind(line.subtotal)
        .bind(line.posicao)
        .fetch_one(executor)
        .await?;
        Ok(item)
    }

    pub async fn list_items<'e, E>(&self, executor: E, sale_id: Uuid) -> Result<Vec<SaleItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, SaleItem>(
            "SELECT * FROM sale_items WHERE sale_id = $1 ORDER BY posicao ASC",
        )
        .bind(sale_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }
}
