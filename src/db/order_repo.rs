// src/db/order_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::service_order::{Order, OrderItem, OrderStatus, OrderSummary},
    services::budget::{ComposedBudget, ComposedLine},
};

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub customer_id: Option<Uuid>,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone)]
pub struct OrderHeader {
    pub vehicle_id: Option<Uuid>,
    pub problema_relatado: Option<String>,
    pub observacoes: Option<String>,
    pub mecanico: Option<String>,
}

const SUMMARY_SELECT: &str = r#"
    SELECT
        o.id, o.numero, o.status, o.customer_id,
        c.nome AS customer_nome,
        v.placa, o.mecanico, o.total, o.created_at, o.updated_at
    FROM orders o
    JOIN customers c ON c.id = o.customer_id
    LEFT JOIN vehicles v ON v.id = o.vehicle_id
"#;

#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  ORDENS
    // =========================================================================

    pub async fn create_order<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
        header: &OrderHeader,
    ) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (customer_id, vehicle_id, problema_relatado, observacoes, mecanico)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(customer_id)
        .bind(header.vehicle_id)
        .bind(&header.problema_relatado)
        .bind(&header.observacoes)
        .bind(&header.mecanico)
        .fetch_one(executor)
        .await?;

        Ok(order)
    }

    pub async fn find_order<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Order>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(order)
    }

    /// Mesma busca, travando a linha até o fim da transação.
    pub async fn lock_order<'e, E>(&self, executor: E, id: Uuid) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Ordem de serviço {}", id)))
    }

    pub async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<OrderSummary>, AppError> {
        let pattern = filter.search.as_deref().map(|s| format!("%{}%", s.trim()));

        let sql = format!(
            r#"
            {SUMMARY_SELECT}
            WHERE ($1::order_status IS NULL OR o.status = $1)
              AND ($2::uuid IS NULL OR o.customer_id = $2)
              AND ($3::text IS NULL OR c.nome ILIKE $3 OR v.placa ILIKE $3 OR o.numero::text = $4)
            ORDER BY o.numero DESC
            LIMIT $5 OFFSET $6
            "#
        );

        let orders = sqlx::query_as::<_, OrderSummary>(&sql)
            .bind(filter.status)
            .bind(filter.customer_id)
            .bind(pattern)
            .bind(filter.search.as_deref().map(str::trim))
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(orders)
    }

    /// Ordens ainda em aberto, para o quadro da equipe.
    pub async fn list_open_orders(&self) -> Result<Vec<OrderSummary>, AppError> {
        let sql = format!(
            r#"
            {SUMMARY_SELECT}
            WHERE o.status NOT IN ('CONCLUIDO', 'CANCELADO')
            ORDER BY o.updated_at ASC
            "#
        );

        let orders = sqlx::query_as::<_, OrderSummary>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(orders)
    }

    pub async fn update_header<'e, E>(&self, executor: E, id: Uuid, header: &OrderHeader) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders SET
                vehicle_id = $2, problema_relatado = $3, observacoes = $4,
                mecanico = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(header.vehicle_id)
        .bind(&header.problema_relatado)
        .bind(&header.observacoes)
        .bind(&header.mecanico)
        .fetch_one(executor)
        .await?;
        Ok(order)
    }

    /// Atualiza o status e carimba as datas de aprovação/conclusão.
    pub async fn update_status<'e, E>(&self, executor: E, id: Uuid, status: OrderStatus) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders SET
                status = $2,
                aprovado_em = CASE WHEN $2 = 'ORCAMENTO_APROVADO'::order_status THEN NOW() ELSE aprovado_em END,
                concluido_em = CASE WHEN $2 = 'CONCLUIDO'::order_status THEN NOW() ELSE concluido_em END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_one(executor)
        .await?;

        Ok(order)
    }

    // =========================================================================
    //  ITENS DO ORÇAMENTO
    // =========================================================================

    pub async fn delete_items<'e, E>(&self, executor: E, order_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(order_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn insert_item<'e, E>(&self, executor: E, order_id: Uuid, line: &ComposedLine) -> Result<OrderItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, OrderItem>(
            r#"
            INSERT INTO order_items (
                order_id, tipo, product_id, service_id, descricao,
                quantidade, valor_unitario, desconto, subtotal, posicao
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(line.tipo)
        .bind(line.product_id())
        .bind(line.service_id())
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

    pub async fn update_totals<'e, E>(&self, executor: E, order_id: Uuid, budget: &ComposedBudget) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders SET
                total_produtos = $2, total_servicos = $3,
                total_descontos = $4, total = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(budget.total_produtos)
        .bind(budget.total_servicos)
        .bind(budget.total_descontos)
        .bind(budget.total)
        .fetch_one(executor)
        .await?;

        Ok(order)
    }

    pub async fn list_items<'e, E>(&self, executor: E, order_id: Uuid) -> Result<Vec<OrderItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT * FROM order_items WHERE order_id = $1 ORDER BY posicao ASC",
        )
        .bind(order_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }
}
