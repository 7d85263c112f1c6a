// src/db/catalog_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        catalog::{Product, Service},
        service_order::LineKind,
    },
    services::budget::CatalogEntry,
};

#[derive(Debug, Clone)]
pub struct ProductData {
    pub codigo: String,
    pub nome: String,
    pub unidade: String,
    pub ncm: Option<String>,
    pub preco_venda: Decimal,
    pub custo: Decimal,
    pub ativo: bool,
}

#[derive(Debug, Clone)]
pub struct ServiceData {
    pub nome: String,
    pub descricao: Option<String>,
    pub preco: Decimal,
    pub ativo: bool,
}

#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  PRODUTOS
    // =========================================================================

    pub async fn create_product(&self, data: &ProductData, estoque_inicial: Decimal) -> Result<Product, AppError> {
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (codigo, nome, unidade, ncm, preco_venda, custo, estoque, ativo)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&data.codigo)
        .bind(&data.nome)
        .bind(&data.unidade)
        .bind(&data.ncm)
        .bind(data.preco_venda)
        .bind(data.custo)
        .bind(estoque_inicial)
        .bind(data.ativo)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::Conflict(format!("Já existe um produto com o código '{}'.", data.codigo));
                }
            }
            AppError::DatabaseError(e)
        })
    }

    pub async fn update_product(&self, id: Uuid, data: &ProductData) -> Result<Product, AppError> {
        sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                codigo = $2, nome = $3, unidade = $4, ncm = $5,
                preco_venda = $6, custo = $7, ativo = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&data.codigo)
        .bind(&data.nome)
        .bind(&data.unidade)
        .bind(&data.ncm)
        .bind(data.preco_venda)
        .bind(data.custo)
        .bind(data.ativo)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::ResourceNotFound(format!("Produto {}", id)))
    }

    pub async fn find_product(&self, id: Uuid) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    pub async fn list_products(&self, search: Option<&str>, only_active: bool) -> Result<Vec<Product>, AppError> {
        let pattern = search.map(|s| format!("%{}%", s.trim()));

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE ($1::text IS NULL OR nome ILIKE $1 OR codigo ILIKE $1)
              AND (NOT $2 OR ativo)
            ORDER BY nome ASC
            "#,
        )
        .bind(pattern)
        .bind(only_active)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    /// Soma `delta` ao estoque e devolve o novo saldo.
    pub async fn adjust_stock<'e, E>(&self, executor: E, product_id: Uuid, delta: Decimal) -> Result<Decimal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let estoque: Option<Decimal> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET estoque = estoque + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING estoque
            "#,
        )
        .bind(product_id)
        .bind(delta)
        .fetch_optional(executor)
        .await?;

        estoque.ok_or_else(|| AppError::ResourceNotFound(format!("Produto {}", product_id)))
    }

    /// Carrega os produtos do orçamento travando as linhas até o fim da transação,
    /// para que duas gravações simultâneas não consumam o mesmo saldo.
    pub async fn lock_products<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<Vec<CatalogEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<(Uuid, String, Decimal, Decimal, bool)> = sqlx::query_as(
            r#"
            SELECT id, nome, preco_venda, estoque, ativo
            FROM products
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(ids)
        .fetch_all(executor)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, nome, preco, estoque, ativo)| CatalogEntry {
                id,
                tipo: LineKind::Produto,
                nome,
                preco,
                estoque: Some(estoque),
                ativo,
            })
            .collect())
    }

    // =========================================================================
    //  SERVIÇOS
    // =========================================================================

    pub async fn create_service(&self, data: &ServiceData) -> Result<Service, AppError> {
        let service = sqlx::query_as::<_, Service>(
            r#"
            INSERT INTO services (nome, descricao, preco, ativo)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&data.nome)
        .bind(&data.descricao)
        .bind(data.preco)
        .bind(data.ativo)
        .fetch_one(&self.pool)
        .await?;
        Ok(service)
    }

    pub async fn update_service(&self, id: Uuid, data: &ServiceData) -> Result<Service, AppError> {
        sqlx::query_as::<_, Service>(
            r#"
            UPDATE services SET nome = $2, descricao = $3, preco = $4, ativo = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&data.nome)
        .bind(&data.descricao)
        .bind(data.preco)
        .bind(data.ativo)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::ResourceNotFound(format!("Serviço {}", id)))
    }

    pub async fn list_services(&self, only_active: bool) -> Result<Vec<Service>, AppError> {
        let services = sqlx::query_as::<_, Service>(
            "SELECT * FROM services WHERE (NOT $1 OR ativo) ORDER BY nome ASC",
        )
        .bind(only_active)
        .fetch_all(&self.pool)
        .await?;
        Ok(services)
    }

    pub async fn find_services<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<Vec<CatalogEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<(Uuid, String, Decimal, bool)> = sqlx::query_as(
            "SELECT id, nome, preco, ativo FROM services WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(executor)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, nome, preco, ativo)| CatalogEntry {
                id,
                tipo: LineKind::Servico,
                nome,
                preco,
                estoque: None,
                ativo,
            })
            .collect())
    }

    /// Código/NCM/unidade dos produtos, usados na montagem da NF-e.
    pub async fn fiscal_data<'e, E>(
        &self,
        executor: E,
        ids: &[Uuid],
    ) -> Result<Vec<(Uuid, String, Option<String>, String)>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as("SELECT id, codigo, ncm, unidade FROM products WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(executor)
            .await?;
        Ok(rows)
    }
}
