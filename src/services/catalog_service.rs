// src/services/catalog_service.rs

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        catalog_repo::{ProductData, ServiceData},
        CatalogRepository,
    },
    models::{
        catalog::{Product, Service},
        service_order::LineKind,
    },
    services::budget::{BudgetLineInput, Catalog, CatalogEntry},
};

#[derive(Clone)]
pub struct CatalogService {
    repo: CatalogRepository,
    pool: PgPool,
}

impl CatalogService {
    pub fn new(repo: CatalogRepository, pool: PgPool) -> Self {
        Self { repo, pool }
    }

    // --- PRODUTOS ---

    pub async fn create_product(&self, data: ProductData, estoque_inicial: Decimal) -> Result<Product, AppError> {
        if estoque_inicial.is_sign_negative() {
            return Err(AppError::BadRequest("O estoque inicial não pode ser negativo.".into()));
        }
        self.repo.create_product(&data, estoque_inicial).await
    }

    pub async fn update_product(&self, id: Uuid, data: ProductData) -> Result<Product, AppError> {
        self.repo.update_product(id, &data).await
    }

    pub async fn get_product(&self, id: Uuid) -> Result<Product, AppError> {
        self.repo
            .find_product(id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Produto {}", id)))
    }

    pub async fn list_products(&self, search: Option<&str>, only_active: bool) -> Result<Vec<Product>, AppError> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        self.repo.list_products(search, only_active).await
    }

    /// Entrada manual de mercadoria (compra, devolução, ajuste).
    pub async fn stock_entry(&self, product_id: Uuid, quantidade: Decimal) -> Result<Product, AppError> {
        if quantidade <= Decimal::ZERO {
            return Err(AppError::BadRequest("A quantidade deve ser maior que zero.".into()));
        }
        let saldo = self.repo.adjust_stock(&self.pool, product_id, quantidade).await?;
        tracing::info!("📦 Entrada de {} no produto {} (saldo {})", quantidade, product_id, saldo);
        self.get_product(product_id).await
    }

    /// Baixa o estoque das linhas de produto de uma OS ou venda concluída.
    /// O saldo pode ficar negativo (peça usada antes da nota de compra); isso
    /// só gera um alerta.
    pub async fn deduct_stock(
        &self,
        conn: &mut PgConnection,
        lines: &[(Uuid, Decimal)],
        referencia: &str,
    ) -> Result<(), AppError> {
        for (product_id, quantidade) in lines {
            let saldo = self.repo.adjust_stock(&mut *conn, *product_id, -*quantidade).await?;
            if saldo.is_sign_negative() {
                tracing::warn!("⚠️ Estoque negativo no produto {} após baixa de {}: {}", product_id, referencia, saldo);
            }
        }
        Ok(())
    }

    pub async fn lock_products(&self, conn: &mut PgConnection, ids: &[Uuid]) -> Result<Vec<CatalogEntry>, AppError> {
        self.repo.lock_products(conn, ids).await
    }

    /// Carrega o catálogo citado pelas linhas. Produtos vêm travados
    /// (`FOR UPDATE`) até o fim da transação.
    pub async fn load_for_budget(&self, conn: &mut PgConnection, lines: &[BudgetLineInput]) -> Result<Catalog, AppError> {
        let ids_of = |tipo: LineKind| {
            let mut ids: Vec<Uuid> = lines.iter().filter(|l| l.tipo == tipo).map(|l| l.item_id).collect();
            ids.sort();
            ids.dedup();
            ids
        };

        let mut entries = self.repo.lock_products(&mut *conn, &ids_of(LineKind::Produto)).await?;
        entries.extend(self.repo.find_services(&mut *conn, &ids_of(LineKind::Servico)).await?);
        Ok(Catalog::new(entries))
    }

    // --- SERVIÇOS ---

    pub async fn create_service(&self, data: ServiceData) -> Result<Service, AppError> {
        self.repo.create_service(&data).await
    }

    pub async fn update_service(&self, id: Uuid, data: ServiceData) -> Result<Service, AppError> {
        self.repo.update_service(id, &data).await
    }

    pub async fn list_services(&self, only_active: bool) -> Result<Vec<Service>, AppError> {
        self.repo.list_services(only_active).await
    }
}
