// src/services/sale_service.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CustomerRepository, PaymentRepository, SaleRepository},
    models::{
        payment::PaymentTarget,
        sale::{Sale, SaleDetail, SaleStatus},
        service_order::LineKind,
    },
    services::{
        budget::{self, BudgetLineInput},
        catalog_service::CatalogService,
    },
};

/// Linha de venda de balcão (só produtos).
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleLineInput {
    pub product_id: Uuid,
    #[schema(example = "1")]
    pub quantidade: Decimal,
    pub valor_unitario: Option<Decimal>,
    #[serde(default)]
    pub desconto: Decimal,
}

impl From<&SaleLineInput> for BudgetLineInput {
    fn from(line: &SaleLineInput) -> Self {
        BudgetLineInput {
            tipo: LineKind::Produto,
            item_id: line.product_id,
            quantidade: line.quantidade,
            valor_unitario: line.valor_unitario,
            desconto: line.desconto,
        }
    }
}

#[derive(Clone)]
pub struct SaleService {
    pool: PgPool,
    sales: SaleRepository,
    customers: CustomerRepository,
    payments: PaymentRepository,
    catalog: CatalogService,
}

impl SaleService {
    pub fn new(
        pool: PgPool,
        sales: SaleRepository,
        customers: CustomerRepository,
        payments: PaymentRepository,
        catalog: CatalogService,
    ) -> Self {
        Self { pool, sales, customers, payments, catalog }
    }

    // Compõe e grava as linhas; a venda já deve estar travada
    async fn write_items(&self, conn: &mut PgConnection, sale_id: Uuid, items: &[SaleLineInput]) -> Result<Sale, AppError> {
        let lines: Vec<BudgetLineInput> = items.iter().map(BudgetLineInput::from).collect();
        let catalog = self.catalog.load_for_budget(&mut *conn, &lines).await?;
        let composed = budget::compose(&lines, &catalog)?;

        self.sales.delete_items(&mut *conn, sale_id).await?;
        for line in &composed.lines {
            self.sales.insert_item(&mut *conn, sale_id, line).await?;
        }
        self.sales.update_totals(&mut *conn, sale_id, &composed).await
    }

    pub async fn create_sale(
        &self,
        customer_id: Option<Uuid>,
        observacoes: Option<&str>,
        items: &[SaleLineInput],
    ) -> Result<SaleDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        if let Some(customer_id) = customer_id {
            self.customers
                .find_customer(&mut *tx, customer_id)
                .await?
                .ok_or_else(|| AppError::ResourceNotFound(format!("Cliente {}", customer_id)))?;
        }

        let sale = self.sales.create_sale(&mut *tx, customer_id, observacoes).await?;
        let sale = self.write_items(&mut *tx, sale.id, items).await?;
        tx.commit().await?;

        tracing::info!("🛒 Venda #{} aberta ({} itens)", sale.numero, items.len());
        self.get_detail(sale.id).await
    }

    pub async fn replace_items(&self, id: Uuid, items: &[SaleLineInput]) -> Result<SaleDetail, AppError> {
        let mut tx = self.pool.begin().await?;
        let sale = self.sales.lock_sale(&mut *tx, id).await?;

        if sale.status != SaleStatus::Aberta {
            return Err(AppError::Conflict(format!(
                "Os itens da venda #{} só podem ser alterados com a venda ABERTA.",
                sale.numero
            )));
        }

        self.write_items(&mut *tx, id, items).await?;
        tx.commit().await?;
        self.get_detail(id).await
    }

    pub async fn list_sales(&self, status: Option<SaleStatus>, limit: i64, offset: i64) -> Result<Vec<Sale>, AppError> {
        self.sales.list_sales(status, limit, offset).await
    }

    pub async fn get_detail(&self, id: Uuid) -> Result<SaleDetail, AppError> {
        let header = self
            .sales
            .find_sale(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Venda {}", id)))?;
        let items = self.sales.list_items(&self.pool, id).await?;
        let payments = self.payments.list_for(&self.pool, PaymentTarget::Sale(id)).await?;

        Ok(SaleDetail { header, items, payments })
    }

    pub async fn transition(&self, id: Uuid, to: SaleStatus) -> Result<Sale, AppError> {
        let mut tx = self.pool.begin().await?;
        let sale = self.sales.lock_sale(&mut *tx, id).await?;

        if !sale.status.can_transition(to) {
            return Err(AppError::Conflict(format!(
                "Transição de venda inválida: {:?} -> {:?}.",
                sale.status, to
            )));
        }

        let updated = match to {
            SaleStatus::Pagamento => {
                if self.sales.list_items(&mut *tx, id).await?.is_empty() {
                    return Err(AppError::BadRequest("A venda não possui itens.".into()));
                }
                self.sales.update_status(&mut *tx, id, to).await?
            }
            SaleStatus::Finalizada => {
                let pago = self.payments.sum_approved(&mut *tx, PaymentTarget::Sale(id)).await?;
                if sale.total > Decimal::ZERO && pago < sale.total {
                    return Err(AppError::Conflict(format!(
                        "A venda #{} ainda tem {} em aberto.",
                        sale.numero,
                        sale.total - pago
                    )));
                }
                self.finalize_in_tx(&mut *tx, &sale).await?
            }
            _ => {
                if self.payments.has_open(&mut *tx, PaymentTarget::Sale(id)).await? {
                    return Err(AppError::Conflict("Existe um pagamento em andamento para esta venda.".into()));
                }
                self.sales.update_status(&mut *tx, id, to).await?
            }
        };

        tx.commit().await?;
        tracing::info!("🔀 Venda #{}: {:?} -> {:?}", sale.numero, sale.status, to);
        Ok(updated)
    }

    /// Baixa o estoque e marca FINALIZADA dentro de uma transação aberta.
    pub async fn finalize_in_tx(&self, conn: &mut PgConnection, sale: &Sale) -> Result<Sale, AppError> {
        let items = self.sales.list_items(&mut *conn, sale.id).await?;
        let baixas: Vec<(Uuid, Decimal)> = items.iter().map(|i| (i.product_id, i.quantidade)).collect();

        self.catalog
            .deduct_stock(&mut *conn, &baixas, &format!("Venda #{}", sale.numero))
            .await?;

        self.sales.update_status(&mut *conn, sale.id, SaleStatus::Finalizada).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sale_line_becomes_product_budget_line() {
        let input = SaleLineInput {
            product_id: Uuid::new_v4(),
            quantidade: dec!(3),
            valor_unitario: None,
            desconto: dec!(1.50),
        };

        let line = BudgetLineInput::from(&input);
        assert_eq!(line.tipo, LineKind::Produto);
        assert_eq!(line.item_id, input.product_id);
        assert_eq!(line.desconto, dec!(1.50));
        assert!(line.valor_unitario.is_none());
    }
}
