// src/services/order_service.rs

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        finance_repo::TransactionFilter,
        order_repo::{OrderFilter, OrderHeader},
        CustomerRepository, FinanceRepository, OrderRepository, PaymentRepository,
    },
    models::{
        payment::{PaymentStatus, PaymentTarget},
        service_order::{BoardColumn, Order, OrderAction, OrderDetail, OrderItem, OrderStatus, OrderSummary},
    },
    services::{
        budget::{self, BudgetLineInput, Catalog, ComposedLine},
        catalog_service::CatalogService,
        status_policy,
    },
};

/// Agrupa as ordens abertas em colunas, na ordem do fluxo. Colunas vazias
/// também aparecem para o quadro não "pular".
pub fn group_by_status(orders: Vec<OrderSummary>) -> Vec<BoardColumn> {
    let mut columns: Vec<BoardColumn> = OrderStatus::ALL
        .iter()
        .filter(|s| !s.is_terminal())
        .map(|&status| BoardColumn { status, orders: Vec::new() })
        .collect();

    for order in orders {
        if let Some(column) = columns.iter_mut().find(|c| c.status == order.status) {
            column.orders.push(order);
        }
    }
    columns
}

// Itens de produto já gravados, no formato usado pela conferência de estoque
fn product_lines(items: &[OrderItem]) -> Vec<ComposedLine> {
    items
        .iter()
        .filter_map(|item| {
            let product_id = item.product_id?;
            Some(ComposedLine {
                tipo: item.tipo,
                item_id: product_id,
                descricao: item.descricao.clone(),
                quantidade: item.quantidade,
                valor_unitario: item.valor_unitario,
                desconto: item.desconto,
                subtotal: item.subtotal,
                posicao: item.posicao,
            })
        })
        .collect()
}

#[derive(Clone)]
pub struct OrderService {
    pool: PgPool,
    orders: OrderRepository,
    customers: CustomerRepository,
    payments: PaymentRepository,
    finance: FinanceRepository,
    catalog: CatalogService,
}

impl OrderService {
    pub fn new(
        pool: PgPool,
        orders: OrderRepository,
        customers: CustomerRepository,
        payments: PaymentRepository,
        finance: FinanceRepository,
        catalog: CatalogService,
    ) -> Self {
        Self { pool, orders, customers, payments, finance, catalog }
    }

    async fn check_vehicle(&self, conn: &mut PgConnection, customer_id: Uuid, vehicle_id: Option<Uuid>) -> Result<(), AppError> {
        let Some(vehicle_id) = vehicle_id else { return Ok(()) };
        let vehicle = self
            .customers
            .find_vehicle(&mut *conn, vehicle_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Veículo {}", vehicle_id)))?;
        if vehicle.customer_id != customer_id {
            return Err(AppError::BadRequest("O veículo não pertence ao cliente da ordem.".into()));
        }
        Ok(())
    }

    // --- CRIAÇÃO E CONSULTA ---

    pub async fn create_order(&self, customer_id: Uuid, header: OrderHeader) -> Result<Order, AppError> {
        let mut tx = self.pool.begin().await?;

        self.customers
            .find_customer(&mut *tx, customer_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Cliente {}", customer_id)))?;
        self.check_vehicle(&mut *tx, customer_id, header.vehicle_id).await?;

        let order = self.orders.create_order(&mut *tx, customer_id, &header).await?;
        tx.commit().await?;

        tracing::info!("🔧 OS #{} aberta para o cliente {}", order.numero, customer_id);
        Ok(order)
    }

    pub async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<OrderSummary>, AppError> {
        self.orders.list_orders(filter).await
    }

    pub async fn get_order(&self, id: Uuid) -> Result<Order, AppError> {
        self.orders
            .find_order(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Ordem de serviço {}", id)))
    }

    pub async fn get_detail(&self, id: Uuid) -> Result<OrderDetail, AppError> {
        let header = self.get_order(id).await?;

        let customer_nome = self
            .customers
            .find_customer(&self.pool, header.customer_id)
            .await?
            .map(|c| c.nome)
            .unwrap_or_default();
        let items = self.orders.list_items(&self.pool, id).await?;
        let payments = self.payments.list_for(&self.pool, PaymentTarget::Order(id)).await?;
        let filter = TransactionFilter { order_id: Some(id), ..Default::default() };
        let transactions = self.finance.list_transactions(&self.pool, &filter).await?;

        let valor_pago = payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Aprovado)
            .map(|p| p.valor)
            .sum();

        Ok(OrderDetail {
            acoes: status_policy::available_actions(header.status),
            header,
            customer_nome,
            items,
            payments,
            transactions,
            valor_pago,
        })
    }

    pub async fn actions(&self, id: Uuid) -> Result<Vec<OrderAction>, AppError> {
        let order = self.get_order(id).await?;
        Ok(status_policy::available_actions(order.status))
    }

    pub async fn board(&self) -> Result<Vec<BoardColumn>, AppError> {
        let orders = self.orders.list_open_orders().await?;
        Ok(group_by_status(orders))
    }

    // --- EDIÇÃO ---

    pub async fn update_header(&self, id: Uuid, header: OrderHeader) -> Result<Order, AppError> {
        let mut tx = self.pool.begin().await?;
        let order = self.orders.lock_order(&mut *tx, id).await?;

        if !status_policy::can_edit_header(order.status) {
            return Err(AppError::Conflict(format!(
                "A OS #{} não pode ser alterada no status {:?}.",
                order.numero, order.status
            )));
        }
        self.check_vehicle(&mut *tx, order.customer_id, header.vehicle_id).await?;

        let order = self.orders.update_header(&mut *tx, id, &header).await?;
        tx.commit().await?;
        Ok(order)
    }

    /// Substitui todas as linhas do orçamento e recalcula os totais. Nada é
    /// gravado se alguma linha for inválida ou faltar estoque.
    pub async fn save_budget(&self, id: Uuid, lines: &[BudgetLineInput]) -> Result<OrderDetail, AppError> {
        let mut tx = self.pool.begin().await?;
        let order = self.orders.lock_order(&mut *tx, id).await?;

        if !status_policy::can_edit_budget(order.status) {
            return Err(AppError::Conflict(format!(
                "O orçamento da OS #{} não pode ser editado no status {:?}.",
                order.numero, order.status
            )));
        }

        let catalog = self.catalog.load_for_budget(&mut *tx, lines).await?;
        let composed = budget::compose(lines, &catalog)?;

        self.orders.delete_items(&mut *tx, id).await?;
        for line in &composed.lines {
            self.orders.insert_item(&mut *tx, id, line).await?;
        }
        self.orders.update_totals(&mut *tx, id, &composed).await?;

        tx.commit().await?;

        tracing::info!("📝 Orçamento da OS #{} salvo: {} linhas, total {}", order.numero, composed.lines.len(), composed.total);
        self.get_detail(id).await
    }

    // --- TRANSIÇÕES ---

    pub async fn transition(&self, id: Uuid, to: OrderStatus) -> Result<Order, AppError> {
        let mut tx = self.pool.begin().await?;
        let order = self.orders.lock_order(&mut *tx, id).await?;

        status_policy::ensure_transition(order.status, to)?;

        let updated = match to {
            OrderStatus::AprovacaoOrcamento => {
                let items = self.orders.list_items(&mut *tx, id).await?;
                if items.is_empty() {
                    return Err(AppError::BadRequest(
                        "O orçamento precisa de ao menos um item para ser enviado.".into(),
                    ));
                }
                self.orders.update_status(&mut *tx, id, to).await?
            }
            OrderStatus::OrcamentoAprovado => {
                self.ensure_stock(&mut *tx, id).await?;
                self.orders.update_status(&mut *tx, id, to).await?
            }
            OrderStatus::Concluido => {
                let pago = self.payments.sum_approved(&mut *tx, PaymentTarget::Order(id)).await?;
                if order.total > Decimal::ZERO && pago < order.total {
                    return Err(AppError::Conflict(format!(
                        "A OS #{} ainda tem {} em aberto.",
                        order.numero,
                        order.total - pago
                    )));
                }
                self.complete_in_tx(&mut *tx, &order).await?
            }
            OrderStatus::Cancelado => {
                if self.payments.has_open(&mut *tx, PaymentTarget::Order(id)).await? {
                    return Err(AppError::Conflict("Existe um pagamento em andamento para esta OS.".into()));
                }
                self.orders.update_status(&mut *tx, id, to).await?
            }
            _ => self.orders.update_status(&mut *tx, id, to).await?,
        };

        tx.commit().await?;

        tracing::info!("🔀 OS #{}: {:?} -> {:?}", order.numero, order.status, to);
        Ok(updated)
    }

    async fn ensure_stock(&self, conn: &mut PgConnection, order_id: Uuid) -> Result<(), AppError> {
        let items = self.orders.list_items(&mut *conn, order_id).await?;
        let lines = product_lines(&items);
        let mut ids: Vec<Uuid> = lines.iter().map(|l| l.item_id).collect();
        ids.sort();
        ids.dedup();

        let catalog = Catalog::new(self.catalog.lock_products(&mut *conn, &ids).await?);
        let shortfalls = budget::check_stock(&lines, &catalog);
        if !shortfalls.is_empty() {
            return Err(AppError::InsufficientStock(shortfalls));
        }
        Ok(())
    }

    /// Conclui a OS dentro de uma transação aberta: baixa o estoque das peças e
    /// marca CONCLUIDO. Usado pela transição manual e pela baixa de pagamento.
    pub async fn complete_in_tx(&self, conn: &mut PgConnection, order: &Order) -> Result<Order, AppError> {
        let items = self.orders.list_items(&mut *conn, order.id).await?;
        let baixas: Vec<(Uuid, Decimal)> = product_lines(&items)
            .iter()
            .map(|l| (l.item_id, l.quantidade))
            .collect();

        self.catalog
            .deduct_stock(&mut *conn, &baixas, &format!("OS #{}", order.numero))
            .await?;

        self.orders.update_status(&mut *conn, order.id, OrderStatus::Concluido).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn summary(status: OrderStatus, numero: i64) -> OrderSummary {
        OrderSummary {
            id: Uuid::new_v4(),
            numero,
            status,
            customer_id: Uuid::new_v4(),
            customer_nome: "Maria".into(),
            placa: Some("ABC1D23".into()),
            mecanico: None,
            total: dec!(100.00),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_board_groups_open_orders_in_flow_order() {
        let board = group_by_status(vec![
            summary(OrderStatus::EmAndamento, 1),
            summary(OrderStatus::Orcamento, 2),
            summary(OrderStatus::EmAndamento, 3),
        ]);

        // Seis colunas: todos os status menos CONCLUIDO e CANCELADO
        assert_eq!(board.len(), 6);
        assert!(board.iter().all(|c| !c.status.is_terminal()));

        let em_andamento = board.iter().find(|c| c.status == OrderStatus::EmAndamento).unwrap();
        let numeros: Vec<i64> = em_andamento.orders.iter().map(|o| o.numero).collect();
        assert_eq!(numeros, vec![1, 3]);

        let pagamento = board.iter().find(|c| c.status == OrderStatus::Pagamento).unwrap();
        assert!(pagamento.orders.is_empty());
    }

    #[test]
    fn test_product_lines_skip_services() {
        let order_id = Uuid::new_v4();
        let product_id = Uuid::new_v4();
        let item = |tipo, product_id, service_id| OrderItem {
            id: Uuid::new_v4(),
            order_id,
            tipo,
            product_id,
            service_id,
            descricao: "x".into(),
            quantidade: dec!(2),
            valor_unitario: dec!(10),
            desconto: Decimal::ZERO,
            subtotal: dec!(20),
            posicao: 0,
            created_at: Utc::now(),
        };

        let items = vec![
            item(crate::models::service_order::LineKind::Produto, Some(product_id), None),
            item(crate::models::service_order::LineKind::Servico, None, Some(Uuid::new_v4())),
        ];

        let lines = product_lines(&items);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].item_id, product_id);
    }
}
