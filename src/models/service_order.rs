// src/models/service_order.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{finance::Transaction, payment::Payment};

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Orcamento,
    AprovacaoOrcamento,
    OrcamentoAprovado,
    OrcamentoRecusado,
    EmAndamento,
    Pagamento,
    Concluido,
    Cancelado,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Orcamento,
        OrderStatus::AprovacaoOrcamento,
        OrderStatus::OrcamentoAprovado,
        OrderStatus::OrcamentoRecusado,
        OrderStatus::EmAndamento,
        OrderStatus::Pagamento,
        OrderStatus::Concluido,
        OrderStatus::Cancelado,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Concluido | OrderStatus::Cancelado)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "line_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineKind {
    Produto,
    Servico,
}

// --- Ordem de Serviço ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    #[schema(example = 1024)]
    pub numero: i64,
    pub status: OrderStatus,
    pub customer_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    #[schema(example = "Barulho na suspensão dianteira")]
    pub problema_relatado: Option<String>,
    pub observacoes: Option<String>,
    #[schema(example = "João")]
    pub mecanico: Option<String>,
    #[schema(example = "320.00")]
    pub total_produtos: Decimal,
    #[schema(example = "150.00")]
    pub total_servicos: Decimal,
    #[schema(example = "20.00")]
    pub total_descontos: Decimal,
    #[schema(example = "450.00")]
    pub total: Decimal,
    pub aprovado_em: Option<DateTime<Utc>>,
    pub concluido_em: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub tipo: LineKind,
    pub product_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    #[schema(example = "Pastilha de freio")]
    pub descricao: String,
    #[schema(example = "2.0")]
    pub quantidade: Decimal,
    #[schema(example = "80.00")]
    pub valor_unitario: Decimal,
    #[schema(example = "0.00")]
    pub desconto: Decimal,
    #[schema(example = "160.00")]
    pub subtotal: Decimal,
    pub posicao: i32,
    pub created_at: DateTime<Utc>,
}

/// Linha da listagem, já com nomes do cliente e do veículo.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: Uuid,
    pub numero: i64,
    pub status: OrderStatus,
    pub customer_id: Uuid,
    pub customer_nome: String,
    pub placa: Option<String>,
    pub mecanico: Option<String>,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub header: Order,
    pub customer_nome: String,
    pub items: Vec<OrderItem>,
    pub payments: Vec<Payment>,
    pub transactions: Vec<Transaction>,
    /// Ações permitidas no status atual.
    pub acoes: Vec<OrderAction>,
    pub valor_pago: Decimal,
}

// Ações que a interface pode oferecer para o status atual
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderAction {
    EditarDados,
    EditarOrcamento,
    EnviarAprovacao,
    Aprovar,
    Recusar,
    Reabrir,
    Iniciar,
    EnviarPagamento,
    Cobrar,
    Concluir,
    Cancelar,
    EmitirNfe,
}

/// Coluna do quadro de despacho (equipe).
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardColumn {
    pub status: OrderStatus,
    pub orders: Vec<OrderSummary>,
}
