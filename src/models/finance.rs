// src/models/finance.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "transaction_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Receita,  // Entrada por venda/serviço
    Despesa,  // Saída por gasto
    Deposito, // Entrada de dinheiro no caixa
    Saque,    // Retirada do caixa
}

impl TransactionKind {
    /// Entradas somam no caixa, saídas subtraem.
    pub fn is_inflow(self) -> bool {
        matches!(self, TransactionKind::Receita | TransactionKind::Deposito)
    }

    pub fn signed(self, valor: Decimal) -> Decimal {
        if self.is_inflow() { valor } else { -valor }
    }
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub tipo: TransactionKind,
    #[schema(example = "Recebimento OS #1024")]
    pub descricao: String,
    // Sempre positivo; o sinal vem do tipo
    #[schema(example = "450.00")]
    pub valor: Decimal,
    #[schema(value_type = String, format = Date, example = "2026-10-18")]
    pub data: NaiveDate,
    #[schema(example = "Serviços")]
    pub categoria: Option<String>,

    // Vínculos
    pub order_id: Option<Uuid>,
    pub sale_id: Option<Uuid>,
    pub payment_id: Option<Uuid>,

    pub criado_por: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowSummary {
    pub entradas: Decimal,
    pub saidas: Decimal,
    pub saldo: Decimal,
    pub receitas: Decimal,
    pub despesas: Decimal,
    pub depositos: Decimal,
    pub saques: Decimal,
}
