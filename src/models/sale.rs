// src/models/sale.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::payment::Payment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "sale_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    Aberta,
    Pagamento,
    Finalizada,
    Cancelada,
}

impl SaleStatus {
    pub fn can_transition(self, to: SaleStatus) -> bool {
        use SaleStatus::*;
        matches!(
            (self, to),
            (Aberta, Pagamento)
                | (Aberta, Cancelada)
                | (Pagamento, Aberta)
                | (Pagamento, Finalizada)
                | (Pagamento, Cancelada)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: Uuid,
    #[schema(example = 311)]
    pub numero: i64,
    pub customer_id: Option<Uuid>,
    pub status: SaleStatus,
    pub total_descontos: Decimal,
    #[schema(example = "91.80")]
    pub total: Decimal,
    pub observacoes: Option<String>,
    pub finalizada_em: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub product_id: Uuid,
    pub descricao: String,
    pub quantidade: Decimal,
    pub valor_unitario: Decimal,
    pub desconto: Decimal,
    pub subtotal: Decimal,
    pub posicao: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    #[serde(flatten)]
    pub header: Sale,
    pub items: Vec<SaleItem>,
    pub payments: Vec<Payment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sale_transitions() {
        assert!(SaleStatus::Aberta.can_transition(SaleStatus::Pagamento));
        assert!(SaleStatus::Pagamento.can_transition(SaleStatus::Finalizada));
        assert!(SaleStatus::Pagamento.can_transition(SaleStatus::Aberta));
        assert!(!SaleStatus::Aberta.can_transition(SaleStatus::Finalizada));
        assert!(!SaleStatus::Finalizada.can_transition(SaleStatus::Cancelada));
        assert!(!SaleStatus::Cancelada.can_transition(SaleStatus::Aberta));
    }
}
