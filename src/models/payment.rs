// src/models/payment.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Dinheiro,
    Pix,
    CartaoCredito,
    CartaoDebito,
}

impl PaymentMethod {
    // Dinheiro não passa pelo gateway
    pub fn uses_gateway(self) -> bool {
        !matches!(self, PaymentMethod::Dinheiro)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pendente,
    Processando,
    Aprovado,
    Negado,
    Cancelado,
    Erro,
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PaymentStatus::Aprovado | PaymentStatus::Negado | PaymentStatus::Cancelado | PaymentStatus::Erro
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Option<Uuid>,
    pub sale_id: Option<Uuid>,
    pub metodo: PaymentMethod,
    #[schema(example = "450.00")]
    pub valor: Decimal,
    pub status: PaymentStatus,
    // ID da cobrança no processador
    pub gateway_id: Option<String>,
    pub mensagem: Option<String>,
    pub emitir_nfe: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Alvo de um pagamento: uma OS ou uma venda.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentTarget {
    Order(Uuid),
    Sale(Uuid),
}

impl Payment {
    pub fn target(&self) -> Option<PaymentTarget> {
        match (self.order_id, self.sale_id) {
            (Some(id), None) => Some(PaymentTarget::Order(id)),
            (None, Some(id)) => Some(PaymentTarget::Sale(id)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(!PaymentStatus::Pendente.is_terminal());
        assert!(!PaymentStatus::Processando.is_terminal());
        assert!(PaymentStatus::Aprovado.is_terminal());
        assert!(PaymentStatus::Negado.is_terminal());
        assert!(PaymentStatus::Cancelado.is_terminal());
        assert!(PaymentStatus::Erro.is_terminal());
    }

    #[test]
    fn test_target_requires_exactly_one_link() {
        let now = Utc::now();
        let mut payment = Payment {
            id: Uuid::new_v4(),
            order_id: Some(Uuid::new_v4()),
            sale_id: None,
            metodo: PaymentMethod::Pix,
            valor: Decimal::new(4500, 2),
            status: PaymentStatus::Pendente,
            gateway_id: None,
            mensagem: None,
            emitir_nfe: false,
            created_by: None,
            created_at: now,
            updated_at: now,
        };
        assert!(matches!(payment.target(), Some(PaymentTarget::Order(_))));

        payment.sale_id = Some(Uuid::new_v4());
        assert_eq!(payment.target(), None);

        payment.order_id = None;
        assert!(matches!(payment.target(), Some(PaymentTarget::Sale(_))));
        assert!(!PaymentMethod::Dinheiro.uses_gateway());
        assert!(PaymentMethod::Pix.uses_gateway());
    }
}
