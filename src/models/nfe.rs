// src/models/nfe.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "nfe_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NfeStatus {
    Rascunho,
    Autorizada,
    Rejeitada,
    Cancelada,
}

impl NfeStatus {
    pub fn can_authorize(self) -> bool {
        matches!(self, NfeStatus::Rascunho | NfeStatus::Rejeitada)
    }

    pub fn can_cancel(self) -> bool {
        self == NfeStatus::Autorizada
    }

    pub fn can_delete(self) -> bool {
        self == NfeStatus::Rascunho
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Nfe {
    pub id: Uuid,
    #[schema(example = 57)]
    pub numero: i64,
    #[schema(example = 1)]
    pub serie: i32,
    pub order_id: Option<Uuid>,
    pub sale_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub status: NfeStatus,
    #[schema(example = "450.00")]
    pub valor_total: Decimal,
    #[schema(example = "35261011222333000181550010000000571000000570")]
    pub chave: Option<String>,
    pub protocolo: Option<String>,
    // Motivo da rejeição ou justificativa do cancelamento
    pub motivo: Option<String>,
    pub autorizada_em: Option<DateTime<Utc>>,
    pub cancelada_em: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NfeItem {
    pub id: Uuid,
    pub nfe_id: Uuid,
    pub source_item_id: Uuid,
    pub codigo: Option<String>,
    pub descricao: String,
    pub ncm: Option<String>,
    pub unidade: String,
    pub quantidade: Decimal,
    pub valor_unitario: Decimal,
    pub desconto: Decimal,
    pub valor_total: Decimal,
    pub posicao: i32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NfeDetail {
    #[serde(flatten)]
    pub header: Nfe,
    pub items: Vec<NfeItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_guards() {
        // (status, autorizar, cancelar, excluir)
        let table = [
            (NfeStatus::Rascunho, true, false, true),
            (NfeStatus::Rejeitada, true, false, false),
            (NfeStatus::Autorizada, false, true, false),
            (NfeStatus::Cancelada, false, false, false),
        ];
        for (status, authorize, cancel, delete) in table {
            assert_eq!(status.can_authorize(), authorize, "{:?}", status);
            assert_eq!(status.can_cancel(), cancel, "{:?}", status);
            assert_eq!(status.can_delete(), delete, "{:?}", status);
        }
    }
}
