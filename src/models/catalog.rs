// src/models/catalog.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Produtos (peças) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    #[schema(example = "FO-1020")]
    pub codigo: String,
    #[schema(example = "Filtro de óleo")]
    pub nome: String,
    #[schema(example = "UN")]
    pub unidade: String,
    #[schema(example = "84212300")]
    pub ncm: Option<String>,
    #[schema(example = "45.90")]
    pub preco_venda: Decimal,
    #[schema(example = "22.00")]
    pub custo: Decimal,
    #[schema(example = "12")]
    pub estoque: Decimal,
    pub ativo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Serviços (mão de obra) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: Uuid,
    #[schema(example = "Troca de óleo")]
    pub nome: String,
    pub descricao: Option<String>,
    #[schema(example = "60.00")]
    pub preco: Decimal,
    pub ativo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
