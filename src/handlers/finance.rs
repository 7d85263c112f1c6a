// src/handlers/finance.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::validate_positive;
use crate::{
    common::error::AppError,
    config::AppState,
    db::finance_repo::{NewTransaction, TransactionFilter},
    middleware::auth::AuthenticatedUser,
    models::finance::{CashFlowSummary, Transaction, TransactionKind},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_single_link"))]
pub struct CreateTransactionPayload {
    #[schema(example = "DESPESA")]
    pub tipo: TransactionKind,

    #[validate(length(min = 2, max = 255, message = "A descrição deve ter no mínimo 2 caracteres"))]
    #[schema(example = "Conta de energia")]
    pub descricao: String,

    #[validate(custom(function = "validate_positive"))]
    #[schema(example = "320.50")]
    pub valor: Decimal,

    /// Padrão: hoje
    #[schema(value_type = Option<String>, format = Date)]
    pub data: Option<NaiveDate>,

    pub categoria: Option<String>,
    pub order_id: Option<Uuid>,
    pub sale_id: Option<Uuid>,
}

// Um lançamento pertence a uma OS ou a uma venda, nunca às duas
fn validate_single_link(payload: &CreateTransactionPayload) -> Result<(), ValidationError> {
    if payload.order_id.is_some() && payload.sale_id.is_some() {
        let mut err = ValidationError::new("vinculo");
        err.message = Some("Informe orderId ou saleId, não ambos.".into());
        return Err(err);
    }
    Ok(())
}

// POST /api/transactions
#[utoipa::path(
    post,
    path = "/api/transactions",
    tag = "Financeiro",
    request_body = CreateTransactionPayload,
    responses(
        (status = 201, description = "Lançamento registrado", body = Transaction),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_transaction(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateTransactionPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let data = NewTransaction {
        tipo: payload.tipo,
        descricao: payload.descricao,
        valor: payload.valor,
        data: payload.data.unwrap_or_else(|| Utc::now().date_naive()),
        categoria: payload.categoria,
        order_id: payload.order_id,
        sale_id: payload.sale_id,
        payment_id: None,
        criado_por: Some(user.id),
    };

    let transaction = app_state.finance_service.create_transaction(data).await?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct TransactionQuery {
    /// Data inicial (inclusive)
    #[param(value_type = Option<String>, format = Date)]
    pub inicio: Option<NaiveDate>,
    /// Data final (inclusive)
    #[param(value_type = Option<String>, format = Date)]
    pub fim: Option<NaiveDate>,
    pub tipo: Option<TransactionKind>,
    pub order_id: Option<Uuid>,
    pub sale_id: Option<Uuid>,
}

impl From<TransactionQuery> for TransactionFilter {
    fn from(q: TransactionQuery) -> Self {
        TransactionFilter {
            inicio: q.inicio,
            fim: q.fim,
            tipo: q.tipo,
            order_id: q.order_id,
            sale_id: q.sale_id,
        }
    }
}

// GET /api/transactions
#[utoipa::path(
    get,
    path = "/api/transactions",
    tag = "Financeiro",
    params(TransactionQuery),
    responses(
        (status = 200, description = "Lançamentos do período", body = Vec<Transaction>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_transactions(
    State(app_state): State<AppState>,
    Query(query): Query<TransactionQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = TransactionFilter::from(query);
    Ok(Json(app_state.finance_service.list_transactions(&filter).await?))
}

// GET /api/transactions/summary
#[utoipa::path(
    get,
    path = "/api/transactions/summary",
    tag = "Financeiro",
    params(TransactionQuery),
    responses(
        (status = 200, description = "Fluxo de caixa do período", body = CashFlowSummary)
    ),
    security(("api_jwt" = []))
)]
pub async fn cash_flow_summary(
    State(app_state): State<AppState>,
    Query(query): Query<TransactionQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = TransactionFilter::from(query);
    Ok(Json(app_state.finance_service.cash_flow(&filter).await?))
}

// DELETE /api/transactions/{id}
#[utoipa::path(
    delete,
    path = "/api/transactions/{id}",
    tag = "Financeiro",
    params(("id" = Uuid, Path, description = "ID do lançamento")),
    responses(
        (status = 204, description = "Lançamento excluído"),
        (status = 404, description = "Lançamento não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_transaction(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.finance_service.delete_transaction(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transaction_cannot_link_order_and_sale() {
        let payload: CreateTransactionPayload = serde_json::from_value(json!({
            "tipo": "RECEITA",
            "descricao": "Acerto",
            "valor": 10.0,
            "orderId": Uuid::new_v4(),
            "saleId": Uuid::new_v4()
        }))
        .unwrap();

        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_manual_expense_is_valid() {
        let payload: CreateTransactionPayload = serde_json::from_value(json!({
            "tipo": "DESPESA",
            "descricao": "Conta de energia",
            "valor": 320.5,
            "data": "2026-10-01"
        }))
        .unwrap();

        assert!(payload.validate().is_ok());
        assert_eq!(payload.data, NaiveDate::from_ymd_opt(2026, 10, 1));
    }
}
