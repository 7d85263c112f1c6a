// src/handlers/sales.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::customers::page;
use crate::{
    common::error::AppError,
    config::AppState,
    models::sale::{Sale, SaleDetail, SaleStatus},
    services::sale_service::SaleLineInput,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSalePayload {
    /// Venda de balcão pode não ter cliente identificado
    pub customer_id: Option<Uuid>,

    #[validate(length(max = 2000))]
    pub observacoes: Option<String>,

    #[validate(length(min = 1, message = "Informe ao menos um item."))]
    pub itens: Vec<SaleLineInput>,
}

// POST /api/sales
#[utoipa::path(
    post,
    path = "/api/sales",
    tag = "Vendas",
    request_body = CreateSalePayload,
    responses(
        (status = 201, description = "Venda aberta", body = SaleDetail),
        (status = 400, description = "Itens inválidos"),
        (status = 422, description = "Estoque insuficiente")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_sale(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateSalePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let sale = app_state
        .sale_service
        .create_sale(payload.customer_id, payload.observacoes.as_deref(), &payload.itens)
        .await?;

    Ok((StatusCode::CREATED, Json(sale)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleItemsPayload {
    #[validate(length(min = 1, message = "Informe ao menos um item."))]
    pub itens: Vec<SaleLineInput>,
}

// PUT /api/sales/{id}/items
#[utoipa::path(
    put,
    path = "/api/sales/{id}/items",
    tag = "Vendas",
    params(("id" = Uuid, Path, description = "ID da venda")),
    request_body = SaleItemsPayload,
    responses(
        (status = 200, description = "Itens substituídos", body = SaleDetail),
        (status = 409, description = "Venda não está ABERTA"),
        (status = 422, description = "Estoque insuficiente")
    ),
    security(("api_jwt" = []))
)]
pub async fn replace_items(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SaleItemsPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    Ok(Json(app_state.sale_service.replace_items(id, &payload.itens).await?))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SaleTransitionPayload {
    #[schema(example = "PAGAMENTO")]
    pub status: SaleStatus,
}

// POST /api/sales/{id}/transition
#[utoipa::path(
    post,
    path = "/api/sales/{id}/transition",
    tag = "Vendas",
    params(("id" = Uuid, Path, description = "ID da venda")),
    request_body = SaleTransitionPayload,
    responses(
        (status = 200, description = "Status alterado", body = Sale),
        (status = 409, description = "Transição inválida")
    ),
    security(("api_jwt" = []))
)]
pub async fn transition_sale(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SaleTransitionPayload>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.sale_service.transition(id, payload.status).await?))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListSalesQuery {
    pub status: Option<SaleStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// GET /api/sales
#[utoipa::path(
    get,
    path = "/api/sales",
    tag = "Vendas",
    params(ListSalesQuery),
    responses(
        (status = 200, description = "Lista de vendas", body = Vec<Sale>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_sales(
    State(app_state): State<AppState>,
    Query(query): Query<ListSalesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (limit, offset) = page(query.limit, query.offset);
    Ok(Json(app_state.sale_service.list_sales(query.status, limit, offset).await?))
}

// GET /api/sales/{id}
#[utoipa::path(
    get,
    path = "/api/sales/{id}",
    tag = "Vendas",
    params(("id" = Uuid, Path, description = "ID da venda")),
    responses(
        (status = 200, description = "Venda com itens e pagamentos", body = SaleDetail),
        (status = 404, description = "Venda não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_sale(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.sale_service.get_detail(id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sale_without_items_is_rejected() {
        let payload: CreateSalePayload = serde_json::from_value(json!({ "itens": [] })).unwrap();
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("itens"));
    }

    #[test]
    fn test_counter_sale_without_customer() {
        let payload: CreateSalePayload = serde_json::from_value(json!({
            "itens": [{ "productId": Uuid::new_v4(), "quantidade": 1 }]
        }))
        .unwrap();

        assert!(payload.customer_id.is_none());
        assert!(payload.validate().is_ok());
    }
}
