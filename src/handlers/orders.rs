// src/handlers/orders.rs

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
    db::order_repo::{OrderFilter, OrderHeader},
    models::service_order::{BoardColumn, Order, OrderAction, OrderDetail, OrderStatus, OrderSummary},
    services::budget::BudgetLineInput,
};

// =============================================================================
//  ABERTURA E CABEÇALHO
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderHeaderPayload {
    pub vehicle_id: Option<Uuid>,

    #[validate(length(max = 2000))]
    #[schema(example = "Barulho na suspensão dianteira")]
    pub problema_relatado: Option<String>,

    #[validate(length(max = 2000))]
    pub observacoes: Option<String>,

    #[validate(length(max = 120))]
    #[schema(example = "João")]
    pub mecanico: Option<String>,
}

impl From<OrderHeaderPayload> for OrderHeader {
    fn from(p: OrderHeaderPayload) -> Self {
        OrderHeader {
            vehicle_id: p.vehicle_id,
            problema_relatado: p.problema_relatado,
            observacoes: p.observacoes,
            mecanico: p.mecanico,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPayload {
    pub customer_id: Uuid,

    #[serde(flatten)]
    #[validate(nested)]
    pub header: OrderHeaderPayload,
}

// POST /api/orders
#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "Ordens de Serviço",
    request_body = CreateOrderPayload,
    responses(
        (status = 201, description = "OS aberta em ORCAMENTO", body = Order),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Cliente ou veículo não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_order(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateOrderPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let order = app_state
        .order_service
        .create_order(payload.customer_id, payload.header.into())
        .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersQuery {
    pub status: Option<OrderStatus>,
    pub customer_id: Option<Uuid>,
    /// Busca por número, cliente ou placa
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// GET /api/orders
#[utoipa::path(
    get,
    path = "/api/orders",
    tag = "Ordens de Serviço",
    params(ListOrdersQuery),
    responses(
        (status = 200, description = "Lista de OS", body = Vec<OrderSummary>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_orders(
    State(app_state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (limit, offset) = page(query.limit, query.offset);
    let filter = OrderFilter {
        status: query.status,
        customer_id: query.customer_id,
        search: query.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        limit,
        offset,
    };

    Ok(Json(app_state.order_service.list_orders(&filter).await?))
}

// GET /api/orders/board
#[utoipa::path(
    get,
    path = "/api/orders/board",
    tag = "Ordens de Serviço",
    responses(
        (status = 200, description = "OS em aberto agrupadas por status", body = Vec<BoardColumn>)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_board(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.order_service.board().await?))
}

// GET /api/orders/{id}
#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    tag = "Ordens de Serviço",
    params(("id" = Uuid, Path, description = "ID da OS")),
    responses(
        (status = 200, description = "OS com itens, pagamentos e lançamentos", body = OrderDetail),
        (status = 404, description = "OS não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_order(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.order_service.get_detail(id).await?))
}

// PUT /api/orders/{id}
#[utoipa::path(
    put,
    path = "/api/orders/{id}",
    tag = "Ordens de Serviço",
    params(("id" = Uuid, Path, description = "ID da OS")),
    request_body = OrderHeaderPayload,
    responses(
        (status = 200, description = "Cabeçalho atualizado", body = Order),
        (status = 409, description = "OS encerrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_order(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<OrderHeaderPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    Ok(Json(app_state.order_service.update_header(id, payload.into()).await?))
}

// =============================================================================
//  ORÇAMENTO
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BudgetPayload {
    pub itens: Vec<BudgetLineInput>,
}

// PUT /api/orders/{id}/budget
#[utoipa::path(
    put,
    path = "/api/orders/{id}/budget",
    tag = "Ordens de Serviço",
    params(("id" = Uuid, Path, description = "ID da OS")),
    request_body = BudgetPayload,
    responses(
        (status = 200, description = "Orçamento gravado", body = OrderDetail),
        (status = 400, description = "Linhas inválidas (detalhes por linha)"),
        (status = 409, description = "Status não permite editar o orçamento"),
        (status = 422, description = "Estoque insuficiente (ESTOQUE_INSUFICIENTE)")
    ),
    security(("api_jwt" = []))
)]
pub async fn save_budget(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BudgetPayload>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.order_service.save_budget(id, &payload.itens).await?))
}

// =============================================================================
//  FLUXO DE STATUS
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderTransitionPayload {
    #[schema(example = "APROVACAO_ORCAMENTO")]
    pub status: OrderStatus,
}

// POST /api/orders/{id}/transition
#[utoipa::path(
    post,
    path = "/api/orders/{id}/transition",
    tag = "Ordens de Serviço",
    params(("id" = Uuid, Path, description = "ID da OS")),
    request_body = OrderTransitionPayload,
    responses(
        (status = 200, description = "Status alterado", body = Order),
        (status = 409, description = "Transição inválida"),
        (status = 422, description = "Estoque insuficiente na aprovação")
    ),
    security(("api_jwt" = []))
)]
pub async fn transition_order(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<OrderTransitionPayload>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.order_service.transition(id, payload.status).await?))
}

// GET /api/orders/{id}/actions
#[utoipa::path(
    get,
    path = "/api/orders/{id}/actions",
    tag = "Ordens de Serviço",
    params(("id" = Uuid, Path, description = "ID da OS")),
    responses(
        (status = 200, description = "Ações disponíveis no status atual", body = Vec<OrderAction>),
        (status = 404, description = "OS não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_actions(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.order_service.actions(id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_payload_flattens_header() {
        let customer_id = Uuid::new_v4();
        let payload: CreateOrderPayload = serde_json::from_value(json!({
            "customerId": customer_id,
            "problemaRelatado": "Não liga",
            "mecanico": "João"
        }))
        .unwrap();

        assert_eq!(payload.customer_id, customer_id);
        assert!(payload.validate().is_ok());

        let header = OrderHeader::from(payload.header);
        assert_eq!(header.mecanico.as_deref(), Some("João"));
        assert!(header.vehicle_id.is_none());
    }

    #[test]
    fn test_budget_payload_uses_catalog_price_when_missing() {
        let payload: BudgetPayload = serde_json::from_value(json!({
            "itens": [
                { "tipo": "PRODUTO", "itemId": Uuid::new_v4(), "quantidade": 2 },
                { "tipo": "SERVICO", "itemId": Uuid::new_v4(), "quantidade": 1, "valorUnitario": 80.0, "desconto": 5.0 }
            ]
        }))
        .unwrap();

        assert_eq!(payload.itens.len(), 2);
        assert!(payload.itens[0].valor_unitario.is_none());
        assert!(payload.itens[0].desconto.is_zero());
        assert!(payload.itens[1].valor_unitario.is_some());
    }

    #[test]
    fn test_transition_payload_rejects_unknown_status() {
        let result = serde_json::from_value::<OrderTransitionPayload>(json!({ "status": "ENTREGUE" }));
        assert!(result.is_err());
    }
}
