// src/handlers/payments.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::validate_positive;
use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::payment::{Payment, PaymentMethod, PaymentTarget},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartPaymentPayload {
    #[schema(example = "PIX")]
    pub metodo: PaymentMethod,

    #[validate(custom(function = "validate_positive"))]
    #[schema(example = "150.00")]
    pub valor: Decimal,

    /// Emite a NF-e automaticamente quando o pagamento quitar o documento
    #[serde(default)]
    pub emitir_nfe: bool,
}

async fn start(
    app_state: &AppState,
    user: &AuthenticatedUser,
    target: PaymentTarget,
    payload: StartPaymentPayload,
) -> Result<Payment, AppError> {
    payload.validate()?;

    app_state
        .payment_service
        .start(target, payload.metodo, payload.valor, payload.emitir_nfe, Some(user.id))
        .await
}

// POST /api/orders/{id}/payments
#[utoipa::path(
    post,
    path = "/api/orders/{id}/payments",
    tag = "Pagamentos",
    params(("id" = Uuid, Path, description = "ID da OS")),
    request_body = StartPaymentPayload,
    responses(
        (status = 202, description = "Pagamento iniciado; consulte o status em /api/payments/{id}", body = Payment),
        (status = 400, description = "Valor inválido"),
        (status = 409, description = "OS fora de PAGAMENTO ou pagamento em andamento"),
        (status = 502, description = "Falha no gateway de pagamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn start_order_payment(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<StartPaymentPayload>,
) -> Result<impl IntoResponse, AppError> {
    let payment = start(&app_state, &user, PaymentTarget::Order(id), payload).await?;
    Ok((StatusCode::ACCEPTED, Json(payment)))
}

// POST /api/sales/{id}/payments
#[utoipa::path(
    post,
    path = "/api/sales/{id}/payments",
    tag = "Pagamentos",
    params(("id" = Uuid, Path, description = "ID da venda")),
    request_body = StartPaymentPayload,
    responses(
        (status = 202, description = "Pagamento iniciado; consulte o status em /api/payments/{id}", body = Payment),
        (status = 400, description = "Valor inválido"),
        (status = 409, description = "Venda fora de PAGAMENTO ou pagamento em andamento"),
        (status = 502, description = "Falha no gateway de pagamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn start_sale_payment(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<StartPaymentPayload>,
) -> Result<impl IntoResponse, AppError> {
    let payment = start(&app_state, &user, PaymentTarget::Sale(id), payload).await?;
    Ok((StatusCode::ACCEPTED, Json(payment)))
}

// GET /api/payments/{id}
#[utoipa::path(
    get,
    path = "/api/payments/{id}",
    tag = "Pagamentos",
    params(("id" = Uuid, Path, description = "ID do pagamento")),
    responses(
        (status = 200, description = "Situação do pagamento", body = Payment),
        (status = 404, description = "Pagamento não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_payment(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.payment_service.get(id).await?))
}

// POST /api/payments/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/payments/{id}/cancel",
    tag = "Pagamentos",
    params(("id" = Uuid, Path, description = "ID do pagamento")),
    responses(
        (status = 200, description = "Pagamento cancelado", body = Payment),
        (status = 409, description = "Pagamento já finalizado"),
        (status = 502, description = "Falha no gateway de pagamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_payment(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.payment_service.cancel(id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_start_payload() {
        let payload: StartPaymentPayload =
            serde_json::from_value(json!({ "metodo": "CARTAO_CREDITO", "valor": 150.0 })).unwrap();

        assert_eq!(payload.metodo, PaymentMethod::CartaoCredito);
        assert!(!payload.emitir_nfe);
        assert!(payload.validate().is_ok());

        let zero: StartPaymentPayload = serde_json::from_value(json!({ "metodo": "PIX", "valor": 0 })).unwrap();
        assert!(zero.validate().is_err());
    }
}
