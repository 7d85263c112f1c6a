// src/handlers/nfe.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    models::nfe::{Nfe, NfeDetail, NfeStatus},
    services::nfe_service::NfeSource,
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateNfePayload {
    pub order_id: Option<Uuid>,
    pub sale_id: Option<Uuid>,
    /// Itens da OS/venda a faturar; ausente = todos
    pub item_ids: Option<Vec<Uuid>>,
}

impl CreateNfePayload {
    fn source(&self) -> Result<NfeSource, AppError> {
        match (self.order_id, self.sale_id) {
            (Some(id), None) => Ok(NfeSource::Order(id)),
            (None, Some(id)) => Ok(NfeSource::Sale(id)),
            _ => Err(AppError::BadRequest("Informe orderId ou saleId (apenas um).".into())),
        }
    }
}

// POST /api/nfe
#[utoipa::path(
    post,
    path = "/api/nfe",
    tag = "NF-e",
    request_body = CreateNfePayload,
    responses(
        (status = 201, description = "Rascunho criado", body = NfeDetail),
        (status = 400, description = "Origem ou itens inválidos"),
        (status = 409, description = "Origem não permite emissão")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_nfe(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateNfePayload>,
) -> Result<impl IntoResponse, AppError> {
    let source = payload.source()?;

    let nfe = app_state
        .nfe_service
        .create_draft(source, payload.item_ids.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(nfe)))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct ListNfeQuery {
    pub status: Option<NfeStatus>,
    pub order_id: Option<Uuid>,
    pub sale_id: Option<Uuid>,
}

// GET /api/nfe
#[utoipa::path(
    get,
    path = "/api/nfe",
    tag = "NF-e",
    params(ListNfeQuery),
    responses(
        (status = 200, description = "Notas emitidas", body = Vec<Nfe>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_nfes(
    State(app_state): State<AppState>,
    Query(query): Query<ListNfeQuery>,
) -> Result<impl IntoResponse, AppError> {
    let nfes = app_state
        .nfe_service
        .list(query.status, query.order_id, query.sale_id)
        .await?;

    Ok(Json(nfes))
}

// GET /api/nfe/{id}
#[utoipa::path(
    get,
    path = "/api/nfe/{id}",
    tag = "NF-e",
    params(("id" = Uuid, Path, description = "ID da nota")),
    responses(
        (status = 200, description = "Nota com itens", body = NfeDetail),
        (status = 404, description = "Nota não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_nfe(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.nfe_service.get_detail(id).await?))
}

// POST /api/nfe/{id}/authorize
#[utoipa::path(
    post,
    path = "/api/nfe/{id}/authorize",
    tag = "NF-e",
    params(("id" = Uuid, Path, description = "ID da nota")),
    responses(
        (status = 200, description = "Resultado da SEFAZ (AUTORIZADA ou REJEITADA)", body = NfeDetail),
        (status = 409, description = "Nota não está em RASCUNHO/REJEITADA"),
        (status = 502, description = "Falha no emissor")
    ),
    security(("api_jwt" = []))
)]
pub async fn authorize_nfe(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.nfe_service.authorize(id).await?))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CancelNfePayload {
    #[schema(example = "Nota emitida com valor incorreto")]
    pub justificativa: String,
}

// POST /api/nfe/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/nfe/{id}/cancel",
    tag = "NF-e",
    params(("id" = Uuid, Path, description = "ID da nota")),
    request_body = CancelNfePayload,
    responses(
        (status = 200, description = "Nota cancelada", body = NfeDetail),
        (status = 400, description = "Justificativa fora de 15 a 255 caracteres"),
        (status = 409, description = "Nota não está AUTORIZADA"),
        (status = 502, description = "Falha no emissor")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_nfe(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelNfePayload>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.nfe_service.cancel(id, &payload.justificativa).await?))
}

// GET /api/nfe/{id}/status
#[utoipa::path(
    get,
    path = "/api/nfe/{id}/status",
    tag = "NF-e",
    params(("id" = Uuid, Path, description = "ID da nota")),
    responses(
        (status = 200, description = "Situação sincronizada com a SEFAZ", body = Nfe),
        (status = 404, description = "Nota não encontrada"),
        (status = 502, description = "Falha no emissor")
    ),
    security(("api_jwt" = []))
)]
pub async fn nfe_status(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.nfe_service.query_status(id).await?))
}

// DELETE /api/nfe/{id}
#[utoipa::path(
    delete,
    path = "/api/nfe/{id}",
    tag = "NF-e",
    params(("id" = Uuid, Path, description = "ID da nota")),
    responses(
        (status = 204, description = "Rascunho excluído"),
        (status = 409, description = "Só rascunhos podem ser excluídos")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_nfe(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.nfe_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(order_id: Option<Uuid>, sale_id: Option<Uuid>) -> CreateNfePayload {
        CreateNfePayload { order_id, sale_id, item_ids: None }
    }

    #[test]
    fn test_source_requires_exactly_one_origin() {
        let id = Uuid::new_v4();
        assert_eq!(payload(Some(id), None).source().unwrap(), NfeSource::Order(id));
        assert_eq!(payload(None, Some(id)).source().unwrap(), NfeSource::Sale(id));

        assert!(matches!(payload(None, None).source(), Err(AppError::BadRequest(_))));
        assert!(matches!(payload(Some(id), Some(id)).source(), Err(AppError::BadRequest(_))));
    }
}
