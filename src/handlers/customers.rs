// src/handlers/customers.rs

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

use crate::{
    common::{
        documento::{validate_documento, validate_placa},
        error::AppError,
    },
    config::AppState,
    db::customer_repo::{CustomerData, VehicleData},
    models::customer::{Customer, CustomerStatus, TipoPessoa, Vehicle},
};

// =============================================================================
//  CLIENTES
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPayload {
    pub tipo_pessoa: TipoPessoa,

    #[validate(length(min = 2, max = 200, message = "O nome deve ter entre 2 e 200 caracteres"))]
    #[schema(example = "Maria da Silva")]
    pub nome: String,

    #[validate(custom(function = "validate_documento"))]
    #[schema(example = "529.982.247-25")]
    pub documento: Option<String>,

    pub inscricao_estadual: Option<String>,

    #[validate(email(message = "E-mail inválido"))]
    pub email: Option<String>,

    pub telefone: Option<String>,
    pub logradouro: Option<String>,
    pub numero: Option<String>,
    pub bairro: Option<String>,
    pub cidade: Option<String>,

    #[validate(length(equal = 2, message = "UF deve ter 2 letras"))]
    pub uf: Option<String>,

    #[validate(length(min = 8, max = 9, message = "CEP inválido"))]
    pub cep: Option<String>,

    pub status: Option<CustomerStatus>,
}

impl From<CustomerPayload> for CustomerData {
    fn from(p: CustomerPayload) -> Self {
        CustomerData {
            tipo_pessoa: p.tipo_pessoa,
            nome: p.nome,
            documento: p.documento,
            inscricao_estadual: p.inscricao_estadual,
            email: p.email,
            telefone: p.telefone,
            logradouro: p.logradouro,
            numero: p.numero,
            bairro: p.bairro,
            cidade: p.cidade,
            uf: p.uf,
            cep: p.cep,
            status: p.status.unwrap_or(CustomerStatus::Ativo),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct ListCustomersQuery {
    /// Busca por nome ou documento
    pub search: Option<String>,
    pub status: Option<CustomerStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Paginação comum às listagens.
pub(crate) fn page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    (limit.unwrap_or(50).clamp(1, 200), offset.unwrap_or(0).max(0))
}

// POST /api/customers
#[utoipa::path(
    post,
    path = "/api/customers",
    tag = "Clientes",
    request_body = CustomerPayload,
    responses(
        (status = 201, description = "Cliente cadastrado", body = Customer),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_customer(
    State(app_state): State<AppState>,
    Json(payload): Json<CustomerPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let customer = app_state.customer_service.create_customer(payload.into()).await?;

    Ok((StatusCode::CREATED, Json(customer)))
}

// GET /api/customers
#[utoipa::path(
    get,
    path = "/api/customers",
    tag = "Clientes",
    params(ListCustomersQuery),
    responses(
        (status = 200, description = "Lista de clientes", body = Vec<Customer>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_customers(
    State(app_state): State<AppState>,
    Query(query): Query<ListCustomersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (limit, offset) = page(query.limit, query.offset);

    let customers = app_state
        .customer_service
        .list_customers(query.search.as_deref(), query.status, limit, offset)
        .await?;

    Ok(Json(customers))
}

// GET /api/customers/{id}
#[utoipa::path(
    get,
    path = "/api/customers/{id}",
    tag = "Clientes",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Cliente", body = Customer),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_customer(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.customer_service.get_customer(id).await?))
}

// PUT /api/customers/{id}
#[utoipa::path(
    put,
    path = "/api/customers/{id}",
    tag = "Clientes",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    request_body = CustomerPayload,
    responses(
        (status = 200, description = "Cliente atualizado", body = Customer),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_customer(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CustomerPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let customer = app_state.customer_service.update_customer(id, payload.into()).await?;

    Ok(Json(customer))
}

// DELETE /api/customers/{id}
#[utoipa::path(
    delete,
    path = "/api/customers/{id}",
    tag = "Clientes",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 204, description = "Cliente excluído"),
        (status = 404, description = "Cliente não encontrado"),
        (status = 409, description = "Cliente possui ordens de serviço")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_customer(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.customer_service.delete_customer(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  VEÍCULOS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VehiclePayload {
    #[validate(custom(function = "validate_placa"))]
    #[schema(example = "BRA2E19")]
    pub placa: String,

    pub marca: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Informe o modelo"))]
    #[schema(example = "Gol 1.6")]
    pub modelo: String,

    #[validate(range(min = 1900, max = 2100, message = "Ano inválido"))]
    pub ano: Option<i32>,

    pub cor: Option<String>,

    #[validate(range(min = 0, message = "Quilometragem não pode ser negativa"))]
    pub quilometragem: Option<i32>,
}

impl From<VehiclePayload> for VehicleData {
    fn from(p: VehiclePayload) -> Self {
        VehicleData {
            placa: p.placa,
            marca: p.marca,
            modelo: p.modelo,
            ano: p.ano,
            cor: p.cor,
            quilometragem: p.quilometragem,
        }
    }
}

// POST /api/customers/{id}/vehicles
#[utoipa::path(
    post,
    path = "/api/customers/{id}/vehicles",
    tag = "Clientes",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    request_body = VehiclePayload,
    responses(
        (status = 201, description = "Veículo cadastrado", body = Vehicle),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_vehicle(
    State(app_state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(payload): Json<VehiclePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let vehicle = app_state.customer_service.create_vehicle(customer_id, payload.into()).await?;

    Ok((StatusCode::CREATED, Json(vehicle)))
}

// GET /api/customers/{id}/vehicles
#[utoipa::path(
    get,
    path = "/api/customers/{id}/vehicles",
    tag = "Clientes",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Veículos do cliente", body = Vec<Vehicle>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_vehicles(
    State(app_state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.customer_service.list_vehicles(customer_id).await?))
}

// PUT /api/vehicles/{id}
#[utoipa::path(
    put,
    path = "/api/vehicles/{id}",
    tag = "Clientes",
    params(("id" = Uuid, Path, description = "ID do veículo")),
    request_body = VehiclePayload,
    responses(
        (status = 200, description = "Veículo atualizado", body = Vehicle),
        (status = 404, description = "Veículo não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_vehicle(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VehiclePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let vehicle = app_state.customer_service.update_vehicle(id, payload.into()).await?;

    Ok(Json(vehicle))
}

// DELETE /api/vehicles/{id}
#[utoipa::path(
    delete,
    path = "/api/vehicles/{id}",
    tag = "Clientes",
    params(("id" = Uuid, Path, description = "ID do veículo")),
    responses(
        (status = 204, description = "Veículo excluído"),
        (status = 404, description = "Veículo não encontrado"),
        (status = 409, description = "Veículo possui ordens de serviço")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_vehicle(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.customer_service.delete_vehicle(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(documento: Option<&str>) -> CustomerPayload {
        CustomerPayload {
            tipo_pessoa: TipoPessoa::Fisica,
            nome: "Maria da Silva".into(),
            documento: documento.map(String::from),
            inscricao_estadual: None,
            email: Some("maria@exemplo.com".into()),
            telefone: None,
            logradouro: None,
            numero: None,
            bairro: None,
            cidade: None,
            uf: Some("SP".into()),
            cep: None,
            status: None,
        }
    }

    #[test]
    fn test_customer_payload_validation() {
        assert!(payload(Some("529.982.247-25")).validate().is_ok());
        assert!(payload(None).validate().is_ok());

        let errors = payload(Some("111.111.111-12")).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("documento"));
    }

    #[test]
    fn test_missing_status_defaults_to_active() {
        let data = CustomerData::from(payload(None));
        assert_eq!(data.status, CustomerStatus::Ativo);
    }

    #[test]
    fn test_vehicle_payload_rejects_bad_plate() {
        let vehicle = VehiclePayload {
            placa: "AB-12".into(),
            marca: None,
            modelo: "Gol".into(),
            ano: Some(2019),
            cor: None,
            quilometragem: None,
        };
        let errors = vehicle.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("placa"));
    }

    #[test]
    fn test_page_clamps_limits() {
        assert_eq!(page(None, None), (50, 0));
        assert_eq!(page(Some(1000), Some(-5)), (200, 0));
        assert_eq!(page(Some(0), Some(10)), (1, 10));
    }
}
