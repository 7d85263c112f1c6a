// src/handlers/catalog.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::{validate_not_negative, validate_positive};
use crate::{
    common::error::AppError,
    config::AppState,
    db::catalog_repo::{ProductData, ServiceData},
    models::catalog::{Product, Service},
};

fn default_true() -> bool {
    true
}

// =============================================================================
//  PRODUTOS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    #[validate(length(min = 1, max = 60, message = "O código é obrigatório."))]
    #[schema(example = "FO-1020")]
    pub codigo: String,

    #[validate(length(min = 2, max = 200, message = "O nome deve ter no mínimo 2 caracteres"))]
    #[schema(example = "Filtro de óleo")]
    pub nome: String,

    #[validate(length(min = 1, max = 6))]
    #[schema(example = "UN")]
    pub unidade: String,

    // NCM tem sempre 8 dígitos
    #[validate(length(equal = 8, message = "O NCM deve ter 8 dígitos."))]
    pub ncm: Option<String>,

    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = "45.90")]
    pub preco_venda: Decimal,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub custo: Decimal,

    /// Usado só no cadastro
    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub estoque_inicial: Decimal,

    #[serde(default = "default_true")]
    pub ativo: bool,
}

impl ProductPayload {
    fn data(self) -> (ProductData, Decimal) {
        let data = ProductData {
            codigo: self.codigo.trim().to_string(),
            nome: self.nome,
            unidade: self.unidade.to_uppercase(),
            ncm: self.ncm,
            preco_venda: self.preco_venda,
            custo: self.custo,
            ativo: self.ativo,
        };
        (data, self.estoque_inicial)
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct ListCatalogQuery {
    /// Busca por código ou nome
    pub search: Option<String>,
    /// Inclui itens inativos
    #[serde(default)]
    pub incluir_inativos: bool,
}

// POST /api/products
#[utoipa::path(
    post,
    path = "/api/products",
    tag = "Catálogo",
    request_body = ProductPayload,
    responses(
        (status = 201, description = "Produto cadastrado", body = Product),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Código já utilizado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    Json(payload): Json<ProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let (data, estoque_inicial) = payload.data();
    let product = app_state.catalog_service.create_product(data, estoque_inicial).await?;

    Ok((StatusCode::CREATED, Json(product)))
}

// GET /api/products
#[utoipa::path(
    get,
    path = "/api/products",
    tag = "Catálogo",
    params(ListCatalogQuery),
    responses(
        (status = 200, description = "Lista de produtos", body = Vec<Product>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_products(
    State(app_state): State<AppState>,
    Query(query): Query<ListCatalogQuery>,
) -> Result<impl IntoResponse, AppError> {
    let products = app_state
        .catalog_service
        .list_products(query.search.as_deref(), !query.incluir_inativos)
        .await?;

    Ok(Json(products))
}

// GET /api/products/{id}
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    tag = "Catálogo",
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Produto", body = Product),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_product(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.catalog_service.get_product(id).await?))
}

// PUT /api/products/{id}
// O estoque não muda por aqui; use a entrada de estoque.
#[utoipa::path(
    put,
    path = "/api/products/{id}",
    tag = "Catálogo",
    params(("id" = Uuid, Path, description = "ID do produto")),
    request_body = ProductPayload,
    responses(
        (status = 200, description = "Produto atualizado", body = Product),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_product(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let (data, _) = payload.data();
    let product = app_state.catalog_service.update_product(id, data).await?;

    Ok(Json(product))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockEntryPayload {
    #[validate(custom(function = "validate_positive"))]
    #[schema(example = "10")]
    pub quantidade: Decimal,
}

// POST /api/products/{id}/stock-entry
#[utoipa::path(
    post,
    path = "/api/products/{id}/stock-entry",
    tag = "Catálogo",
    params(("id" = Uuid, Path, description = "ID do produto")),
    request_body = StockEntryPayload,
    responses(
        (status = 200, description = "Estoque atualizado", body = Product),
        (status = 400, description = "Quantidade inválida"),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn stock_entry(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StockEntryPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let product = app_state.catalog_service.stock_entry(id, payload.quantidade).await?;

    Ok(Json(product))
}

// =============================================================================
//  SERVIÇOS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServicePayload {
    #[validate(length(min = 2, max = 200, message = "O nome deve ter no mínimo 2 caracteres"))]
    #[schema(example = "Troca de óleo")]
    pub nome: String,

    pub descricao: Option<String>,

    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = "60.00")]
    pub preco: Decimal,

    #[serde(default = "default_true")]
    pub ativo: bool,
}

impl From<ServicePayload> for ServiceData {
    fn from(p: ServicePayload) -> Self {
        ServiceData {
            nome: p.nome,
            descricao: p.descricao,
            preco: p.preco,
            ativo: p.ativo,
        }
    }
}

// POST /api/services
#[utoipa::path(
    post,
    path = "/api/services",
    tag = "Catálogo",
    request_body = ServicePayload,
    responses(
        (status = 201, description = "Serviço cadastrado", body = Service),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_service(
    State(app_state): State<AppState>,
    Json(payload): Json<ServicePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let service = app_state.catalog_service.create_service(payload.into()).await?;

    Ok((StatusCode::CREATED, Json(service)))
}

// GET /api/services
#[utoipa::path(
    get,
    path = "/api/services",
    tag = "Catálogo",
    params(ListCatalogQuery),
    responses(
        (status = 200, description = "Lista de serviços", body = Vec<Service>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_services(
    State(app_state): State<AppState>,
    Query(query): Query<ListCatalogQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.catalog_service.list_services(!query.incluir_inativos).await?))
}

// PUT /api/services/{id}
#[utoipa::path(
    put,
    path = "/api/services/{id}",
    tag = "Catálogo",
    params(("id" = Uuid, Path, description = "ID do serviço")),
    request_body = ServicePayload,
    responses(
        (status = 200, description = "Serviço atualizado", body = Service),
        (status = 404, description = "Serviço não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_service(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ServicePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let service = app_state.catalog_service.update_service(id, payload.into()).await?;

    Ok(Json(service))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_product_payload_defaults() {
        let payload: ProductPayload = serde_json::from_value(json!({
            "codigo": " FO-1020 ",
            "nome": "Filtro de óleo",
            "unidade": "un",
            "precoVenda": 45.9
        }))
        .unwrap();

        assert!(payload.validate().is_ok());
        let (data, estoque) = payload.data();
        assert_eq!(data.codigo, "FO-1020");
        assert_eq!(data.unidade, "UN");
        assert!(data.ativo);
        assert_eq!(estoque, Decimal::ZERO);
    }

    #[test]
    fn test_negative_price_is_rejected() {
        let payload = ServicePayload {
            nome: "Alinhamento".into(),
            descricao: None,
            preco: dec!(-1),
            ativo: true,
        };
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("preco"));
    }

    #[test]
    fn test_stock_entry_requires_positive_quantity() {
        assert!(StockEntryPayload { quantidade: dec!(0) }.validate().is_err());
        assert!(StockEntryPayload { quantidade: dec!(2.5) }.validate().is_ok());
    }
}
