use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::service_order::OrderStatus;
use crate::services::budget::{LineError, StockShortfall};

// Nosso tipo de erro, agora com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Erros por linha do orçamento/venda (índice da linha -> mensagem)
    #[error("Linhas inválidas")]
    InvalidLines(Vec<LineError>),

    #[error("Requisição inválida: {0}")]
    BadRequest(String),

    #[error("Token inválido")]
    InvalidToken,

    #[error("Recurso não encontrado: {0}")]
    ResourceNotFound(String),

    #[error("Transição de {from:?} para {to:?} não permitida")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Conflito: {0}")]
    Conflict(String),

    #[error("Estoque insuficiente")]
    InsufficientStock(Vec<StockShortfall>),

    #[error("Falha no serviço externo: {0}")]
    GatewayError(String),

    // Variante para erros de banco de dados (exemplo com sqlx)
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro ao rodar migrações: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::GatewayError(e.to_string())
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidLines(_) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::InvalidToken | AppError::JwtError(_) => StatusCode::UNAUTHORIZED,
            AppError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseError(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            AppError::InvalidTransition { .. } | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InsufficientStock(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::GatewayError(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            // Retorna todos os detalhes da validação.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                })
            }
            AppError::InvalidLines(lines) => json!({
                "error": "Um ou mais itens são inválidos.",
                "details": lines,
            }),
            // O cliente usa `linhas` para marcar o erro na linha certa do orçamento.
            AppError::InsufficientStock(shortfalls) => json!({
                "error": "Estoque insuficiente para um ou mais produtos.",
                "code": "ESTOQUE_INSUFICIENTE",
                "details": shortfalls,
            }),
            AppError::InvalidTransition { from, to } => json!({
                "error": "Transição de status não permitida.",
                "details": { "de": from, "para": to },
            }),
            AppError::BadRequest(msg) | AppError::Conflict(msg) => json!({ "error": msg }),
            AppError::ResourceNotFound(what) => json!({ "error": format!("{} não encontrado(a).", what) }),
            AppError::DatabaseError(sqlx::Error::RowNotFound) => {
                json!({ "error": "Registro não encontrado." })
            }
            AppError::InvalidToken | AppError::JwtError(_) => {
                json!({ "error": "Token de autenticação inválido ou ausente." })
            }
            AppError::GatewayError(msg) => {
                tracing::warn!("Falha em serviço externo: {}", msg);
                json!({ "error": "O serviço externo não respondeu corretamente.", "details": msg })
            }
            // Todos os outros erros (DatabaseError, InternalServerError) viram 500.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                json!({ "error": "Ocorreu um erro inesperado." })
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_insufficient_stock_payload() {
        let product_id = Uuid::new_v4();
        let err = AppError::InsufficientStock(vec![StockShortfall {
            product_id,
            produto: "Filtro de óleo".into(),
            disponivel: dec!(2),
            solicitado: dec!(5),
            linhas: vec![0],
        }]);

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(body["code"], "ESTOQUE_INSUFICIENTE");
        assert_eq!(body["details"][0]["productId"], product_id.to_string());
        assert_eq!(body["details"][0]["disponivel"], json!(2.0));
        assert_eq!(body["details"][0]["solicitado"], json!(5.0));
        assert_eq!(body["details"][0]["linhas"], json!([0]));
    }

    #[tokio::test]
    async fn test_invalid_transition_payload() {
        let err = AppError::InvalidTransition {
            from: OrderStatus::Concluido,
            to: OrderStatus::EmAndamento,
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = body_json(response).await;
        assert_eq!(body["details"]["de"], "CONCLUIDO");
        assert_eq!(body["details"]["para"], "EM_ANDAMENTO");
    }

    #[tokio::test]
    async fn test_row_not_found_is_404() {
        let response = AppError::DatabaseError(sqlx::Error::RowNotFound).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_internal_error_hides_cause() {
        let response = AppError::InternalServerError(anyhow::anyhow!("senha do banco: 123")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Ocorreu um erro inesperado.");
    }
}
