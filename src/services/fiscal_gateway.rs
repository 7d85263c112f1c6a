// src/services/fiscal_gateway.rs

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::error::AppError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FiscalRecipient {
    pub nome: String,
    pub documento: Option<String>,
    pub email: Option<String>,
    pub logradouro: Option<String>,
    pub numero: Option<String>,
    pub bairro: Option<String>,
    pub cidade: Option<String>,
    pub uf: Option<String>,
    pub cep: Option<String>,
    pub inscricao_estadual: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FiscalItem {
    pub codigo: Option<String>,
    pub descricao: String,
    pub ncm: Option<String>,
    pub unidade: String,
    pub quantidade: Decimal,
    pub valor_unitario: Decimal,
    pub desconto: Decimal,
    pub valor_total: Decimal,
}

/// Documento enviado à integração NF-e.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FiscalDocument {
    pub referencia: Uuid,
    pub numero: i64,
    pub serie: i32,
    pub destinatario: Option<FiscalRecipient>,
    pub itens: Vec<FiscalItem>,
    pub valor_total: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FiscalStatus {
    Autorizada,
    Rejeitada,
    Cancelada,
    // A SEFAZ ainda não respondeu
    Processando,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiscalResponse {
    pub status: FiscalStatus,
    #[serde(default)]
    pub chave: Option<String>,
    #[serde(default)]
    pub protocolo: Option<String>,
    #[serde(default)]
    pub motivo: Option<String>,
}

/// Integração com a SEFAZ (API de terceiros).
#[async_trait]
pub trait FiscalGateway: Send + Sync {
    async fn authorize(&self, document: &FiscalDocument) -> Result<FiscalResponse, AppError>;

    async fn cancel(&self, chave: &str, justificativa: &str) -> Result<FiscalResponse, AppError>;

    async fn query(&self, chave: &str) -> Result<FiscalResponse, AppError>;
}

pub struct HttpFiscalGateway {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl HttpFiscalGateway {
    pub fn new(base_url: String, token: String, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    async fn read(&self, response: reqwest::Response) -> Result<FiscalResponse, AppError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::GatewayError(format!("integração NF-e respondeu {}: {}", status, body)));
        }
        Ok(response.json::<FiscalResponse>().await?)
    }
}

#[async_trait]
impl FiscalGateway for HttpFiscalGateway {
    async fn authorize(&self, document: &FiscalDocument) -> Result<FiscalResponse, AppError> {
        let response = self
            .client
            .post(format!("{}/nfe", self.base_url))
            .bearer_auth(&self.token)
            .json(document)
            .send()
            .await?;
        self.read(response).await
    }

    async fn cancel(&self, chave: &str, justificativa: &str) -> Result<FiscalResponse, AppError> {
        let response = self
            .client
            .post(format!("{}/nfe/{}/cancel", self.base_url, chave))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "justificativa": justificativa }))
            .send()
            .await?;
        self.read(response).await
    }

    async fn query(&self, chave: &str) -> Result<FiscalResponse, AppError> {
        let response = self
            .client
            .get(format!("{}/nfe/{}", self.base_url, chave))
            .bearer_auth(&self.token)
            .send()
            .await?;
        self.read(response).await
    }
}
