// src/services/payment_gateway.rs

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    common::error::AppError,
    models::payment::{PaymentMethod, PaymentStatus},
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeRequest {
    pub referencia: String,
    pub valor: Decimal,
    pub metodo: PaymentMethod,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeResponse {
    pub id: String,
    pub status: PaymentStatus,
    #[serde(default)]
    pub mensagem: Option<String>,
}

/// Processador de pagamentos externo (maquininha/PIX).
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_charge(&self, request: &ChargeRequest) -> Result<ChargeResponse, AppError>;

    async fn charge_status(&self, charge_id: &str) -> Result<ChargeResponse, AppError>;

    async fn cancel_charge(&self, charge_id: &str) -> Result<(), AppError>;
}

pub struct HttpPaymentGateway {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl HttpPaymentGateway {
    pub fn new(base_url: String, token: String, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    async fn read_charge(&self, response: reqwest::Response) -> Result<ChargeResponse, AppError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::GatewayError(format!(
                "gateway de pagamento respondeu {}: {}",
                status, body
            )));
        }
        Ok(response.json::<ChargeResponse>().await?)
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_charge(&self, request: &ChargeRequest) -> Result<ChargeResponse, AppError> {
        tracing::info!("💳 Criando cobrança {} ({:?})", request.referencia, request.metodo);

        let response = self
            .client
            .post(format!("{}/charges", self.base_url))
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await?;

        self.read_charge(response).await
    }

    async fn charge_status(&self, charge_id: &str) -> Result<ChargeResponse, AppError> {
        let response = self
            .client
            .get(format!("{}/charges/{}", self.base_url, charge_id))
            .bearer_auth(&self.token)
            .send()
            .await?;

        self.read_charge(response).await
    }

    async fn cancel_charge(&self, charge_id: &str) -> Result<(), AppError> {
        let response = self
            .client
            .post(format!("{}/charges/{}/cancel", self.base_url, charge_id))
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::GatewayError(format!(
                "falha ao cancelar cobrança {}: {}",
                charge_id,
                response.status()
            )));
        }
        Ok(())
    }
}
