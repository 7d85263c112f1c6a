// src/config.rs

use std::{env, fmt::Display, str::FromStr, sync::Arc, time::Duration};

use anyhow::{anyhow, Context};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        CatalogRepository, CustomerRepository, DashboardRepository, FinanceRepository, NfeRepository,
        OrderRepository, PaymentRepository, SaleRepository,
    },
    services::{
        auth::AuthService,
        catalog_service::CatalogService,
        customer_service::CustomerService,
        dashboard_service::DashboardService,
        finance_service::FinanceService,
        fiscal_gateway::{FiscalGateway, HttpFiscalGateway},
        nfe_service::NfeService,
        order_service::OrderService,
        payment_gateway::{HttpPaymentGateway, PaymentGateway},
        payment_service::{PaymentService, PollSettings},
        sale_service::SaleService,
    },
};

/// Configuração lida do ambiente (e do `.env`, quando existir).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub database_max_connections: u32,
    pub payment_gateway_url: String,
    pub payment_gateway_token: String,
    pub nfe_api_url: String,
    pub nfe_api_token: String,
    pub nfe_serie: i32,
    pub payment_poll_interval: Duration,
    pub payment_poll_timeout: Duration,
    pub gateway_timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{} deve ser definida", key))
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            database_max_connections: parsed(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            payment_gateway_url: required("PAYMENT_GATEWAY_URL")?,
            payment_gateway_token: lookup("PAYMENT_GATEWAY_TOKEN").unwrap_or_default(),
            nfe_api_url: required("NFE_API_URL")?,
            nfe_api_token: lookup("NFE_API_TOKEN").unwrap_or_default(),
            nfe_serie: parsed(&lookup, "NFE_SERIE", 1)?,
            payment_poll_interval: Duration::from_secs(parsed(&lookup, "PAYMENT_POLL_INTERVAL_SECS", 2)?),
            payment_poll_timeout: Duration::from_secs(parsed(&lookup, "PAYMENT_POLL_TIMEOUT_SECS", 120)?),
            gateway_timeout: Duration::from_secs(parsed(&lookup, "GATEWAY_TIMEOUT_SECS", 15)?),
        })
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: self.payment_poll_interval,
            timeout: self.payment_poll_timeout,
        }
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e| anyhow!("{} inválida ({}): {}", key, raw, e)),
        None => Ok(default),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub customer_service: CustomerService,
    pub catalog_service: CatalogService,
    pub order_service: OrderService,
    pub sale_service: SaleService,
    pub finance_service: FinanceService,
    pub payment_service: PaymentService,
    pub nfe_service: NfeService,
    pub dashboard_service: DashboardService,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        sqlx::migrate!().run(&db_pool).await?;
        tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

        let payment_gateway: Arc<dyn PaymentGateway> = Arc::new(HttpPaymentGateway::new(
            config.payment_gateway_url.clone(),
            config.payment_gateway_token.clone(),
            config.gateway_timeout,
        )?);
        let fiscal_gateway: Arc<dyn FiscalGateway> = Arc::new(HttpFiscalGateway::new(
            config.nfe_api_url.clone(),
            config.nfe_api_token.clone(),
            config.gateway_timeout,
        )?);

        let state = Self::from_parts(db_pool, config, payment_gateway, fiscal_gateway);

        // Cobranças que estavam em consulta quando o processo parou
        let resumed = state.payment_service.resume_open_payments().await?;
        if resumed > 0 {
            tracing::info!("🔁 {} pagamento(s) em aberto retomado(s)", resumed);
        }

        Ok(state)
    }

    /// Monta o gráfico de dependências sobre um pool já criado.
    pub fn from_parts(
        db_pool: PgPool,
        config: &Config,
        payment_gateway: Arc<dyn PaymentGateway>,
        fiscal_gateway: Arc<dyn FiscalGateway>,
    ) -> Self {
        // --- Repositórios ---
        let customer_repo = CustomerRepository::new(db_pool.clone());
        let catalog_repo = CatalogRepository::new(db_pool.clone());
        let order_repo = OrderRepository::new(db_pool.clone());
        let sale_repo = SaleRepository::new(db_pool.clone());
        let payment_repo = PaymentRepository::new(db_pool.clone());
        let nfe_repo = NfeRepository::new(db_pool.clone());
        let finance_repo = FinanceRepository::new(db_pool.clone());
        let dashboard_repo = DashboardRepository::new(db_pool.clone());

        // --- Serviços ---
        let auth_service = AuthService::new(config.jwt_secret.clone());
        let customer_service = CustomerService::new(customer_repo.clone(), db_pool.clone());
        let catalog_service = CatalogService::new(catalog_repo.clone(), db_pool.clone());
        let finance_service = FinanceService::new(finance_repo.clone(), db_pool.clone());
        let dashboard_service = DashboardService::new(dashboard_repo);

        let order_service = OrderService::new(
            db_pool.clone(),
            order_repo.clone(),
            customer_repo.clone(),
            payment_repo.clone(),
            finance_repo,
            catalog_service.clone(),
        );
        let sale_service = SaleService::new(
            db_pool.clone(),
            sale_repo.clone(),
            customer_repo.clone(),
            payment_repo.clone(),
            catalog_service.clone(),
        );
        let nfe_service = NfeService::new(
            db_pool.clone(),
            nfe_repo,
            order_repo.clone(),
            sale_repo.clone(),
            customer_repo,
            catalog_repo,
            fiscal_gateway,
            config.nfe_serie,
        );
        let payment_service = PaymentService::new(
            db_pool.clone(),
            payment_repo,
            order_repo,
            sale_repo,
            finance_service.clone(),
            order_service.clone(),
            sale_service.clone(),
            nfe_service.clone(),
            payment_gateway,
            config.poll_settings(),
        );

        Self {
            auth_service,
            customer_service,
            catalog_service,
            order_service,
            sale_service,
            finance_service,
            payment_service,
            nfe_service,
            dashboard_service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("DATABASE_URL", "postgres://localhost/oficina"),
        ("JWT_SECRET", "segredo"),
        ("PAYMENT_GATEWAY_URL", "http://pagamentos.local"),
        ("NFE_API_URL", "http://nfe.local"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.nfe_serie, 1);
        assert_eq!(config.payment_poll_interval, Duration::from_secs(2));
        assert_eq!(config.payment_poll_timeout, Duration::from_secs(120));
        assert_eq!(config.gateway_timeout, Duration::from_secs(15));
        assert!(config.payment_gateway_token.is_empty());
    }

    #[test]
    fn test_missing_required_variable() {
        let err = Config::from_lookup(lookup_from(&REQUIRED[1..])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_invalid_number_is_reported() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PAYMENT_POLL_TIMEOUT_SECS", "dois minutos"));

        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(err.to_string().contains("PAYMENT_POLL_TIMEOUT_SECS"));
    }
}
