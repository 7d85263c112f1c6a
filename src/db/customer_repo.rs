// src/db/customer_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::customer::{Customer, CustomerStatus, TipoPessoa, Vehicle},
};

/// Campos editáveis do cliente (já validados e normalizados pelo service).
#[derive(Debug, Clone)]
pub struct CustomerData {
    pub tipo_pessoa: TipoPessoa,
    pub nome: String,
    pub documento: Option<String>,
    pub inscricao_estadual: Option<String>,
    pub email: Option<String>,
    pub telefone: Option<String>,
    pub logradouro: Option<String>,
    pub numero: Option<String>,
    pub bairro: Option<String>,
    pub cidade: Option<String>,
    pub uf: Option<String>,
    pub cep: Option<String>,
    pub status: CustomerStatus,
}

#[derive(Debug, Clone)]
pub struct VehicleData {
    pub placa: String,
    pub marca: Option<String>,
    pub modelo: String,
    pub ano: Option<i32>,
    pub cor: Option<String>,
    pub quilometragem: Option<i32>,
}

#[derive(Clone)]
pub struct CustomerRepository {
    pool: PgPool,
}

// Converte violação de chave única em conflito amigável
fn map_unique(e: sqlx::Error, message: &str) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return AppError::Conflict(message.to_string());
        }
    }
    AppError::DatabaseError(e)
}

impl CustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  CLIENTES
    // =========================================================================

    pub async fn create_customer(&self, data: &CustomerData) -> Result<Customer, AppError> {
        sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (
                tipo_pessoa, nome, documento, inscricao_estadual, email, telefone,
                logradouro, numero, bairro, cidade, uf, cep, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(data.tipo_pessoa)
        .bind(&data.nome)
        .bind(&data.documento)
        .bind(&data.inscricao_estadual)
        .bind(&data.email)
        .bind(&data.telefone)
        .bind(&data.logradouro)
        .bind(&data.numero)
        .bind(&data.bairro)
        .bind(&data.cidade)
        .bind(&data.uf)
        .bind(&data.cep)
        .bind(data.status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique(e, "Já existe um cliente com este CPF/CNPJ."))
    }

    pub async fn update_customer(&self, id: Uuid, data: &CustomerData) -> Result<Customer, AppError> {
        sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers SET
                tipo_pessoa = $2, nome = $3, documento = $4, inscricao_estadual = $5,
                email = $6, telefone = $7, logradouro = $8, numero = $9, bairro = $10,
                cidade = $11, uf = $12, cep = $13, status = $14, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.tipo_pessoa)
        .bind(&data.nome)
        .bind(&data.documento)
        .bind(&data.inscricao_estadual)
        .bind(&data.email)
        .bind(&data.telefone)
        .bind(&data.logradouro)
        .bind(&data.numero)
        .bind(&data.bairro)
        .bind(&data.cidade)
        .bind(&data.uf)
        .bind(&data.cep)
        .bind(data.status)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique(e, "Já existe um cliente com este CPF/CNPJ."))?
        .ok_or_else(|| AppError::ResourceNotFound(format!("Cliente {}", id)))
    }

    pub async fn find_customer<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(customer)
    }

    /// Busca por nome ou documento (ILIKE) e filtra por status.
    pub async fn list_customers(
        &self,
        search: Option<&str>,
        status: Option<CustomerStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Customer>, AppError> {
        let pattern = search.map(|s| format!("%{}%", s.trim()));

        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT * FROM customers
            WHERE ($1::text IS NULL OR nome ILIKE $1 OR documento ILIKE $1)
              AND ($2::customer_status IS NULL OR status = $2)
            ORDER BY nome ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(pattern)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    pub async fn count_orders(&self, customer_id: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE customer_id = $1")
            .bind(customer_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn delete_customer(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  VEÍCULOS
    // =========================================================================

    pub async fn create_vehicle(&self, customer_id: Uuid, data: &VehicleData) -> Result<Vehicle, AppError> {
        sqlx::query_as::<_, Vehicle>(
            r#"
            INSERT INTO vehicles (customer_id, placa, marca, modelo, ano, cor, quilometragem)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(customer_id)
        .bind(&data.placa)
        .bind(&data.marca)
        .bind(&data.modelo)
        .bind(data.ano)
        .bind(&data.cor)
        .bind(data.quilometragem)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique(e, "Já existe um veículo com esta placa."))
    }

    pub async fn update_vehicle(&self, id: Uuid, data: &VehicleData) -> Result<Vehicle, AppError> {
        sqlx::query_as::<_, Vehicle>(
            r#"
            UPDATE vehicles SET
                placa = $2, marca = $3, modelo = $4, ano = $5, cor = $6,
                quilometragem = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&data.placa)
        .bind(&data.marca)
        .bind(&data.modelo)
        .bind(data.ano)
        .bind(&data.cor)
        .bind(data.quilometragem)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique(e, "Já existe um veículo com esta placa."))?
        .ok_or_else(|| AppError::ResourceNotFound(format!("Veículo {}", id)))
    }

    pub async fn find_vehicle<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Vehicle>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(vehicle)
    }

    pub async fn list_vehicles(&self, customer_id: Uuid) -> Result<Vec<Vehicle>, AppError> {
        let vehicles = sqlx::query_as::<_, Vehicle>(
            "SELECT * FROM vehicles WHERE customer_id = $1 ORDER BY created_at DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(vehicles)
    }

    pub async fn delete_vehicle(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM vehicles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match e.as_database_error() {
                Some(db_err) if db_err.is_foreign_key_violation() => {
                    AppError::Conflict("O veículo possui ordens de serviço vinculadas.".into())
                }
                _ => AppError::DatabaseError(e),
            })?;
        Ok(result.rows_affected() > 0)
    }
}
