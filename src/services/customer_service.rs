// src/services/customer_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        documento::{normalize_placa, only_digits},
        error::AppError,
    },
    db::{
        customer_repo::{CustomerData, VehicleData},
        CustomerRepository,
    },
    models::customer::{Customer, CustomerStatus, TipoPessoa, Vehicle},
};

#[derive(Clone)]
pub struct CustomerService {
    repo: CustomerRepository,
    pool: PgPool,
}

/// O tamanho do documento precisa bater com o tipo de pessoa.
pub fn check_documento_kind(tipo: TipoPessoa, documento: &str) -> Result<(), AppError> {
    let digits = only_digits(documento);
    let expected = match tipo {
        TipoPessoa::Fisica => 11,
        TipoPessoa::Juridica => 14,
    };
    if digits.len() != expected {
        let msg = match tipo {
            TipoPessoa::Fisica => "Pessoa física deve informar um CPF.",
            TipoPessoa::Juridica => "Pessoa jurídica deve informar um CNPJ.",
        };
        return Err(AppError::BadRequest(msg.into()));
    }
    Ok(())
}

impl CustomerService {
    pub fn new(repo: CustomerRepository, pool: PgPool) -> Self {
        Self { repo, pool }
    }

    // Documento e CEP são gravados só com dígitos
    fn normalize(mut data: CustomerData) -> Result<CustomerData, AppError> {
        if let Some(doc) = data.documento.as_deref() {
            check_documento_kind(data.tipo_pessoa, doc)?;
            data.documento = Some(only_digits(doc));
        }
        data.cep = data.cep.as_deref().map(only_digits).filter(|c| !c.is_empty());
        data.uf = data.uf.map(|uf| uf.trim().to_uppercase());
        data.nome = data.nome.trim().to_string();
        Ok(data)
    }

    pub async fn create_customer(&self, data: CustomerData) -> Result<Customer, AppError> {
        let data = Self::normalize(data)?;
        let customer = self.repo.create_customer(&data).await?;
        tracing::info!("👤 Cliente {} cadastrado", customer.id);
        Ok(customer)
    }

    pub async fn update_customer(&self, id: Uuid, data: CustomerData) -> Result<Customer, AppError> {
        let data = Self::normalize(data)?;
        self.repo.update_customer(id, &data).await
    }

    pub async fn get_customer(&self, id: Uuid) -> Result<Customer, AppError> {
        self.repo
            .find_customer(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Cliente {}", id)))
    }

    pub async fn list_customers(
        &self,
        search: Option<&str>,
        status: Option<CustomerStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Customer>, AppError> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        self.repo.list_customers(search, status, limit, offset).await
    }

    /// Clientes com ordens de serviço não podem ser excluídos (inative-os).
    pub async fn delete_customer(&self, id: Uuid) -> Result<(), AppError> {
        if self.repo.count_orders(id).await? > 0 {
            return Err(AppError::Conflict(
                "O cliente possui ordens de serviço. Altere o status para INATIVO.".into(),
            ));
        }
        if !self.repo.delete_customer(id).await? {
            return Err(AppError::ResourceNotFound(format!("Cliente {}", id)));
        }
        Ok(())
    }

    // --- VEÍCULOS ---

    pub async fn create_vehicle(&self, customer_id: Uuid, mut data: VehicleData) -> Result<Vehicle, AppError> {
        // Garante o 404 antes de esbarrar na FK
        self.get_customer(customer_id).await?;
        data.placa = normalize_placa(&data.placa);
        self.repo.create_vehicle(customer_id, &data).await
    }

    pub async fn update_vehicle(&self, id: Uuid, mut data: VehicleData) -> Result<Vehicle, AppError> {
        data.placa = normalize_placa(&data.placa);
        self.repo.update_vehicle(id, &data).await
    }

    pub async fn list_vehicles(&self, customer_id: Uuid) -> Result<Vec<Vehicle>, AppError> {
        self.repo.list_vehicles(customer_id).await
    }

    pub async fn delete_vehicle(&self, id: Uuid) -> Result<(), AppError> {
        if !self.repo.delete_vehicle(id).await? {
            return Err(AppError::ResourceNotFound(format!("Veículo {}", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documento_must_match_tipo_pessoa() {
        assert!(check_documento_kind(TipoPessoa::Fisica, "529.982.247-25").is_ok());
        assert!(check_documento_kind(TipoPessoa::Juridica, "11.222.333/0001-81").is_ok());

        let err = check_documento_kind(TipoPessoa::Fisica, "11.222.333/0001-81").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(check_documento_kind(TipoPessoa::Juridica, "529.982.247-25").is_err());
    }
}
