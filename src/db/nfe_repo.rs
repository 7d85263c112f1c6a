// src/db/nfe_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::nfe::{Nfe, NfeItem, NfeStatus},
    services::nfe_service::DraftItem,
};

#[derive(Debug, Clone)]
pub struct NewNfe {
    pub serie: i32,
    pub order_id: Option<Uuid>,
    pub sale_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub valor_total: Decimal,
}

#[derive(Clone)]
pub struct NfeRepository {
    pool: PgPool,
}

impl NfeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create<'e, E>(&self, executor: E, data: &NewNfe) -> Result<Nfe, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let nfe = sqlx::query_as::<_, Nfe>(
            r#"
            INSERT INTO nfes (serie, order_id, sale_id, customer_id, valor_total)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(data.serie)
        .bind(data.order_id)
        .bind(data.sale_id)
        .bind(data.customer_id)
        .bind(data.valor_total)
        .fetch_one(executor)
        .await?;
        Ok(nfe)
    }

    pub async fn insert_item<'e, E>(&self, executor: E, nfe_id: Uuid, item: &DraftItem) -> Result<NfeItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, NfeItem>(
            r#"
            INSERT INTO nfe_items (
                nfe_id, source_item_id, codigo, descricao, ncm, unidade,
                quantidade, valor_unitario, desconto, valor_total, posicao
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(nfe_id)
        .bind(item.source_item_id)
        .bind(&item.codigo)
        .bind(&item.descricao)
        .bind(&item.ncm)
        .bind(&item.unidade)
        .bind(item.quantidade)
        .bind(item.valor_unitario)
        .bind(item.desconto)
        .bind(item.valor_total)
        .bind(item.posicao)
        .fetch_one(executor)
        .await?;
        Ok(item)
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Nfe>, AppError> {
        let nfe = sqlx::query_as::<_, Nfe>("SELECT * FROM nfes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(nfe)
    }

    pub async fn lock<'e, E>(&self, executor: E, id: Uuid) -> Result<Nfe, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Nfe>("SELECT * FROM nfes WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("NF-e {}", id)))
    }

    pub async fn list(
        &self,
        status: Option<NfeStatus>,
        order_id: Option<Uuid>,
        sale_id: Option<Uuid>,
    ) -> Result<Vec<Nfe>, AppError> {
        let nfes = sqlx::query_as::<_, Nfe>(
            r#"
            SELECT * FROM nfes
            WHERE ($1::nfe_status IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR order_id = $2)
              AND ($3::uuid IS NULL OR sale_id = $3)
            ORDER BY numero DESC
            "#,
        )
        .bind(status)
        .bind(order_id)
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(nfes)
    }

    pub async fn list_items<'e, E>(&self, executor: E, nfe_id: Uuid) -> Result<Vec<NfeItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, NfeItem>(
            "SELECT * FROM nfe_items WHERE nfe_id = $1 ORDER BY posicao ASC",
        )
        .bind(nfe_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    /// Grava o retorno da SEFAZ. Campos `None` preservam o valor atual, exceto
    /// `motivo` na autorização: o motivo de uma rejeição anterior é descartado.
    pub async fn update_result<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: NfeStatus,
        chave: Option<&str>,
        protocolo: Option<&str>,
        motivo: Option<&str>,
    ) -> Result<Nfe, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let nfe = sqlx::query_as::<_, Nfe>(
            r#"
            UPDATE nfes SET
                status = $2,
                chave = COALESCE($3, chave),
                protocolo = COALESCE($4, protocolo),
                motivo = CASE
                    WHEN $2 = 'AUTORIZADA'::nfe_status THEN $5
                    ELSE COALESCE($5, motivo) END,
                autorizada_em = CASE
                    WHEN $2 = 'AUTORIZADA'::nfe_status AND autorizada_em IS NULL THEN NOW()
                    ELSE autorizada_em END,
                cancelada_em = CASE
                    WHEN $2 = 'CANCELADA'::nfe_status AND cancelada_em IS NULL THEN NOW()
                    ELSE cancelada_em END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(chave)
        .bind(protocolo)
        .bind(motivo)
        .fetch_one(executor)
        .await?;
        Ok(nfe)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM nfes WHERE id = $1 AND status = 'RASCUNHO'")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
