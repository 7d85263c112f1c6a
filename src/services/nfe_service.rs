// src/services/nfe_service.rs

//! Emissão de NF-e a partir de uma OS ou venda.
//!
//! A nota nasce como RASCUNHO com cópia das linhas escolhidas; a autorização,
//! o cancelamento e a consulta passam pela integração com a SEFAZ
//! (`FiscalGateway`) e gravam o retorno.

use std::{collections::HashMap, sync::Arc};

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        nfe_repo::NewNfe, CatalogRepository, CustomerRepository, NfeRepository, OrderRepository, SaleRepository,
    },
    models::{
        customer::Customer,
        nfe::{Nfe, NfeDetail, NfeItem, NfeStatus},
        payment::PaymentTarget,
        sale::SaleStatus,
    },
    services::{
        fiscal_gateway::{FiscalDocument, FiscalGateway, FiscalItem, FiscalRecipient, FiscalStatus},
        status_policy,
    },
};

const JUSTIFICATIVA_MIN: usize = 15;
const JUSTIFICATIVA_MAX: usize = 255;

/// Origem da nota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NfeSource {
    Order(Uuid),
    Sale(Uuid),
}

impl From<PaymentTarget> for NfeSource {
    fn from(target: PaymentTarget) -> Self {
        match target {
            PaymentTarget::Order(id) => NfeSource::Order(id),
            PaymentTarget::Sale(id) => NfeSource::Sale(id),
        }
    }
}

/// Linha da OS/venda candidata a entrar na nota.
#[derive(Debug, Clone)]
pub struct SourceLine {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub descricao: String,
    pub quantidade: Decimal,
    pub valor_unitario: Decimal,
    pub desconto: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone)]
pub struct ProductFiscal {
    pub codigo: String,
    pub ncm: Option<String>,
    pub unidade: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DraftItem {
    pub source_item_id: Uuid,
    pub codigo: Option<String>,
    pub descricao: String,
    pub ncm: Option<String>,
    pub unidade: String,
    pub quantidade: Decimal,
    pub valor_unitario: Decimal,
    pub desconto: Decimal,
    pub valor_total: Decimal,
    pub posicao: i32,
}

/// Seleciona as linhas (todas, quando `item_ids` é `None`) e monta os itens da
/// nota. Devolve os itens e o total.
pub fn build_draft(
    lines: &[SourceLine],
    item_ids: Option<&[Uuid]>,
    fiscal: &HashMap<Uuid, ProductFiscal>,
) -> Result<(Vec<DraftItem>, Decimal), AppError> {
    let selected: Vec<&SourceLine> = match item_ids {
        None => lines.iter().collect(),
        Some(ids) => {
            let unknown: Vec<String> = ids
                .iter()
                .filter(|id| !lines.iter().any(|l| l.id == **id))
                .map(Uuid::to_string)
                .collect();
            if !unknown.is_empty() {
                return Err(AppError::BadRequest(format!(
                    "Itens não pertencem ao documento de origem: {}",
                    unknown.join(", ")
                )));
            }
            lines.iter().filter(|l| ids.contains(&l.id)).collect()
        }
    };

    if selected.is_empty() {
        return Err(AppError::BadRequest("A nota precisa de ao menos um item.".into()));
    }

    let items: Vec<DraftItem> = selected
        .into_iter()
        .enumerate()
        .map(|(idx, line)| {
            let info = line.product_id.and_then(|id| fiscal.get(&id));
            DraftItem {
                source_item_id: line.id,
                codigo: info.map(|f| f.codigo.clone()),
                descricao: line.descricao.clone(),
                ncm: info.and_then(|f| f.ncm.clone()),
                unidade: info.map(|f| f.unidade.clone()).unwrap_or_else(|| "UN".to_string()),
                quantidade: line.quantidade,
                valor_unitario: line.valor_unitario,
                desconto: line.desconto,
                valor_total: line.subtotal,
                posicao: idx as i32,
            }
        })
        .collect();

    let total = items.iter().map(|i| i.valor_total).sum();
    Ok((items, total))
}

/// Regra da SEFAZ: justificativa entre 15 e 255 caracteres.
pub fn validate_justificativa(justificativa: &str) -> Result<String, AppError> {
    let trimmed = justificativa.trim();
    let len = trimmed.chars().count();
    if !(JUSTIFICATIVA_MIN..=JUSTIFICATIVA_MAX).contains(&len) {
        return Err(AppError::BadRequest(format!(
            "A justificativa deve ter entre {} e {} caracteres.",
            JUSTIFICATIVA_MIN, JUSTIFICATIVA_MAX
        )));
    }
    Ok(trimmed.to_string())
}

/// `None` enquanto a SEFAZ ainda processa.
pub fn map_fiscal_status(status: FiscalStatus) -> Option<NfeStatus> {
    match status {
        FiscalStatus::Autorizada => Some(NfeStatus::Autorizada),
        FiscalStatus::Rejeitada => Some(NfeStatus::Rejeitada),
        FiscalStatus::Cancelada => Some(NfeStatus::Cancelada),
        FiscalStatus::Processando => None,
    }
}

/// Motivo gravado após a autorização. Rejeição sempre tem um texto; nota
/// autorizada só guarda o que a SEFAZ devolveu agora.
pub fn result_motivo(status: NfeStatus, motivo: Option<&str>) -> Option<&str> {
    match status {
        NfeStatus::Rejeitada => Some(motivo.unwrap_or("Rejeitada pela SEFAZ")),
        NfeStatus::Autorizada => motivo.filter(|m| !m.trim().is_empty()),
        _ => motivo,
    }
}

fn recipient(customer: Customer) -> FiscalRecipient {
    FiscalRecipient {
        nome: customer.nome,
        documento: customer.documento,
        email: customer.email,
        logradouro: customer.logradouro,
        numero: customer.numero,
        bairro: customer.bairro,
        cidade: customer.cidade,
        uf: customer.uf,
        cep: customer.cep,
        inscricao_estadual: customer.inscricao_estadual,
    }
}

fn fiscal_item(item: &NfeItem) -> FiscalItem {
    FiscalItem {
        codigo: item.codigo.clone(),
        descricao: item.descricao.clone(),
        ncm: item.ncm.clone(),
        unidade: item.unidade.clone(),
        quantidade: item.quantidade,
        valor_unitario: item.valor_unitario,
        desconto: item.desconto,
        valor_total: item.valor_total,
    }
}

#[derive(Clone)]
pub struct NfeService {
    pool: PgPool,
    nfes: NfeRepository,
    orders: OrderRepository,
    sales: SaleRepository,
    customers: CustomerRepository,
    catalog: CatalogRepository,
    gateway: Arc<dyn FiscalGateway>,
    serie: i32,
}

impl NfeService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        nfes: NfeRepository,
        orders: OrderRepository,
        sales: SaleRepository,
        customers: CustomerRepository,
        catalog: CatalogRepository,
        gateway: Arc<dyn FiscalGateway>,
        serie: i32,
    ) -> Self {
        Self { pool, nfes, orders, sales, customers, catalog, gateway, serie }
    }

    // Linhas e cliente da origem, conferindo se ela aceita emissão
    async fn load_source(
        &self,
        conn: &mut PgConnection,
        source: NfeSource,
    ) -> Result<(Vec<SourceLine>, Option<Uuid>), AppError> {
        match source {
            NfeSource::Order(id) => {
                let order = self.orders.lock_order(&mut *conn, id).await?;
                if !status_policy::can_issue_invoice(order.status) {
                    return Err(AppError::Conflict(format!(
                        "A OS #{} não permite emissão de NF-e no status {:?}.",
                        order.numero, order.status
                    )));
                }
                let lines = self
                    .orders
                    .list_items(&mut *conn, id)
                    .await?
                    .into_iter()
                    .map(|i| SourceLine {
                        id: i.id,
                        product_id: i.product_id,
                        descricao: i.descricao,
                        quantidade: i.quantidade,
                        valor_unitario: i.valor_unitario,
                        desconto: i.desconto,
                        subtotal: i.subtotal,
                    })
                    .collect();
                Ok((lines, Some(order.customer_id)))
            }
            NfeSource::Sale(id) => {
                let sale = self.sales.lock_sale(&mut *conn, id).await?;
                if !matches!(sale.status, SaleStatus::Pagamento | SaleStatus::Finalizada) {
                    return Err(AppError::Conflict(format!(
                        "A venda #{} não permite emissão de NF-e no status {:?}.",
                        sale.numero, sale.status
                    )));
                }
                let lines = self
                    .sales
                    .list_items(&mut *conn, id)
                    .await?
                    .into_iter()
                    .map(|i| SourceLine {
                        id: i.id,
                        product_id: Some(i.product_id),
                        descricao: i.descricao,
                        quantidade: i.quantidade,
                        valor_unitario: i.valor_unitario,
                        desconto: i.desconto,
                        subtotal: i.subtotal,
                    })
                    .collect();
                Ok((lines, sale.customer_id))
            }
        }
    }

    pub async fn create_draft(&self, source: NfeSource, item_ids: Option<&[Uuid]>) -> Result<NfeDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        let (lines, customer_id) = self.load_source(&mut *tx, source).await?;

        let mut product_ids: Vec<Uuid> = lines.iter().filter_map(|l| l.product_id).collect();
        product_ids.sort();
        product_ids.dedup();
        let fiscal: HashMap<Uuid, ProductFiscal> = self
            .catalog
            .fiscal_data(&mut *tx, &product_ids)
            .await?
            .into_iter()
            .map(|(id, codigo, ncm, unidade)| (id, ProductFiscal { codigo, ncm, unidade }))
            .collect();

        let (items, valor_total) = build_draft(&lines, item_ids, &fiscal)?;

        let (order_id, sale_id) = match source {
            NfeSource::Order(id) => (Some(id), None),
            NfeSource::Sale(id) => (None, Some(id)),
        };
        let nfe = self
            .nfes
            .create(
                &mut *tx,
                &NewNfe { serie: self.serie, order_id, sale_id, customer_id, valor_total },
            )
            .await?;

        let mut saved = Vec::with_capacity(items.len());
        for item in &items {
            saved.push(self.nfes.insert_item(&mut *tx, nfe.id, item).await?);
        }
        tx.commit().await?;

        tracing::info!("🧾 Rascunho da NF-e {} criado ({} itens, total {})", nfe.numero, saved.len(), valor_total);
        Ok(NfeDetail { header: nfe, items: saved })
    }

    /// Envia a nota para autorização. A linha fica travada durante a chamada
    /// para impedir duas emissões simultâneas do mesmo rascunho.
    pub async fn authorize(&self, id: Uuid) -> Result<NfeDetail, AppError> {
        let mut tx = self.pool.begin().await?;
        let nfe = self.nfes.lock(&mut *tx, id).await?;

        if !nfe.status.can_authorize() {
            return Err(AppError::Conflict(format!(
                "A NF-e {} não pode ser autorizada no status {:?}.",
                nfe.numero, nfe.status
            )));
        }

        let items = self.nfes.list_items(&mut *tx, id).await?;
        let destinatario = match nfe.customer_id {
            Some(customer_id) => self.customers.find_customer(&mut *tx, customer_id).await?.map(recipient),
            None => None,
        };

        let document = FiscalDocument {
            referencia: nfe.id,
            numero: nfe.numero,
            serie: nfe.serie,
            destinatario,
            itens: items.iter().map(fiscal_item).collect(),
            valor_total: nfe.valor_total,
        };

        let response = self.gateway.authorize(&document).await?;

        let status = map_fiscal_status(response.status).unwrap_or(nfe.status);
        let motivo = result_motivo(status, response.motivo.as_deref());
        let updated = self
            .nfes
            .update_result(
                &mut *tx,
                id,
                status,
                response.chave.as_deref(),
                response.protocolo.as_deref(),
                motivo,
            )
            .await?;
        tx.commit().await?;

        match updated.status {
            NfeStatus::Autorizada => tracing::info!("✅ NF-e {} autorizada", updated.numero),
            NfeStatus::Rejeitada => tracing::warn!("❌ NF-e {} rejeitada: {:?}", updated.numero, updated.motivo),
            other => tracing::info!("NF-e {} em {:?}", updated.numero, other),
        }

        Ok(NfeDetail { header: updated, items })
    }

    pub async fn cancel(&self, id: Uuid, justificativa: &str) -> Result<NfeDetail, AppError> {
        let justificativa = validate_justificativa(justificativa)?;

        let mut tx = self.pool.begin().await?;
        let nfe = self.nfes.lock(&mut *tx, id).await?;

        if !nfe.status.can_cancel() {
            return Err(AppError::Conflict(format!(
                "Só notas autorizadas podem ser canceladas (NF-e {} está {:?}).",
                nfe.numero, nfe.status
            )));
        }
        let chave = nfe
            .chave
            .as_deref()
            .ok_or_else(|| AppError::Conflict(format!("A NF-e {} não possui chave de acesso.", nfe.numero)))?;

        let response = self.gateway.cancel(chave, &justificativa).await?;
        if response.status != FiscalStatus::Cancelada {
            return Err(AppError::Conflict(format!(
                "A SEFAZ não cancelou a NF-e {}: {}",
                nfe.numero,
                response.motivo.as_deref().unwrap_or("sem motivo informado")
            )));
        }

        let updated = self
            .nfes
            .update_result(&mut *tx, id, NfeStatus::Cancelada, None, response.protocolo.as_deref(), Some(&justificativa))
            .await?;
        let items = self.nfes.list_items(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::info!("🚫 NF-e {} cancelada", updated.numero);
        Ok(NfeDetail { header: updated, items })
    }

    /// Consulta a SEFAZ e sincroniza o status gravado.
    pub async fn query_status(&self, id: Uuid) -> Result<Nfe, AppError> {
        let nfe = self.get(id).await?;
        let Some(chave) = nfe.chave.clone() else {
            return Ok(nfe);
        };

        let response = self.gateway.query(&chave).await?;
        match map_fiscal_status(response.status) {
            Some(status) if status != nfe.status => {
                tracing::info!("🔄 NF-e {}: {:?} -> {:?} (consulta)", nfe.numero, nfe.status, status);
                self.nfes
                    .update_result(
                        &self.pool,
                        id,
                        status,
                        None,
                        response.protocolo.as_deref(),
                        response.motivo.as_deref(),
                    )
                    .await
            }
            _ => Ok(nfe),
        }
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let nfe = self.get(id).await?;
        if !nfe.status.can_delete() {
            return Err(AppError::Conflict(format!(
                "Só rascunhos podem ser excluídos (NF-e {} está {:?}).",
                nfe.numero, nfe.status
            )));
        }
        // A condição de status também vai no DELETE, para o caso de corrida
        if !self.nfes.delete(id).await? {
            return Err(AppError::Conflict(format!("A NF-e {} mudou de status.", nfe.numero)));
        }
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Nfe, AppError> {
        self.nfes
            .find(id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("NF-e {}", id)))
    }

    pub async fn get_detail(&self, id: Uuid) -> Result<NfeDetail, AppError> {
        let header = self.get(id).await?;
        let items = self.nfes.list_items(&self.pool, id).await?;
        Ok(NfeDetail { header, items })
    }

    pub async fn list(
        &self,
        status: Option<NfeStatus>,
        order_id: Option<Uuid>,
        sale_id: Option<Uuid>,
    ) -> Result<Vec<Nfe>, AppError> {
        self.nfes.list(status, order_id, sale_id).await
    }

    /// Rascunho com todas as linhas seguido de autorização. Usado após a
    /// quitação de um pagamento que pediu nota.
    pub async fn issue_for(&self, source: NfeSource) -> Result<NfeDetail, AppError> {
        let draft = self.create_draft(source, None).await?;
        self.authorize(draft.header.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(product_id: Option<Uuid>, subtotal: Decimal) -> SourceLine {
        SourceLine {
            id: Uuid::new_v4(),
            product_id,
            descricao: "Filtro de óleo".into(),
            quantidade: dec!(1),
            valor_unitario: subtotal,
            desconto: Decimal::ZERO,
            subtotal,
        }
    }

    #[test]
    fn test_draft_uses_all_lines_by_default() {
        let product_id = Uuid::new_v4();
        let lines = vec![line(Some(product_id), dec!(45.90)), line(None, dec!(120.00))];
        let mut fiscal = HashMap::new();
        fiscal.insert(
            product_id,
            ProductFiscal { codigo: "FO-01".into(), ncm: Some("84212300".into()), unidade: "PC".into() },
        );

        let (items, total) = build_draft(&lines, None, &fiscal).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(total, dec!(165.90));
        assert_eq!(items[0].codigo.as_deref(), Some("FO-01"));
        assert_eq!(items[0].unidade, "PC");
        // Serviço não tem cadastro fiscal de produto
        assert_eq!(items[1].codigo, None);
        assert_eq!(items[1].unidade, "UN");
        assert_eq!(items[1].posicao, 1);
    }

    #[test]
    fn test_draft_with_selected_items() {
        let lines = vec![line(None, dec!(10)), line(None, dec!(20)), line(None, dec!(30))];
        let ids = [lines[2].id];

        let (items, total) = build_draft(&lines, Some(&ids), &HashMap::new()).unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source_item_id, lines[2].id);
        assert_eq!(items[0].posicao, 0);
        assert_eq!(total, dec!(30));
    }

    #[test]
    fn test_draft_rejects_unknown_or_empty_selection() {
        let lines = vec![line(None, dec!(10))];

        let unknown = [Uuid::new_v4()];
        let err = build_draft(&lines, Some(&unknown), &HashMap::new()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = build_draft(&lines, Some(&[]), &HashMap::new()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = build_draft(&[], None, &HashMap::new()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_justificativa_length() {
        assert!(validate_justificativa("curta demais").is_err());
        assert!(validate_justificativa(&"x".repeat(256)).is_err());
        // Espaços nas pontas não contam
        assert!(validate_justificativa("   abc   ").is_err());

        let ok = validate_justificativa("  Erro no valor dos serviços  ").unwrap();
        assert_eq!(ok, "Erro no valor dos serviços");

        // Conta caracteres, não bytes
        assert!(validate_justificativa(&"ç".repeat(255)).is_ok());
    }

    #[test]
    fn test_result_motivo() {
        assert_eq!(result_motivo(NfeStatus::Rejeitada, None), Some("Rejeitada pela SEFAZ"));
        assert_eq!(
            result_motivo(NfeStatus::Rejeitada, Some("539 - Duplicidade")),
            Some("539 - Duplicidade")
        );
        // Reautorização de uma nota rejeitada não herda o motivo antigo
        assert_eq!(result_motivo(NfeStatus::Autorizada, None), None);
        assert_eq!(result_motivo(NfeStatus::Autorizada, Some("  ")), None);
        assert_eq!(
            result_motivo(NfeStatus::Autorizada, Some("Autorizado o uso da NF-e")),
            Some("Autorizado o uso da NF-e")
        );
    }

    #[test]
    fn test_fiscal_status_mapping() {
        assert_eq!(map_fiscal_status(FiscalStatus::Autorizada), Some(NfeStatus::Autorizada));
        assert_eq!(map_fiscal_status(FiscalStatus::Rejeitada), Some(NfeStatus::Rejeitada));
        assert_eq!(map_fiscal_status(FiscalStatus::Cancelada), Some(NfeStatus::Cancelada));
        assert_eq!(map_fiscal_status(FiscalStatus::Processando), None);
    }
}
