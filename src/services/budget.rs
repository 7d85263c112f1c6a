// src/services/budget.rs

//! Composição do orçamento: transforma as linhas enviadas pela tela em itens
//! com subtotal, calcula os totais e confere o estoque disponível.
//!
//! Nada aqui toca o banco. O `OrderService` carrega o catálogo (com
//! `FOR UPDATE`), chama `compose` e só persiste se não houver erro.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::service_order::LineKind,
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BudgetLineInput {
    pub tipo: LineKind,
    pub item_id: Uuid,
    #[schema(example = "2")]
    pub quantidade: Decimal,
    /// Quando ausente usa o preço do catálogo.
    #[schema(example = "80.00")]
    pub valor_unitario: Option<Decimal>,
    #[serde(default)]
    #[schema(example = "0.00")]
    pub desconto: Decimal,
}

/// Dados do catálogo necessários para compor uma linha.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub id: Uuid,
    pub tipo: LineKind,
    pub nome: String,
    pub preco: Decimal,
    // Só produtos têm estoque
    pub estoque: Option<Decimal>,
    pub ativo: bool,
}

#[derive(Debug, Default)]
pub struct Catalog {
    entries: HashMap<(LineKind, Uuid), CatalogEntry>,
}

impl Catalog {
    pub fn new(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| ((e.tipo, e.id), e)).collect(),
        }
    }

    pub fn get(&self, tipo: LineKind, id: Uuid) -> Option<&CatalogEntry> {
        self.entries.get(&(tipo, id))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComposedLine {
    pub tipo: LineKind,
    pub item_id: Uuid,
    pub descricao: String,
    pub quantidade: Decimal,
    pub valor_unitario: Decimal,
    pub desconto: Decimal,
    pub subtotal: Decimal,
    pub posicao: i32,
}

impl ComposedLine {
    pub fn product_id(&self) -> Option<Uuid> {
        (self.tipo == LineKind::Produto).then_some(self.item_id)
    }

    pub fn service_id(&self) -> Option<Uuid> {
        (self.tipo == LineKind::Servico).then_some(self.item_id)
    }

    fn bruto(&self) -> Decimal {
        self.subtotal + self.desconto
    }
}

/// Totais brutos por tipo; `total` já desconta `total_descontos`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedBudget {
    pub lines: Vec<ComposedLine>,
    pub total_produtos: Decimal,
    pub total_servicos: Decimal,
    pub total_descontos: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineError {
    pub linha: usize,
    pub campo: String,
    pub mensagem: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockShortfall {
    pub product_id: Uuid,
    pub produto: String,
    pub disponivel: Decimal,
    pub solicitado: Decimal,
    /// Índices das linhas do orçamento que pedem este produto.
    pub linhas: Vec<usize>,
}

fn line_error(linha: usize, campo: &str, mensagem: &str) -> LineError {
    LineError {
        linha,
        campo: campo.to_string(),
        mensagem: mensagem.to_string(),
    }
}

/// Monta os itens e totais. Erros de linha são acumulados e devolvidos juntos;
/// o estoque só é conferido quando todas as linhas são válidas.
pub fn compose(lines: &[BudgetLineInput], catalog: &Catalog) -> Result<ComposedBudget, AppError> {
    let mut composed = Vec::with_capacity(lines.len());
    let mut errors = Vec::new();

    for (idx, input) in lines.iter().enumerate() {
        let entry = catalog.get(input.tipo, input.item_id).ok_or_else(|| {
            let what = match input.tipo {
                LineKind::Produto => "Produto",
                LineKind::Servico => "Serviço",
            };
            AppError::ResourceNotFound(format!("{} {}", what, input.item_id))
        })?;

        if !entry.ativo {
            errors.push(line_error(idx, "itemId", "Item inativo no catálogo."));
            continue;
        }
        if input.quantidade <= Decimal::ZERO {
            errors.push(line_error(idx, "quantidade", "A quantidade deve ser maior que zero."));
            continue;
        }

        let valor_unitario = input.valor_unitario.unwrap_or(entry.preco);
        if valor_unitario.is_sign_negative() {
            errors.push(line_error(idx, "valorUnitario", "O valor não pode ser negativo."));
            continue;
        }

        let bruto = (input.quantidade * valor_unitario).round_dp(2);
        if input.desconto.is_sign_negative() {
            errors.push(line_error(idx, "desconto", "O desconto não pode ser negativo."));
            continue;
        }
        if input.desconto > bruto {
            errors.push(line_error(idx, "desconto", "O desconto não pode exceder o valor da linha."));
            continue;
        }

        composed.push(ComposedLine {
            tipo: input.tipo,
            item_id: input.item_id,
            descricao: entry.nome.clone(),
            quantidade: input.quantidade,
            valor_unitario,
            desconto: input.desconto,
            subtotal: bruto - input.desconto,
            posicao: idx as i32,
        });
    }

    if !errors.is_empty() {
        return Err(AppError::InvalidLines(errors));
    }

    let shortfalls = check_stock(&composed, catalog);
    if !shortfalls.is_empty() {
        return Err(AppError::InsufficientStock(shortfalls));
    }

    Ok(totals(composed))
}

/// Soma a quantidade pedida por produto (várias linhas podem pedir o mesmo) e
/// compara com o estoque do catálogo.
pub fn check_stock(lines: &[ComposedLine], catalog: &Catalog) -> Vec<StockShortfall> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut requested: HashMap<Uuid, (Decimal, Vec<usize>)> = HashMap::new();

    for (idx, line) in lines.iter().enumerate() {
        let Some(product_id) = line.product_id() else { continue };
        let entry = requested.entry(product_id).or_insert_with(|| {
            order.push(product_id);
            (Decimal::ZERO, Vec::new())
        });
        entry.0 += line.quantidade;
        entry.1.push(idx);
    }

    order
        .into_iter()
        .filter_map(|product_id| {
            let (solicitado, linhas) = requested.remove(&product_id)?;
            let entry = catalog.get(LineKind::Produto, product_id)?;
            let disponivel = entry.estoque.unwrap_or(Decimal::ZERO);
            (solicitado > disponivel).then(|| StockShortfall {
                product_id,
                produto: entry.nome.clone(),
                disponivel,
                solicitado,
                linhas,
            })
        })
        .collect()
}

fn totals(lines: Vec<ComposedLine>) -> ComposedBudget {
    let mut total_produtos = Decimal::ZERO;
    let mut total_servicos = Decimal::ZERO;
    let mut total_descontos = Decimal::ZERO;

    for line in &lines {
        match line.tipo {
            LineKind::Produto => total_produtos += line.bruto(),
            LineKind::Servico => total_servicos += line.bruto(),
        }
        total_descontos += line.desconto;
    }

    ComposedBudget {
        lines,
        total_produtos,
        total_servicos,
        total_descontos,
        total: total_produtos + total_servicos - total_descontos,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product(nome: &str, preco: Decimal, estoque: Decimal) -> CatalogEntry {
        CatalogEntry {
            id: Uuid::new_v4(),
            tipo: LineKind::Produto,
            nome: nome.to_string(),
            preco,
            estoque: Some(estoque),
            ativo: true,
        }
    }

    fn service(nome: &str, preco: Decimal) -> CatalogEntry {
        CatalogEntry {
            id: Uuid::new_v4(),
            tipo: LineKind::Servico,
            nome: nome.to_string(),
            preco,
            estoque: None,
            ativo: true,
        }
    }

    fn line(entry: &CatalogEntry, quantidade: Decimal) -> BudgetLineInput {
        BudgetLineInput {
            tipo: entry.tipo,
            item_id: entry.id,
            quantidade,
            valor_unitario: None,
            desconto: Decimal::ZERO,
        }
    }

    #[test]
    fn test_compose_totals() {
        let filtro = product("Filtro de óleo", dec!(45.90), dec!(10));
        let troca = service("Troca de óleo", dec!(60.00));
        let catalog = Catalog::new([filtro.clone(), troca.clone()]);

        let mut l1 = line(&filtro, dec!(2));
        l1.desconto = dec!(1.80);
        let l2 = line(&troca, dec!(1));

        let budget = compose(&[l1, l2], &catalog).unwrap();

        assert_eq!(budget.lines.len(), 2);
        assert_eq!(budget.lines[0].subtotal, dec!(90.00));
        assert_eq!(budget.lines[0].descricao, "Filtro de óleo");
        assert_eq!(budget.lines[1].posicao, 1);
        assert_eq!(budget.total_produtos, dec!(91.80));
        assert_eq!(budget.total_servicos, dec!(60.00));
        assert_eq!(budget.total_descontos, dec!(1.80));
        assert_eq!(budget.total, dec!(150.00));
    }

    #[test]
    fn test_price_override() {
        let pastilha = product("Pastilha", dec!(80), dec!(4));
        let catalog = Catalog::new([pastilha.clone()]);
        let mut l = line(&pastilha, dec!(1));
        l.valor_unitario = Some(dec!(75.50));

        let budget = compose(&[l], &catalog).unwrap();
        assert_eq!(budget.total, dec!(75.50));
    }

    #[test]
    fn test_insufficient_stock_reports_available_and_requested() {
        let pneu = product("Pneu aro 14", dec!(320), dec!(2));
        let catalog = Catalog::new([pneu.clone()]);

        let err = compose(&[line(&pneu, dec!(5))], &catalog).unwrap_err();
        match err {
            AppError::InsufficientStock(shortfalls) => {
                assert_eq!(shortfalls.len(), 1);
                assert_eq!(shortfalls[0].product_id, pneu.id);
                assert_eq!(shortfalls[0].disponivel, dec!(2));
                assert_eq!(shortfalls[0].solicitado, dec!(5));
                assert_eq!(shortfalls[0].linhas, vec![0]);
            }
            other => panic!("erro inesperado: {:?}", other),
        }
    }

    #[test]
    fn test_stock_is_aggregated_across_rows() {
        let vela = product("Vela de ignição", dec!(25), dec!(5));
        let troca = service("Revisão", dec!(100));
        let catalog = Catalog::new([vela.clone(), troca.clone()]);

        let lines = [line(&vela, dec!(3)), line(&troca, dec!(1)), line(&vela, dec!(3))];
        let err = compose(&lines, &catalog).unwrap_err();

        let AppError::InsufficientStock(shortfalls) = err else {
            panic!("esperava estoque insuficiente");
        };
        assert_eq!(shortfalls[0].solicitado, dec!(6));
        assert_eq!(shortfalls[0].linhas, vec![0, 2]);
    }

    #[test]
    fn test_exact_stock_is_enough() {
        let oleo = product("Óleo 5W30", dec!(39.9), dec!(4));
        let catalog = Catalog::new([oleo.clone()]);
        assert!(compose(&[line(&oleo, dec!(4))], &catalog).is_ok());
    }

    #[test]
    fn test_services_never_short_on_stock() {
        let alinhamento = service("Alinhamento", dec!(90));
        let catalog = Catalog::new([alinhamento.clone()]);
        assert!(compose(&[line(&alinhamento, dec!(50))], &catalog).is_ok());
    }

    #[test]
    fn test_line_errors_are_collected() {
        let filtro = product("Filtro", dec!(10), dec!(100));
        let catalog = Catalog::new([filtro.clone()]);

        let zero = line(&filtro, dec!(0));
        let mut desconto = line(&filtro, dec!(1));
        desconto.desconto = dec!(11);

        let err = compose(&[zero, desconto], &catalog).unwrap_err();
        let AppError::InvalidLines(errors) = err else {
            panic!("esperava erros de linha");
        };
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].linha, 0);
        assert_eq!(errors[0].campo, "quantidade");
        assert_eq!(errors[1].linha, 1);
        assert_eq!(errors[1].campo, "desconto");
    }

    #[test]
    fn test_unknown_item_is_not_found() {
        let catalog = Catalog::default();
        let input = BudgetLineInput {
            tipo: LineKind::Produto,
            item_id: Uuid::new_v4(),
            quantidade: dec!(1),
            valor_unitario: None,
            desconto: Decimal::ZERO,
        };
        assert!(matches!(compose(&[input], &catalog), Err(AppError::ResourceNotFound(_))));
    }

    #[test]
    fn test_inactive_item_is_rejected() {
        let mut filtro = product("Filtro antigo", dec!(10), dec!(10));
        filtro.ativo = false;
        let catalog = Catalog::new([filtro.clone()]);
        assert!(matches!(
            compose(&[line(&filtro, dec!(1))], &catalog),
            Err(AppError::InvalidLines(_))
        ));
    }

    #[test]
    fn test_empty_budget_has_zero_total() {
        let budget = compose(&[], &Catalog::default()).unwrap();
        assert!(budget.lines.is_empty());
        assert_eq!(budget.total, Decimal::ZERO);
    }
}
