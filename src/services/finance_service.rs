// src/services/finance_service.rs

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        finance_repo::{NewTransaction, TransactionFilter},
        FinanceRepository,
    },
    models::{
        finance::{CashFlowSummary, Transaction, TransactionKind},
        payment::{Payment, PaymentTarget},
    },
};

/// Entradas = RECEITA + DEPOSITO, saídas = DESPESA + SAQUE.
pub fn summarize(transactions: &[Transaction]) -> CashFlowSummary {
    let mut summary = CashFlowSummary {
        entradas: Decimal::ZERO,
        saidas: Decimal::ZERO,
        saldo: Decimal::ZERO,
        receitas: Decimal::ZERO,
        despesas: Decimal::ZERO,
        depositos: Decimal::ZERO,
        saques: Decimal::ZERO,
    };

    for t in transactions {
        match t.tipo {
            TransactionKind::Receita => summary.receitas += t.valor,
            TransactionKind::Despesa => summary.despesas += t.valor,
            TransactionKind::Deposito => summary.depositos += t.valor,
            TransactionKind::Saque => summary.saques += t.valor,
        }
        summary.saldo += t.tipo.signed(t.valor);
    }

    summary.entradas = summary.receitas + summary.depositos;
    summary.saidas = summary.despesas + summary.saques;
    summary
}

#[derive(Clone)]
pub struct FinanceService {
    repo: FinanceRepository,
    pool: PgPool,
}

impl FinanceService {
    pub fn new(repo: FinanceRepository, pool: PgPool) -> Self {
        Self { repo, pool }
    }

    /// Lançamento manual no caixa.
    pub async fn create_transaction(&self, data: NewTransaction) -> Result<Transaction, AppError> {
        if data.valor <= Decimal::ZERO {
            return Err(AppError::BadRequest("O valor deve ser maior que zero.".into()));
        }
        let transaction = self.repo.create_transaction(&self.pool, &data).await?;
        tracing::info!("💰 Lançamento {:?} de {} registrado", transaction.tipo, transaction.valor);
        Ok(transaction)
    }

    /// Gera a RECEITA de um pagamento aprovado, dentro da transação da baixa.
    pub async fn record_payment<'e, E>(
        &self,
        executor: E,
        payment: &Payment,
        descricao: String,
    ) -> Result<Transaction, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (order_id, sale_id, categoria) = match payment.target() {
            Some(PaymentTarget::Order(id)) => (Some(id), None, "Serviços"),
            Some(PaymentTarget::Sale(id)) => (None, Some(id), "Vendas"),
            None => (None, None, "Outros"),
        };

        let data = NewTransaction {
            tipo: TransactionKind::Receita,
            descricao,
            valor: payment.valor,
            data: Utc::now().date_naive(),
            categoria: Some(categoria.to_string()),
            order_id,
            sale_id,
            payment_id: Some(payment.id),
            criado_por: payment.created_by,
        };

        self.repo.create_transaction(executor, &data).await
    }

    pub async fn list_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, AppError> {
        self.repo.list_transactions(&self.pool, filter).await
    }

    pub async fn delete_transaction(&self, id: Uuid) -> Result<(), AppError> {
        if !self.repo.delete_transaction(id).await? {
            return Err(AppError::ResourceNotFound(format!("Lançamento {}", id)));
        }
        Ok(())
    }

    pub async fn cash_flow(&self, filter: &TransactionFilter) -> Result<CashFlowSummary, AppError> {
        let transactions = self.list_transactions(filter).await?;
        Ok(summarize(&transactions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn tx(tipo: TransactionKind, valor: Decimal) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            tipo,
            descricao: "teste".into(),
            valor,
            data: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            categoria: None,
            order_id: None,
            sale_id: None,
            payment_id: None,
            criado_por: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_summary_signs() {
        let transactions = vec![
            tx(TransactionKind::Receita, dec!(450.00)),
            tx(TransactionKind::Deposito, dec!(100.00)),
            tx(TransactionKind::Despesa, dec!(120.50)),
            tx(TransactionKind::Saque, dec!(30.00)),
            tx(TransactionKind::Receita, dec!(50.00)),
        ];

        let summary = summarize(&transactions);

        assert_eq!(summary.receitas, dec!(500.00));
        assert_eq!(summary.entradas, dec!(600.00));
        assert_eq!(summary.saidas, dec!(150.50));
        assert_eq!(summary.saldo, dec!(449.50));
    }

    #[test]
    fn test_empty_summary_is_zero() {
        let summary = summarize(&[]);
        assert_eq!(summary.saldo, Decimal::ZERO);
        assert_eq!(summary.entradas, Decimal::ZERO);
    }
}
