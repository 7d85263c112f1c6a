// src/services/payment_service.rs

//! Fluxo de pagamento de OS e vendas.
//!
//! Dinheiro é aprovado na hora. PIX e cartão viram uma cobrança no
//! processador externo e uma task em segundo plano consulta o status até um
//! resultado final ou até estourar o tempo limite. A baixa (`settle`) é
//! idempotente: quem chegar primeiro grava, os demais só leem.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tokio::time::Instant;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{payment_repo::NewPayment, OrderRepository, PaymentRepository, SaleRepository},
    models::{
        payment::{Payment, PaymentMethod, PaymentStatus, PaymentTarget},
        sale::SaleStatus,
        service_order::OrderStatus,
    },
    services::{
        finance_service::FinanceService,
        nfe_service::NfeService,
        order_service::OrderService,
        payment_gateway::{ChargeRequest, ChargeResponse, PaymentGateway},
        sale_service::SaleService,
        status_policy,
    },
};

pub const TIMEOUT_MESSAGE: &str = "Tempo limite de confirmação excedido";
pub const INTERRUPTED_MESSAGE: &str = "Processamento interrompido antes da cobrança";

#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug)]
pub enum PollOutcome {
    Settled(ChargeResponse),
    TimedOut,
}

/// Consulta a cobrança a cada `interval` até um status final. Erros do
/// processador não interrompem a consulta.
pub async fn poll_until_terminal(gateway: &dyn PaymentGateway, charge_id: &str, settings: PollSettings) -> PollOutcome {
    let deadline = Instant::now() + settings.timeout;

    loop {
        tokio::time::sleep(settings.interval).await;

        match gateway.charge_status(charge_id).await {
            Ok(charge) if charge.status.is_terminal() => return PollOutcome::Settled(charge),
            Ok(charge) => tracing::debug!("Cobrança {} ainda em {:?}", charge_id, charge.status),
            Err(e) => tracing::warn!("⚠️ Falha ao consultar a cobrança {}: {}", charge_id, e),
        }

        if Instant::now() >= deadline {
            return PollOutcome::TimedOut;
        }
    }
}

/// 0 < valor <= total - pago.
pub fn validate_amount(valor: Decimal, total: Decimal, pago: Decimal) -> Result<(), AppError> {
    if valor <= Decimal::ZERO {
        return Err(AppError::BadRequest("O valor do pagamento deve ser maior que zero.".into()));
    }
    let restante = total - pago;
    if restante <= Decimal::ZERO {
        return Err(AppError::Conflict("Não há saldo em aberto para receber.".into()));
    }
    if valor > restante {
        return Err(AppError::BadRequest(format!(
            "O valor informado ({}) excede o saldo em aberto ({}).",
            valor, restante
        )));
    }
    Ok(())
}

/// Tempo de consulta que ainda resta para uma cobrança iniciada há `elapsed`.
/// Zero ainda garante uma última consulta antes de desistir.
pub fn remaining_window(elapsed: Duration, timeout: Duration) -> Duration {
    timeout.saturating_sub(elapsed)
}

/// Passo da baixa conforme o status gravado e o status recebido.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleStep {
    /// Já está final; nada muda.
    Keep,
    /// Só grava o novo status.
    Record,
    /// Grava, lança a receita e verifica a quitação.
    Receive,
}

pub fn settle_step(current: PaymentStatus, incoming: PaymentStatus) -> SettleStep {
    if current.is_terminal() {
        SettleStep::Keep
    } else if incoming == PaymentStatus::Aprovado {
        SettleStep::Receive
    } else {
        SettleStep::Record
    }
}

/// O alvo só é concluído quando ainda aguarda pagamento e o total aprovado
/// cobre o valor do documento.
pub fn completes_target(pago: Decimal, total: Decimal, awaiting_payment: bool) -> bool {
    awaiting_payment && pago >= total
}

/// Alvo que deve receber NF-e depois da baixa: só quando o pagamento pediu a
/// nota e o documento acabou de ser concluído.
pub fn invoice_after_settle(completed: Option<PaymentTarget>, emitir_nfe: bool) -> Option<PaymentTarget> {
    completed.filter(|_| emitir_nfe)
}

// Dados do alvo usados na cobrança e na baixa
struct TargetState {
    total: Decimal,
    numero: i64,
    payable: bool,
}

#[derive(Clone)]
pub struct PaymentService {
    pool: PgPool,
    payments: PaymentRepository,
    orders: OrderRepository,
    sales: SaleRepository,
    finance: FinanceService,
    order_service: OrderService,
    sale_service: SaleService,
    nfe_service: NfeService,
    gateway: Arc<dyn PaymentGateway>,
    poll: PollSettings,
}

impl PaymentService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        payments: PaymentRepository,
        orders: OrderRepository,
        sales: SaleRepository,
        finance: FinanceService,
        order_service: OrderService,
        sale_service: SaleService,
        nfe_service: NfeService,
        gateway: Arc<dyn PaymentGateway>,
        poll: PollSettings,
    ) -> Self {
        Self {
            pool,
            payments,
            orders,
            sales,
            finance,
            order_service,
            sale_service,
            nfe_service,
            gateway,
            poll,
        }
    }

    async fn lock_target(&self, conn: &mut PgConnection, target: PaymentTarget) -> Result<TargetState, AppError> {
        Ok(match target {
            PaymentTarget::Order(id) => {
                let order = self.orders.lock_order(&mut *conn, id).await?;
                TargetState {
                    total: order.total,
                    numero: order.numero,
                    payable: status_policy::can_take_payment(order.status),
                }
            }
            PaymentTarget::Sale(id) => {
                let sale = self.sales.lock_sale(&mut *conn, id).await?;
                TargetState {
                    total: sale.total,
                    numero: sale.numero,
                    payable: sale.status == SaleStatus::Pagamento,
                }
            }
        })
    }

    // =========================================================================
    //  INÍCIO DO PAGAMENTO
    // =========================================================================

    pub async fn start(
        &self,
        target: PaymentTarget,
        metodo: PaymentMethod,
        valor: Decimal,
        emitir_nfe: bool,
        created_by: Option<Uuid>,
    ) -> Result<Payment, AppError> {
        let mut tx = self.pool.begin().await?;

        let state = self.lock_target(&mut *tx, target).await?;
        if !state.payable {
            return Err(AppError::Conflict("O documento não está aguardando pagamento.".into()));
        }
        if self.payments.has_open(&mut *tx, target).await? {
            return Err(AppError::Conflict("Já existe um pagamento em andamento.".into()));
        }
        let pago = self.payments.sum_approved(&mut *tx, target).await?;
        validate_amount(valor, state.total, pago)?;

        let payment = self
            .payments
            .insert(
                &mut *tx,
                &NewPayment {
                    target,
                    metodo,
                    valor,
                    status: PaymentStatus::Pendente,
                    emitir_nfe,
                    created_by,
                },
            )
            .await?;
        tx.commit().await?;

        tracing::info!("💳 Pagamento {} ({:?}, {}) iniciado para o documento #{}", payment.id, metodo, valor, state.numero);

        if !metodo.uses_gateway() {
            return self.settle(payment.id, PaymentStatus::Aprovado, None).await;
        }

        let request = ChargeRequest {
            referencia: payment.id.to_string(),
            valor,
            metodo,
        };

        let charge = match self.gateway.create_charge(&request).await {
            Ok(charge) => charge,
            Err(e) => {
                tracing::error!("❌ Falha ao criar cobrança do pagamento {}: {}", payment.id, e);
                self.payments
                    .update_status(&self.pool, payment.id, PaymentStatus::Erro, Some(&e.to_string()))
                    .await?;
                return Err(e);
            }
        };

        let payment = self
            .payments
            .set_gateway_id(&self.pool, payment.id, &charge.id, PaymentStatus::Processando)
            .await?;

        if charge.status.is_terminal() {
            return self.settle(payment.id, charge.status, charge.mensagem.as_deref()).await;
        }

        self.spawn_tracker(payment.id, charge.id);
        Ok(payment)
    }

    fn spawn_tracker(&self, payment_id: Uuid, charge_id: String) {
        self.spawn_tracker_with(payment_id, charge_id, self.poll);
    }

    fn spawn_tracker_with(&self, payment_id: Uuid, charge_id: String, settings: PollSettings) {
        let service = self.clone();
        tokio::spawn(async move {
            service.track(payment_id, charge_id, settings).await;
        });
    }

    async fn track(&self, payment_id: Uuid, charge_id: String, settings: PollSettings) {
        let (status, mensagem) = match poll_until_terminal(self.gateway.as_ref(), &charge_id, settings).await {
            PollOutcome::Settled(charge) => (charge.status, charge.mensagem),
            PollOutcome::TimedOut => {
                tracing::warn!("⏱️ Pagamento {} sem confirmação no tempo limite", payment_id);
                // Evita capturar um valor que já demos como falho
                if let Err(e) = self.gateway.cancel_charge(&charge_id).await {
                    tracing::warn!("⚠️ Não foi possível cancelar a cobrança {}: {}", charge_id, e);
                }
                (PaymentStatus::Erro, Some(TIMEOUT_MESSAGE.to_string()))
            }
        };

        if let Err(e) = self.settle(payment_id, status, mensagem.as_deref()).await {
            tracing::error!("❌ Falha na baixa do pagamento {}: {}", payment_id, e);
        }
    }

    /// Retoma a consulta dos pagamentos que ficaram em aberto após um
    /// reinício. Cada cobrança consulta só o tempo que ainda lhe resta; as
    /// que nunca chegaram ao processador são encerradas como ERRO.
    pub async fn resume_open_payments(&self) -> Result<usize, AppError> {
        let open = self.payments.list_open().await?;
        let count = open.len();

        for payment in open {
            match payment.gateway_id.clone() {
                Some(charge_id) => {
                    let elapsed = (Utc::now() - payment.created_at).to_std().unwrap_or_default();
                    let settings = PollSettings {
                        interval: self.poll.interval,
                        timeout: remaining_window(elapsed, self.poll.timeout),
                    };
                    tracing::info!("🔁 Retomando a consulta do pagamento {} ({:?} restantes)", payment.id, settings.timeout);
                    self.spawn_tracker_with(payment.id, charge_id, settings);
                }
                None => {
                    tracing::warn!("⚠️ Pagamento {} ficou sem cobrança; encerrando como ERRO", payment.id);
                    self.settle(payment.id, PaymentStatus::Erro, Some(INTERRUPTED_MESSAGE)).await?;
                }
            }
        }

        Ok(count)
    }

    // =========================================================================
    //  BAIXA
    // =========================================================================

    /// Grava o status final. Em APROVADO lança a receita e, se o alvo ficou
    /// quitado, conclui a OS ou finaliza a venda (com baixa de estoque).
    pub async fn settle(&self, payment_id: Uuid, status: PaymentStatus, mensagem: Option<&str>) -> Result<Payment, AppError> {
        let mut tx = self.pool.begin().await?;
        let current = self.payments.lock(&mut *tx, payment_id).await?;

        let step = settle_step(current.status, status);
        if step == SettleStep::Keep {
            return Ok(current);
        }

        let payment = self.payments.update_status(&mut *tx, payment_id, status, mensagem).await?;
        let mut completed = None;

        if step == SettleStep::Receive {
            let target = payment
                .target()
                .ok_or_else(|| anyhow::anyhow!("Pagamento {} sem OS ou venda vinculada", payment.id))?;

            match target {
                PaymentTarget::Order(order_id) => {
                    let order = self.orders.lock_order(&mut *tx, order_id).await?;
                    self.finance
                        .record_payment(&mut *tx, &payment, format!("Recebimento OS #{}", order.numero))
                        .await?;

                    let pago = self.payments.sum_approved(&mut *tx, target).await?;
                    if completes_target(pago, order.total, order.status == OrderStatus::Pagamento) {
                        self.order_service.complete_in_tx(&mut *tx, &order).await?;
                        completed = Some(target);
                    }
                }
                PaymentTarget::Sale(sale_id) => {
                    let sale = self.sales.lock_sale(&mut *tx, sale_id).await?;
                    self.finance
                        .record_payment(&mut *tx, &payment, format!("Recebimento Venda #{}", sale.numero))
                        .await?;

                    let pago = self.payments.sum_approved(&mut *tx, target).await?;
                    if completes_target(pago, sale.total, sale.status == SaleStatus::Pagamento) {
                        self.sale_service.finalize_in_tx(&mut *tx, &sale).await?;
                        completed = Some(target);
                    }
                }
            }
        }

        tx.commit().await?;
        tracing::info!("💳 Pagamento {} -> {:?}", payment.id, payment.status);

        if let Some(target) = completed {
            tracing::info!("🏁 {:?} quitado e concluído", target);
        }
        if let Some(target) = invoice_after_settle(completed, payment.emitir_nfe) {
            self.issue_invoice(target).await;
        }

        Ok(payment)
    }

    // Falha na NF-e não desfaz o pagamento
    async fn issue_invoice(&self, target: PaymentTarget) {
        match self.nfe_service.issue_for(target.into()).await {
            Ok(nfe) => tracing::info!("🧾 NF-e {} emitida após pagamento ({:?})", nfe.header.numero, nfe.header.status),
            Err(e) => tracing::error!("❌ Falha ao emitir NF-e para {:?}: {}", target, e),
        }
    }

    // =========================================================================
    //  CONSULTA E CANCELAMENTO
    // =========================================================================

    pub async fn get(&self, id: Uuid) -> Result<Payment, AppError> {
        self.payments
            .find(id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Pagamento {}", id)))
    }

    /// Cancela um pagamento em aberto. A chamada ao processador acontece sem
    /// a trava da linha; a gravação passa pela mesma baixa do poller, então
    /// quem chegar primeiro define o status final.
    pub async fn cancel(&self, id: Uuid) -> Result<Payment, AppError> {
        let payment = self.get(id).await?;
        if payment.status.is_terminal() {
            return Err(already_closed(payment.status));
        }

        if let Some(charge_id) = payment.gateway_id.as_deref() {
            self.gateway.cancel_charge(charge_id).await?;
        }

        let payment = self
            .settle(id, PaymentStatus::Cancelado, Some("Cancelado pelo operador"))
            .await?;
        if payment.status != PaymentStatus::Cancelado {
            return Err(already_closed(payment.status));
        }

        tracing::info!("🚫 Pagamento {} cancelado", id);
        Ok(payment)
    }
}

fn already_closed(status: PaymentStatus) -> AppError {
    AppError::Conflict(format!("O pagamento já foi encerrado como {:?}.", status))
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
    };

    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    use super::*;

    // Processador falso: devolve a sequência roteirizada e depois `fallback`
    struct ScriptedGateway {
        script: Mutex<VecDeque<Result<PaymentStatus, String>>>,
        fallback: PaymentStatus,
        calls: AtomicUsize,
    }

    impl ScriptedGateway {
        fn new(script: Vec<Result<PaymentStatus, String>>, fallback: PaymentStatus) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn charge(status: PaymentStatus) -> ChargeResponse {
        ChargeResponse {
            id: "ch_123".into(),
            status,
            mensagem: None,
        }
    }

    #[async_trait]
    impl PaymentGateway for ScriptedGateway {
        async fn create_charge(&self, _request: &ChargeRequest) -> Result<ChargeResponse, AppError> {
            Ok(charge(PaymentStatus::Processando))
        }

        async fn charge_status(&self, _charge_id: &str) -> Result<ChargeResponse, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Ok(status)) => Ok(charge(status)),
                Some(Err(msg)) => Err(AppError::GatewayError(msg)),
                None => Ok(charge(self.fallback)),
            }
        }

        async fn cancel_charge(&self, _charge_id: &str) -> Result<(), AppError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_stops_on_first_terminal_status() {
        let gateway = ScriptedGateway::new(
            vec![
                Ok(PaymentStatus::Processando),
                Err("timeout de rede".into()),
                Ok(PaymentStatus::Aprovado),
                Ok(PaymentStatus::Negado),
            ],
            PaymentStatus::Processando,
        );
        let started = Instant::now();

        let outcome = poll_until_terminal(&gateway, "ch_123", PollSettings::default()).await;

        match outcome {
            PollOutcome::Settled(charge) => assert_eq!(charge.status, PaymentStatus::Aprovado),
            PollOutcome::TimedOut => panic!("não deveria estourar o tempo"),
        }
        // O erro do gateway não interrompe; a terceira consulta já resolve
        assert_eq!(gateway.calls(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_gives_up_after_timeout() {
        let gateway = ScriptedGateway::new(vec![], PaymentStatus::Processando);
        let started = Instant::now();

        let outcome = poll_until_terminal(&gateway, "ch_123", PollSettings::default()).await;

        assert!(matches!(outcome, PollOutcome::TimedOut));
        assert_eq!(gateway.calls(), 60);
        assert_eq!(started.elapsed(), Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_keeps_going_through_gateway_errors() {
        let gateway = ScriptedGateway::new(
            vec![Err("502".into()), Err("502".into()), Ok(PaymentStatus::Negado)],
            PaymentStatus::Processando,
        );

        let settings = PollSettings {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(10),
        };
        let outcome = poll_until_terminal(&gateway, "ch_123", settings).await;

        assert!(matches!(outcome, PollOutcome::Settled(ref c) if c.status == PaymentStatus::Negado));
        assert_eq!(gateway.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resumed_poll_with_expired_window_checks_once() {
        let gateway = ScriptedGateway::new(vec![Ok(PaymentStatus::Aprovado)], PaymentStatus::Processando);
        let settings = PollSettings {
            interval: Duration::from_secs(2),
            timeout: remaining_window(Duration::from_secs(300), Duration::from_secs(120)),
        };

        let outcome = poll_until_terminal(&gateway, "ch_123", settings).await;

        // Aprovação que chegou enquanto o processo estava fora ainda é baixada
        assert!(matches!(outcome, PollOutcome::Settled(ref c) if c.status == PaymentStatus::Aprovado));
        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resumed_poll_times_out_after_remaining_window() {
        let gateway = ScriptedGateway::new(vec![], PaymentStatus::Processando);
        let settings = PollSettings {
            interval: Duration::from_secs(2),
            timeout: remaining_window(Duration::from_secs(110), Duration::from_secs(120)),
        };
        let started = Instant::now();

        let outcome = poll_until_terminal(&gateway, "ch_123", settings).await;

        assert!(matches!(outcome, PollOutcome::TimedOut));
        assert_eq!(gateway.calls(), 5);
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[test]
    fn test_remaining_window() {
        let timeout = Duration::from_secs(120);
        assert_eq!(remaining_window(Duration::ZERO, timeout), timeout);
        assert_eq!(remaining_window(Duration::from_secs(45), timeout), Duration::from_secs(75));
        assert_eq!(remaining_window(Duration::from_secs(120), timeout), Duration::ZERO);
        assert_eq!(remaining_window(Duration::from_secs(3600), timeout), Duration::ZERO);
    }

    #[test]
    fn test_settle_keeps_terminal_payments() {
        let terminal = [
            PaymentStatus::Aprovado,
            PaymentStatus::Negado,
            PaymentStatus::Cancelado,
            PaymentStatus::Erro,
        ];
        for current in terminal {
            for incoming in terminal {
                assert_eq!(settle_step(current, incoming), SettleStep::Keep, "{:?} <- {:?}", current, incoming);
            }
        }
    }

    #[test]
    fn test_settle_step_for_open_payments() {
        for current in [PaymentStatus::Pendente, PaymentStatus::Processando] {
            assert_eq!(settle_step(current, PaymentStatus::Aprovado), SettleStep::Receive);
            assert_eq!(settle_step(current, PaymentStatus::Negado), SettleStep::Record);
            assert_eq!(settle_step(current, PaymentStatus::Cancelado), SettleStep::Record);
            assert_eq!(settle_step(current, PaymentStatus::Erro), SettleStep::Record);
        }
    }

    #[test]
    fn test_target_completes_only_when_fully_paid() {
        assert!(completes_target(dec!(450), dec!(450), true));
        assert!(completes_target(dec!(500), dec!(450), true));
        assert!(!completes_target(dec!(449.99), dec!(450), true));
        // Pagamento parcial
        assert!(!completes_target(dec!(100), dec!(450), true));
        // Alvo que já saiu de PAGAMENTO não é concluído de novo
        assert!(!completes_target(dec!(450), dec!(450), false));
    }

    #[test]
    fn test_invoice_only_after_completion() {
        let order = PaymentTarget::Order(Uuid::new_v4());

        assert_eq!(invoice_after_settle(Some(order), true), Some(order));
        assert_eq!(invoice_after_settle(Some(order), false), None);
        // Pagamento parcial não conclui a OS, logo não há nota
        assert_eq!(invoice_after_settle(None, true), None);
    }

    #[test]
    fn test_amount_limits() {
        assert!(validate_amount(dec!(100), dec!(450), dec!(0)).is_ok());
        assert!(validate_amount(dec!(450), dec!(450), dec!(0)).is_ok());
        assert!(validate_amount(dec!(350), dec!(450), dec!(100)).is_ok());

        assert!(matches!(validate_amount(dec!(0), dec!(450), dec!(0)), Err(AppError::BadRequest(_))));
        assert!(matches!(validate_amount(dec!(-5), dec!(450), dec!(0)), Err(AppError::BadRequest(_))));
        assert!(matches!(validate_amount(dec!(450.01), dec!(450), dec!(0)), Err(AppError::BadRequest(_))));
        // Já quitado
        assert!(matches!(validate_amount(dec!(1), dec!(450), dec!(450)), Err(AppError::Conflict(_))));
    }
}
