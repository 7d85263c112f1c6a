// src/services/status_policy.rs

//! Tabela de transições da Ordem de Serviço.
//!
//! Tudo aqui é puro: recebe o status atual e responde o que pode ser feito.
//! Os services consultam esta tabela antes de qualquer mutação.

use crate::{
    common::error::AppError,
    models::service_order::{OrderAction, OrderStatus},
};

use OrderStatus::*;

/// Destinos permitidos a partir de cada status.
pub fn allowed_transitions(from: OrderStatus) -> &'static [OrderStatus] {
    match from {
        Orcamento => &[AprovacaoOrcamento, Cancelado],
        AprovacaoOrcamento => &[OrcamentoAprovado, OrcamentoRecusado, Orcamento, Cancelado],
        OrcamentoRecusado => &[AprovacaoOrcamento, Orcamento, Cancelado],
        OrcamentoAprovado => &[EmAndamento, Cancelado],
        EmAndamento => &[Pagamento, Cancelado],
        Pagamento => &[Concluido, EmAndamento, Cancelado],
        Concluido | Cancelado => &[],
    }
}

pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    allowed_transitions(from).contains(&to)
}

pub fn ensure_transition(from: OrderStatus, to: OrderStatus) -> Result<(), AppError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition { from, to })
    }
}

pub fn can_edit_budget(status: OrderStatus) -> bool {
    matches!(status, Orcamento | OrcamentoRecusado)
}

pub fn can_edit_header(status: OrderStatus) -> bool {
    !status.is_terminal()
}

pub fn can_take_payment(status: OrderStatus) -> bool {
    status == Pagamento
}

pub fn can_issue_invoice(status: OrderStatus) -> bool {
    matches!(status, Pagamento | Concluido)
}

/// Ação de interface que leva a um determinado destino.
fn action_for_target(from: OrderStatus, to: OrderStatus) -> OrderAction {
    match to {
        AprovacaoOrcamento => OrderAction::EnviarAprovacao,
        OrcamentoAprovado => OrderAction::Aprovar,
        OrcamentoRecusado => OrderAction::Recusar,
        Orcamento => OrderAction::Reabrir,
        EmAndamento if from == Pagamento => OrderAction::Reabrir,
        EmAndamento => OrderAction::Iniciar,
        Pagamento => OrderAction::EnviarPagamento,
        Concluido => OrderAction::Concluir,
        Cancelado => OrderAction::Cancelar,
    }
}

/// Lista de ações que a interface deve exibir para o status.
pub fn available_actions(status: OrderStatus) -> Vec<OrderAction> {
    let mut actions = Vec::new();

    if can_edit_header(status) {
        actions.push(OrderAction::EditarDados);
    }
    if can_edit_budget(status) {
        actions.push(OrderAction::EditarOrcamento);
    }

    for &to in allowed_transitions(status) {
        let action = action_for_target(status, to);
        if !actions.contains(&action) {
            actions.push(action);
        }
    }

    if can_take_payment(status) {
        actions.push(OrderAction::Cobrar);
    }
    if can_issue_invoice(status) {
        actions.push(OrderAction::EmitirNfe);
    }

    actions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listed_transitions_are_allowed() {
        let expected = [
            (Orcamento, AprovacaoOrcamento),
            (Orcamento, Cancelado),
            (AprovacaoOrcamento, OrcamentoAprovado),
            (AprovacaoOrcamento, OrcamentoRecusado),
            (OrcamentoRecusado, AprovacaoOrcamento),
            (OrcamentoAprovado, EmAndamento),
            (EmAndamento, Pagamento),
            (Pagamento, Concluido),
            (Pagamento, EmAndamento),
        ];
        for (from, to) in expected {
            assert!(can_transition(from, to), "{:?} -> {:?}", from, to);
        }
    }

    #[test]
    fn test_skipping_steps_is_rejected() {
        assert!(!can_transition(Orcamento, EmAndamento));
        assert!(!can_transition(Orcamento, Concluido));
        assert!(!can_transition(OrcamentoAprovado, Pagamento));
        assert!(!can_transition(EmAndamento, Concluido));
        assert!(!can_transition(OrcamentoRecusado, EmAndamento));
    }

    #[test]
    fn test_terminal_statuses_allow_nothing() {
        for to in OrderStatus::ALL {
            assert!(!can_transition(Concluido, to));
            assert!(!can_transition(Cancelado, to));
        }
        assert_eq!(available_actions(Concluido), vec![OrderAction::EmitirNfe]);
        assert!(available_actions(Cancelado).is_empty());
    }

    #[test]
    fn test_every_open_status_can_be_cancelled() {
        for from in OrderStatus::ALL.into_iter().filter(|s| !s.is_terminal()) {
            assert!(can_transition(from, Cancelado), "{:?}", from);
        }
    }

    #[test]
    fn test_budget_editable_only_before_approval() {
        assert!(can_edit_budget(Orcamento));
        assert!(can_edit_budget(OrcamentoRecusado));
        assert!(!can_edit_budget(AprovacaoOrcamento));
        assert!(!can_edit_budget(OrcamentoAprovado));
        assert!(!can_edit_budget(EmAndamento));
    }

    #[test]
    fn test_actions_for_pagamento() {
        let actions = available_actions(Pagamento);
        assert!(actions.contains(&OrderAction::Concluir));
        assert!(actions.contains(&OrderAction::Reabrir));
        assert!(actions.contains(&OrderAction::EmitirNfe));
        assert!(actions.contains(&OrderAction::Cobrar));
        assert!(!actions.contains(&OrderAction::EditarOrcamento));
    }

    #[test]
    fn test_cobrar_offered_only_in_pagamento() {
        for status in OrderStatus::ALL {
            assert_eq!(
                available_actions(status).contains(&OrderAction::Cobrar),
                status == Pagamento,
                "{:?}",
                status
            );
        }
        let em_andamento = available_actions(EmAndamento);
        assert_eq!(
            em_andamento,
            vec![OrderAction::EditarDados, OrderAction::EnviarPagamento, OrderAction::Cancelar]
        );
    }

    #[test]
    fn test_ensure_transition_error() {
        let err = ensure_transition(Concluido, Orcamento).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { from: Concluido, to: Orcamento }));
    }
}
