// src/handlers.rs

use rust_decimal::Decimal;
use validator::ValidationError;

pub mod catalog;
pub mod customers;
pub mod dashboard;
pub mod finance;
pub mod nfe;
pub mod orders;
pub mod payments;
pub mod sales;

// --- Validadores compartilhados pelos payloads ---

pub(crate) fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

pub(crate) fn validate_positive(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.add_param("exclusive_min".into(), &0.0);
        err.message = Some("O valor deve ser maior que zero.".into());
        return Err(err);
    }
    Ok(())
}
