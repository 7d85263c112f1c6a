// src/common/documento.rs

use validator::ValidationError;

/// Mantém apenas os dígitos (remove pontos, traços e barras).
pub fn only_digits(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn digits_of(value: &str) -> Vec<u32> {
    value.chars().filter_map(|c| c.to_digit(10)).collect()
}

fn all_same(digits: &[u32]) -> bool {
    digits.windows(2).all(|w| w[0] == w[1])
}

// Dígito verificador módulo 11 (regra comum a CPF e CNPJ)
fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    let rest = sum % 11;
    if rest < 2 { 0 } else { 11 - rest }
}

pub fn is_valid_cpf(value: &str) -> bool {
    let d = digits_of(value);
    if d.len() != 11 || all_same(&d) {
        return false;
    }
    let first = check_digit(&d[..9], &[10, 9, 8, 7, 6, 5, 4, 3, 2]);
    let second = check_digit(&d[..10], &[11, 10, 9, 8, 7, 6, 5, 4, 3, 2]);
    d[9] == first && d[10] == second
}

pub fn is_valid_cnpj(value: &str) -> bool {
    let d = digits_of(value);
    if d.len() != 14 || all_same(&d) {
        return false;
    }
    let first = check_digit(&d[..12], &[5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2]);
    let second = check_digit(&d[..13], &[6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2]);
    d[12] == first && d[13] == second
}

/// Validador usado pelos payloads: aceita CPF (11 dígitos) ou CNPJ (14 dígitos).
pub fn validate_documento(value: &str) -> Result<(), ValidationError> {
    let valid = match only_digits(value).len() {
        11 => is_valid_cpf(value),
        14 => is_valid_cnpj(value),
        _ => false,
    };

    if !valid {
        let mut err = ValidationError::new("documento");
        err.message = Some("CPF/CNPJ inválido.".into());
        return Err(err);
    }
    Ok(())
}

/// Placa no formato antigo (ABC1234) ou Mercosul (ABC1D23), sem separadores.
pub fn normalize_placa(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase()
}

pub fn validate_placa(value: &str) -> Result<(), ValidationError> {
    let placa = normalize_placa(value);
    let chars: Vec<char> = placa.chars().collect();

    let valid = chars.len() == 7
        && chars[..3].iter().all(|c| c.is_ascii_alphabetic())
        && chars[3].is_ascii_digit()
        && chars[4].is_ascii_alphanumeric()
        && chars[5..].iter().all(|c| c.is_ascii_digit());

    if !valid {
        let mut err = ValidationError::new("placa");
        err.message = Some("Placa inválida.".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_cpf() {
        assert!(is_valid_cpf("529.982.247-25"));
        assert!(is_valid_cpf("52998224725"));
    }

    #[test]
    fn test_invalid_cpf() {
        assert!(!is_valid_cpf("529.982.247-24"));
        assert!(!is_valid_cpf("111.111.111-11"));
        assert!(!is_valid_cpf("1234"));
    }

    #[test]
    fn test_valid_cnpj() {
        assert!(is_valid_cnpj("11.222.333/0001-81"));
        assert!(!is_valid_cnpj("11.222.333/0001-80"));
        assert!(!is_valid_cnpj("00000000000000"));
    }

    #[test]
    fn test_validate_documento_dispatches_by_length() {
        assert!(validate_documento("529.982.247-25").is_ok());
        assert!(validate_documento("11222333000181").is_ok());
        assert!(validate_documento("123").is_err());
    }

    #[test]
    fn test_placa() {
        assert_eq!(normalize_placa("abc-1234"), "ABC1234");
        assert!(validate_placa("ABC-1234").is_ok());
        assert!(validate_placa("BRA2E19").is_ok());
        assert!(validate_placa("AB12345").is_err());
        assert!(validate_placa("ABC12").is_err());
    }
}
