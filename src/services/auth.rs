// src/services/auth.rs

use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{common::error::AppError, models::auth::Claims};

/// Os tokens são emitidos pelo provedor de identidade da oficina; aqui só
/// conferimos assinatura e validade.
#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
}

impl AuthService {
    pub fn new(jwt_secret: String) -> Self {
        Self { jwt_secret }
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|e| {
            tracing::debug!("Token recusado: {}", e);
            AppError::InvalidToken
        })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use uuid::Uuid;

    pub(crate) fn token_for(secret: &str, user_id: Uuid, ttl_secs: i64) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            exp: (now + ttl_secs) as usize,
            iat: now as usize,
            name: Some("Balcão".into()),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref())).unwrap()
    }

    #[test]
    fn test_valid_token() {
        let service = AuthService::new("segredo".into());
        let user_id = Uuid::new_v4();

        let claims = service.validate_token(&token_for("segredo", user_id, 3600)).unwrap();
        assert_eq!(claims.sub, user_id);
    }

    #[test]
    fn test_wrong_secret_and_expired_tokens_are_rejected() {
        let service = AuthService::new("segredo".into());

        let forged = token_for("outro-segredo", Uuid::new_v4(), 3600);
        assert!(matches!(service.validate_token(&forged), Err(AppError::InvalidToken)));

        // Bem além da margem padrão de 60s
        let expired = token_for("segredo", Uuid::new_v4(), -3600);
        assert!(matches!(service.validate_token(&expired), Err(AppError::InvalidToken)));

        assert!(matches!(service.validate_token("nao-e-jwt"), Err(AppError::InvalidToken)));
    }
}
