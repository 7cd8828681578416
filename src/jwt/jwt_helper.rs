use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{
    decode, encode, errors::Result as JwtResult, DecodingKey, EncodingKey, Header, Validation,
};
use uuid::Uuid;

use crate::jwt::claims::Claims;

const DEFAULT_SECRET: &str = "unimarket-dev-secret";
const TOKEN_TTL_SECS: u64 = 60 * 60 * 24; // 24 hours

fn secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_SECRET.to_string())
}

pub fn create_token(user_id: Uuid) -> JwtResult<String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("System time before Unix epoch")
        .as_secs();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (now + TOKEN_TTL_SECS) as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret().as_bytes()),
    )
}

pub fn verify_token(token: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret().as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| "Invalid token".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies() {
        let user_id = Uuid::new_v4();
        let token = create_token(user_id).unwrap();
        let claims = verify_token(&token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(verify_token("not-a-token").is_err());
    }
}
