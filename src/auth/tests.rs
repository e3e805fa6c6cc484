use super::*;
use jsonwebtoken::{EncodingKey, Header, encode};
use std::env;

fn set_env_vars() {
    unsafe {
        env::set_var("SERVER_PORT", "8080");
        env::set_var("SERVER_BODY_LIMIT", "10");
        env::set_var("SERVER_TIMEOUT", "30");
        env::set_var("DATABASE_URL", "postgres://localhost:5432/db");
        env::set_var("JWT_SECRET", "supersecretjwtsecretforunittesting123");
    }
}

#[test]
fn test_validate_access_token_success() {
    set_env_vars();
    let secret = "supersecretjwtsecretforunittesting123";
    let my_claims = AccessClaims {
        sub: "123e4567-e89b-12d3-a456-426614174000".to_string(),
        role: "user".to_string(),
        exp: 9999999999, // far future
    };

    let token = encode(
        &Header::default(),
        &my_claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap();

    let claims = validate_access_token(&token).expect("Valid token should pass");
    assert_eq!(claims.sub, my_claims.sub);
    assert_eq!(claims.role, my_claims.role);
}

#[test]
fn test_validate_access_token_expired() {
    set_env_vars();
    let secret = "supersecretjwtsecretforunittesting123";
    let my_claims = AccessClaims {
        sub: "123e4567-e89b-12d3-a456-426614174000".to_string(),
        role: "user".to_string(),
        exp: 1, // past
    };

    let token = encode(
        &Header::default(),
        &my_claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap();

    let result = validate_access_token(&token);
    assert!(result.is_err());
}

#[test]
fn test_validate_access_token_invalid_signature() {
    set_env_vars();
    let secret = "wrongsecret";
    let my_claims = AccessClaims {
        sub: "123e4567-e89b-12d3-a456-426614174000".to_string(),
        role: "admin".to_string(),
        exp: 9999999999,
    };

    let token = encode(
        &Header::default(),
        &my_claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap();

    let result = validate_access_token(&token);
    assert!(result.is_err());
}

#[test]
fn test_admin_role_detection() {
    let admin = AuthUser {
        user_id: Uuid::new_v4(),
        role: "admin".to_string(),
    };
    let user = AuthUser {
        user_id: Uuid::new_v4(),
        role: "user".to_string(),
    };

    assert!(admin.is_admin());
    assert!(!user.is_admin());
}
