//! End-to-end: sign a token with the current credentials, validate it with
//! the public key published in the key set, and reject tampered signatures.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, Algorithm as JwtAlgorithm, DecodingKey, EncodingKey, Header, Validation,
};
use jwks_kit::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iss: String,
    exp: usize,
}

fn claims() -> Claims {
    Claims {
        sub: "a-subject".to_string(),
        iss: "me".to_string(),
        exp: (Utc::now() + Duration::minutes(5)).timestamp() as usize,
    }
}

fn service_for(algorithm: &str) -> (Arc<InMemoryKeyStore>, JwksService) {
    let store = Arc::new(InMemoryKeyStore::new());
    let options = JwksOptions {
        algorithm: algorithm.to_string(),
        ..JwksOptions::default()
    };
    let service = JwksService::new(store.clone(), options).unwrap();
    (store, service)
}

fn encoding_key(credentials: &KeyCredentials) -> EncodingKey {
    match credentials.jwk().kty.as_str() {
        "RSA" => EncodingKey::from_rsa_pem(credentials.to_pkcs8_pem().unwrap().as_bytes()).unwrap(),
        "EC" => EncodingKey::from_ec_pem(credentials.to_pkcs8_pem().unwrap().as_bytes()).unwrap(),
        "oct" => EncodingKey::from_secret(&credentials.secret_bytes().unwrap()),
        other => panic!("unexpected kty: {other}"),
    }
}

fn decoding_key(jwk: &JsonWebKey) -> DecodingKey {
    match jwk.kty.as_str() {
        "RSA" => DecodingKey::from_rsa_components(
            jwk.n.as_deref().unwrap(),
            jwk.e.as_deref().unwrap(),
        )
        .unwrap(),
        "EC" => DecodingKey::from_ec_components(
            jwk.x.as_deref().unwrap(),
            jwk.y.as_deref().unwrap(),
        )
        .unwrap(),
        other => panic!("unexpected kty in key set: {other}"),
    }
}

fn tamper_signature(token: &str) -> String {
    let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
    assert_eq!(parts.len(), 3);
    let mut signature: Vec<char> = parts[2].chars().collect();
    signature[0] = if signature[0] == 'A' { 'B' } else { 'A' };
    parts[2] = signature.into_iter().collect();
    parts.join(".")
}

#[test]
fn asymmetric_tokens_validate_against_the_published_key_set() {
    // ES512 被排除：jsonwebtoken 不支持该签名算法，但密钥管理路径
    // 在单元测试里已覆盖 P-521。
    for algorithm in ["RS256", "PS256", "ES256", "ES384"] {
        let (store, service) = service_for(algorithm);
        let credentials = service.current_signing_credentials().unwrap();
        assert_eq!(credentials.algorithm, algorithm);

        let jwt_algorithm = JwtAlgorithm::from_str(algorithm).unwrap();
        let mut header = Header::new(jwt_algorithm);
        header.kid = Some(credentials.key_id.clone());
        let token = encode(&header, &claims(), &encoding_key(&credentials)).unwrap();

        // 验证方只拿发现文档里的公钥
        let projector = KeySetProjector::new(store);
        let key_set = projector.build_key_set(KeyUsage::Signing, 5).unwrap();
        let public_jwk = key_set
            .keys
            .iter()
            .find(|k| k.kid.as_deref() == Some(credentials.key_id.as_str()))
            .unwrap();
        assert!(!public_jwk.has_private_components());

        let mut validation = Validation::new(jwt_algorithm);
        validation.set_issuer(&["me"]);
        let decoded = decode::<Claims>(&token, &decoding_key(public_jwk), &validation);
        assert!(decoded.is_ok(), "validation failed for {algorithm}");
        assert_eq!(decoded.unwrap().claims.sub, "a-subject");

        // 签名被篡改一个字节后验证必须失败
        let tampered = tamper_signature(&token);
        assert!(
            decode::<Claims>(&tampered, &decoding_key(public_jwk), &validation).is_err(),
            "tampered token passed for {algorithm}"
        );
    }
}

#[test]
fn hmac_tokens_validate_with_the_shared_secret_and_stay_private() {
    for algorithm in ["HS256", "HS384", "HS512"] {
        let (store, service) = service_for(algorithm);
        let credentials = service.current_signing_credentials().unwrap();

        let jwt_algorithm = JwtAlgorithm::from_str(algorithm).unwrap();
        let token = encode(
            &Header::new(jwt_algorithm),
            &claims(),
            &encoding_key(&credentials),
        )
        .unwrap();

        let mut validation = Validation::new(jwt_algorithm);
        validation.set_issuer(&["me"]);
        let secret = credentials.secret_bytes().unwrap();
        let decoded =
            decode::<Claims>(&token, &DecodingKey::from_secret(&secret), &validation);
        assert!(decoded.is_ok(), "validation failed for {algorithm}");

        let tampered = tamper_signature(&token);
        assert!(
            decode::<Claims>(&tampered, &DecodingKey::from_secret(&secret), &validation).is_err()
        );

        // 对称密钥绝不出现在公开密钥集里
        let projector = KeySetProjector::new(store);
        let key_set = projector.build_key_set(KeyUsage::Signing, 5).unwrap();
        assert!(key_set.keys.is_empty(), "{algorithm} leaked into the key set");
    }
}

#[test]
fn a_rotated_out_key_still_validates_older_tokens() {
    let store = Arc::new(InMemoryKeyStore::new());
    let options = JwksOptions {
        days_until_expire: 0, // 立即过期，下一次访问即轮换
        ..JwksOptions::default()
    };
    let service = JwksService::new(store.clone(), options).unwrap();

    // 用第一代密钥签发
    let old_credentials = service.current_signing_credentials().unwrap();
    let jwt_algorithm = JwtAlgorithm::ES256;
    let mut header = Header::new(jwt_algorithm);
    header.kid = Some(old_credentials.key_id.clone());
    let token = encode(&header, &claims(), &encoding_key(&old_credentials)).unwrap();

    // 触发轮换
    let new_credentials = service.current_signing_credentials().unwrap();
    assert_ne!(new_credentials.key_id, old_credentials.key_id);

    // 旧 kid 仍在密钥集里，按 kid 选择后验证成功
    let projector = KeySetProjector::new(store);
    let key_set = projector.build_key_set(KeyUsage::Signing, 5).unwrap();
    let old_jwk = key_set
        .keys
        .iter()
        .find(|k| k.kid.as_deref() == Some(old_credentials.key_id.as_str()))
        .expect("rotated-out key must stay published during the overlap window");

    let mut validation = Validation::new(jwt_algorithm);
    validation.set_issuer(&["me"]);
    assert!(decode::<Claims>(&token, &decoding_key(old_jwk), &validation).is_ok());
}
