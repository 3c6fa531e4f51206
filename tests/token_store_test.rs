/// Integration tests for the opaque token store
///
/// Exercises the token lifecycle end to end against the in-memory
/// backend: single-use consumption, owner and kind scoping, lazy expiry,
/// idempotent revocation, and bulk revocation.

mod common;

use chrono::Duration;
use common::TestContext;
use serde_json::json;
use tokensmith::models::token::TokenKind;

#[tokio::test]
async fn test_single_use_across_all_kinds() {
    let ctx = TestContext::new();
    let user = ctx.register_user("tokens@example.com", "Password123!").await;

    for kind in [
        TokenKind::Refresh,
        TokenKind::EmailVerify,
        TokenKind::PasswordReset,
    ] {
        let secret = ctx
            .tokens
            .issue(kind, user.id, Duration::hours(1), json!({}))
            .await
            .unwrap();

        // First consumption wins, every later presentation fails
        assert!(ctx.tokens.consume(kind, user.id, &secret).await.unwrap().is_some());
        assert!(ctx.tokens.consume(kind, user.id, &secret).await.unwrap().is_none());
        assert!(ctx.tokens.verify(kind, user.id, &secret).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn test_tokens_are_scoped_to_their_owner() {
    let ctx = TestContext::new();
    let alice = ctx.register_user("alice@example.com", "Password123!").await;
    let bob = ctx.register_user("bob@example.com", "Password123!").await;

    let secret = ctx
        .tokens
        .issue(TokenKind::Refresh, alice.id, Duration::days(30), json!({}))
        .await
        .unwrap();

    // Bob can never redeem Alice's secret, and trying does not burn it
    assert!(ctx
        .tokens
        .verify(TokenKind::Refresh, bob.id, &secret)
        .await
        .unwrap()
        .is_none());
    assert!(ctx
        .tokens
        .consume(TokenKind::Refresh, bob.id, &secret)
        .await
        .unwrap()
        .is_none());
    assert!(ctx
        .tokens
        .verify(TokenKind::Refresh, alice.id, &secret)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_tokens_are_scoped_to_their_kind() {
    let ctx = TestContext::new();
    let user = ctx.register_user("kinds@example.com", "Password123!").await;

    let secret = ctx
        .tokens
        .issue(TokenKind::EmailVerify, user.id, Duration::hours(1), json!({}))
        .await
        .unwrap();

    assert!(ctx
        .tokens
        .verify(TokenKind::PasswordReset, user.id, &secret)
        .await
        .unwrap()
        .is_none());
    assert!(ctx
        .tokens
        .verify(TokenKind::Refresh, user.id, &secret)
        .await
        .unwrap()
        .is_none());
    assert!(ctx
        .tokens
        .verify(TokenKind::EmailVerify, user.id, &secret)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_expired_token_always_fails() {
    let ctx = TestContext::new();
    let user = ctx.register_user("expiry@example.com", "Password123!").await;

    let secret = ctx
        .tokens
        .issue(TokenKind::Refresh, user.id, Duration::hours(1), json!({}))
        .await
        .unwrap();

    // Still fine just before expiry
    ctx.advance(Duration::minutes(59));
    assert!(ctx
        .tokens
        .verify(TokenKind::Refresh, user.id, &secret)
        .await
        .unwrap()
        .is_some());

    // Past expiry it fails without ever having been revoked
    ctx.advance(Duration::minutes(2));
    assert!(ctx
        .tokens
        .verify(TokenKind::Refresh, user.id, &secret)
        .await
        .unwrap()
        .is_none());
    assert!(ctx
        .tokens
        .consume(TokenKind::Refresh, user.id, &secret)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_garbage_secret_fails_like_any_other() {
    let ctx = TestContext::new();
    let user = ctx.register_user("garbage@example.com", "Password123!").await;

    // A secret that was never issued is just as invalid as an expired or
    // revoked one; the caller sees the same None in every case
    assert!(ctx
        .tokens
        .verify(TokenKind::Refresh, user.id, "never-issued-secret")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_revoke_is_idempotent() {
    let ctx = TestContext::new();
    let user = ctx.register_user("revoke@example.com", "Password123!").await;

    let secret = ctx
        .tokens
        .issue(TokenKind::Refresh, user.id, Duration::days(30), json!({}))
        .await
        .unwrap();
    let token = ctx
        .tokens
        .verify(TokenKind::Refresh, user.id, &secret)
        .await
        .unwrap()
        .unwrap();

    assert!(ctx.tokens.revoke(&token).await.unwrap());
    assert!(!ctx.tokens.revoke(&token).await.unwrap());
}

#[tokio::test]
async fn test_revoke_all_reports_affected_count() {
    let ctx = TestContext::new();
    let user = ctx.register_user("bulk@example.com", "Password123!").await;
    let other = ctx.register_user("other@example.com", "Password123!").await;

    let mine: Vec<String> = {
        let mut secrets = Vec::new();
        for _ in 0..3 {
            secrets.push(
                ctx.tokens
                    .issue(TokenKind::Refresh, user.id, Duration::days(30), json!({}))
                    .await
                    .unwrap(),
            );
        }
        secrets
    };
    let verify_secret = ctx
        .tokens
        .issue(TokenKind::EmailVerify, user.id, Duration::hours(1), json!({}))
        .await
        .unwrap();
    let theirs = ctx
        .tokens
        .issue(TokenKind::Refresh, other.id, Duration::days(30), json!({}))
        .await
        .unwrap();

    assert_eq!(ctx.tokens.revoke_all(user.id, TokenKind::Refresh).await.unwrap(), 3);
    assert_eq!(ctx.tokens.revoke_all(user.id, TokenKind::Refresh).await.unwrap(), 0);

    for secret in &mine {
        assert!(ctx
            .tokens
            .verify(TokenKind::Refresh, user.id, secret)
            .await
            .unwrap()
            .is_none());
    }

    // Other kinds and other owners are untouched
    assert!(ctx
        .tokens
        .verify(TokenKind::EmailVerify, user.id, &verify_secret)
        .await
        .unwrap()
        .is_some());
    assert!(ctx
        .tokens
        .verify(TokenKind::Refresh, other.id, &theirs)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_concurrent_consume_has_exactly_one_winner() {
    let ctx = TestContext::new();
    let user = ctx.register_user("race@example.com", "Password123!").await;

    let secret = ctx
        .tokens
        .issue(TokenKind::Refresh, user.id, Duration::days(30), json!({}))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let tokens = ctx.tokens.clone();
        let secret = secret.clone();
        let user_id = user.id;
        handles.push(tokio::spawn(async move {
            tokens
                .consume(TokenKind::Refresh, user_id, &secret)
                .await
                .unwrap()
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().is_some() {
            winners += 1;
        }
    }

    assert_eq!(winners, 1);
}
