mod common;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

use learnhub_access::types::PrincipalKind;

use common::{code, strings, TestWorld, ESCALATION_PASSWORD};

async fn escalate(world: &TestWorld, token: &str) -> Result<String> {
    let (status, body) = world
        .post("/auth/escalate", Some(token), json!({ "escalationPassword": ESCALATION_PASSWORD }))
        .await?;
    anyhow::ensure!(status == StatusCode::OK, "escalation failed: {} {}", status, body);
    body["data"]["adminToken"]
        .as_str()
        .map(str::to_string)
        .context("escalation response has no admin token")
}

#[tokio::test]
async fn escalate_use_and_deescalate() -> Result<()> {
    let world = TestWorld::start().await?;
    let token = world.token("admin").await?;

    let (status, body) = world
        .post("/auth/escalate", Some(&token), json!({ "escalationPassword": ESCALATION_PASSWORD }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(strings(&body["data"]["roles"]), vec!["system-admin"]);
    assert_eq!(strings(&body["data"]["accessRights"]), vec!["system:*"]);
    let admin_token = body["data"]["adminToken"].as_str().context("admin token")?.to_string();

    let (status, body) = world.get("/admin/session", Some(&token), Some(&admin_token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["userId"], json!(world.user("admin")));

    let (status, body) = world.post("/auth/deescalate", Some(&token), json!({})).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["revoked"], 1);

    let (status, body) = world.get("/admin/session", Some(&token), Some(&admin_token)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(code(&body), "ADMIN_SESSION_STALE");

    // the base session is untouched
    let (status, _) = world.get("/roles/me", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);

    // de-escalating again is harmless
    let (status, body) = world.post("/auth/deescalate", Some(&token), json!({})).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["revoked"], 0);
    Ok(())
}

#[tokio::test]
async fn global_admin_outside_master_cannot_escalate() -> Result<()> {
    let world = TestWorld::start().await?;
    let university = world.department("University");
    world
        .store
        .update_principal(world.user("support"), PrincipalKind::GlobalAdmin, |principal| {
            principal.record_mut().memberships[0].department_id = university;
        })
        .await;

    let data = world.login("support").await?;
    assert_eq!(data["session"]["canEscalateToAdmin"], false);

    let token = data["token"].as_str().context("login token")?;
    let (status, body) = world
        .post("/auth/escalate", Some(token), json!({ "escalationPassword": ESCALATION_PASSWORD }))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(code(&body), "ESCALATION_INELIGIBLE");
    Ok(())
}

#[tokio::test]
async fn non_admin_is_ineligible_whatever_the_password() -> Result<()> {
    let world = TestWorld::start().await?;
    let token = world.token("instructor").await?;

    for password in [ESCALATION_PASSWORD, "wrong"] {
        let (status, body) = world
            .post("/auth/escalate", Some(&token), json!({ "escalationPassword": password }))
            .await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(code(&body), "ESCALATION_INELIGIBLE");
    }
    Ok(())
}

#[tokio::test]
async fn wrong_escalation_password() -> Result<()> {
    let world = TestWorld::start().await?;
    let token = world.token("admin").await?;

    let (status, body) = world
        .post("/auth/escalate", Some(&token), json!({ "escalationPassword": "guess" }))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(code(&body), "INVALID_ESCALATION_PASSWORD");
    Ok(())
}

#[tokio::test]
async fn admin_routes_require_an_admin_token() -> Result<()> {
    let world = TestWorld::start().await?;
    let token = world.token("admin").await?;

    let (status, body) = world.get("/admin/session", Some(&token), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(code(&body), "ADMIN_TOKEN_REQUIRED");

    // a session token cannot stand in for an admin token
    let (status, body) = world.get("/admin/session", Some(&token), Some(&token)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(code(&body), "ADMIN_TOKEN_REQUIRED");

    // nor can an admin token be used without its session token
    let admin_token = escalate(&world, &token).await?;
    let (status, body) = world.get("/admin/session", None, Some(&admin_token)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(code(&body), "INVALID_SESSION_TOKEN");
    Ok(())
}

#[tokio::test]
async fn admin_token_is_bound_to_its_session() -> Result<()> {
    let world = TestWorld::start().await?;
    let first = world.token("admin").await?;
    let second = world.token("admin").await?;
    let admin_token = escalate(&world, &first).await?;

    let (status, body) = world.get("/admin/session", Some(&second), Some(&admin_token)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(code(&body), "ADMIN_TOKEN_REQUIRED");

    // ending the base session ends admin access with it
    world.post("/auth/logout", Some(&first), json!({})).await?;
    let (status, _) = world.get("/admin/session", Some(&first), Some(&admin_token)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn removing_global_admin_stales_outstanding_tokens() -> Result<()> {
    let world = TestWorld::start().await?;
    let token = world.token("admin").await?;
    let admin_token = escalate(&world, &token).await?;

    world
        .store
        .remove_principal(world.user("admin"), PrincipalKind::GlobalAdmin)
        .await;

    let (status, body) = world.get("/admin/session", Some(&token), Some(&admin_token)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(code(&body), "ADMIN_SESSION_STALE");
    Ok(())
}

#[tokio::test]
async fn catalog_reload_needs_system_admin() -> Result<()> {
    let world = TestWorld::start().await?;

    let support = world.token("support").await?;
    let support_admin = escalate(&world, &support).await?;
    let (status, body) = world
        .post_admin("/admin/roles/reload", &support, &support_admin)
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(code(&body), "INSUFFICIENT_ADMIN_ROLE");

    world
        .store
        .insert_role(learnhub_access::database::models::Role::new(
            "grader",
            PrincipalKind::Staff,
            ["grades:own-classes:manage"],
        ))
        .await;

    let token = world.token("admin").await?;
    let admin_token = escalate(&world, &token).await?;
    let (status, body): (StatusCode, Value) = world
        .post_admin("/admin/roles/reload", &token, &admin_token)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["roles"], 6);

    let (_, health) = world.get("/health", None, None).await?;
    assert_eq!(health["data"]["roles"], 6);
    Ok(())
}
