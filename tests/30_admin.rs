mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::{questionnaire, questionnaire_with, TestServer};

#[tokio::test]
async fn admin_routes_check_token_before_role() -> Result<()> {
    let server = TestServer::spawn().await?;
    let user = server.register("plain@example.com", "secret1").await?;

    for path in ["/api/admin/responses", "/api/admin/stats"] {
        let (status, body) = server.get(path, None).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{path}");
        assert_eq!(body["error"], "Access denied. No token provided.");

        let (status, body) = server.get(path, Some(&user)).await?;
        assert_eq!(status, StatusCode::FORBIDDEN, "{path}");
        assert_eq!(body["error"], "Admin access required.");
    }
    Ok(())
}

#[tokio::test]
async fn list_is_newest_first_with_owner() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = server.create_admin().await?;

    let first = server.register("first@example.com", "secret1").await?;
    server.post("/api/responses", Some(&first), questionnaire()).await?;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = server.register("second@example.com", "secret1").await?;
    server
        .post(
            "/api/responses",
            Some(&second),
            questionnaire_with(json!({"companyName": "Health Plus", "industry": "healthcare"})),
        )
        .await?;

    let (status, body) = server.get("/api/admin/responses", Some(&admin)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["responses"][0]["email"], "second@example.com");
    assert_eq!(body["responses"][0]["owner"]["email"], "second@example.com");
    assert_eq!(body["responses"][0]["owner"]["role"], "user");
    assert_eq!(body["responses"][1]["email"], "first@example.com");

    let (_, filtered) = server
        .get("/api/admin/responses?industry=healthcare", Some(&admin))
        .await?;
    assert_eq!(filtered["count"], 1);

    let (_, searched) = server.get("/api/admin/responses?search=ACME", Some(&admin)).await?;
    assert_eq!(searched["count"], 1);
    assert_eq!(searched["responses"][0]["email"], "first@example.com");

    let (status, _) = server
        .get("/api/admin/responses?industry=technology", Some(&admin))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn delete_reopens_questionnaire_for_owner() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = server.create_admin().await?;
    let user = server.register("redo@example.com", "secret1").await?;

    let (_, created) = server.post("/api/responses", Some(&user), questionnaire()).await?;
    let id = created["responseId"].as_str().unwrap_or_default().to_string();

    let (status, body) = server.delete(&format!("/api/admin/responses/{id}"), Some(&admin)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Response deleted successfully");

    let (_, me) = server.get("/api/auth/me", Some(&user)).await?;
    assert_eq!(me["user"]["hasCompletedQuestionnaire"], false);

    let (status, _) = server.delete(&format!("/api/admin/responses/{id}"), Some(&admin)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = server.delete("/api/admin/responses/not-an-id", Some(&admin)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Response not found");

    let (status, _) = server.post("/api/responses", Some(&user), questionnaire()).await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
async fn stats_aggregate_current_data() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = server.create_admin().await?;

    let (status, body) = server.get("/api/admin/stats", Some(&admin)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["totalResponses"], 0);
    assert_eq!(body["stats"]["completionRate"], "0.00");

    let a = server.register("a@example.com", "secret1").await?;
    let b = server.register("b@example.com", "secret1").await?;
    server.register("c@example.com", "secret1").await?;
    server
        .post(
            "/api/responses",
            Some(&a),
            questionnaire_with(json!({"featureInterests": ["scheduling", "mobile-app"]})),
        )
        .await?;
    server
        .post(
            "/api/responses",
            Some(&b),
            questionnaire_with(json!({"featureInterests": [], "companySize": "500+", "industry": "education"})),
        )
        .await?;

    let (_, body) = server.get("/api/admin/stats", Some(&admin)).await?;
    let stats = &body["stats"];
    assert_eq!(stats["totalUsers"], 4);
    assert_eq!(stats["totalResponses"], 2);
    assert_eq!(stats["usersCompleted"], 2);
    assert_eq!(stats["completionRate"], "50.00");
    assert_eq!(
        stats["companySizeDistribution"],
        json!([{"_id": "1-10", "count": 1}, {"_id": "500+", "count": 1}])
    );
    assert_eq!(
        stats["industryDistribution"],
        json!([{"_id": "education", "count": 1}, {"_id": "retail", "count": 1}])
    );
    assert_eq!(
        stats["featurePopularity"],
        json!([{"_id": "mobile-app", "count": 1}, {"_id": "scheduling", "count": 1}])
    );
    Ok(())
}
