use rocket::{
    http::{ContentType, Status},
    local::asynchronous::Client,
};
use serde_json::{Value, json};
use spotcast_api::orm::testing::test_rocket;

async fn post_json(client: &Client, uri: String, body: Value) -> (Status, Value) {
    let response = client.post(uri).header(ContentType::JSON).body(body.to_string()).dispatch().await;
    let status = response.status();
    (status, response.into_json().await.unwrap_or(Value::Null))
}

#[rocket::async_test]
async fn test_status_endpoint() {
    let client = Client::tracked(test_rocket()).await.expect("valid rocket instance");
    let response = client.get("/api/status").dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["status"], "running");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["built"].is_string());
}

#[rocket::async_test]
async fn test_device_lifecycle() {
    let client = Client::tracked(test_rocket()).await.expect("valid rocket instance");

    let (status, device) = post_json(
        &client,
        "/api/devices".into(),
        json!({"name": "Airport Gate 4", "location": "Terminal B"}),
    )
    .await;
    assert_eq!(status, Status::Created);
    assert_eq!(device["name"], "Airport Gate 4");
    let id = device["id"].as_i64().unwrap();

    let (status, body) =
        post_json(&client, "/api/devices".into(), json!({"name": "Airport Gate 4"})).await;
    assert_eq!(status, Status::Conflict);
    assert!(body["error"].is_string());

    let (status, body) = post_json(&client, "/api/devices".into(), json!({"name": "  "})).await;
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["field"], "name");

    let response = client.get("/api/devices").dispatch().await;
    let devices: Value = response.into_json().await.unwrap();
    assert_eq!(devices.as_array().unwrap().len(), 1);

    let response = client.get(format!("/api/devices/{}", id)).dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let response = client.delete(format!("/api/devices/{}", id)).dispatch().await;
    assert_eq!(response.status(), Status::NoContent);
    let response = client.delete(format!("/api/devices/{}", id)).dispatch().await;
    assert_eq!(response.status(), Status::NotFound);
}

#[rocket::async_test]
async fn test_campaign_with_jingles() {
    let client = Client::tracked(test_rocket()).await.expect("valid rocket instance");

    let (status, campaign) =
        post_json(&client, "/api/campaigns".into(), json!({"name": "Autumn", "brand": "Brewery"}))
            .await;
    assert_eq!(status, Status::Created);
    let id = campaign["id"].as_i64().unwrap();

    let (status, jingle) = post_json(
        &client,
        format!("/api/campaigns/{}/jingles", id),
        json!({"title": "Hops", "filename": "hops.mp3", "durationSeconds": 15}),
    )
    .await;
    assert_eq!(status, Status::Created);
    assert_eq!(jingle["campaignId"], id);

    let (status, body) = post_json(
        &client,
        format!("/api/campaigns/{}/jingles", id),
        json!({"title": "Bad", "filename": "bad.mp3", "durationSeconds": 0}),
    )
    .await;
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["field"], "durationSeconds");

    let (status, _) = post_json(
        &client,
        "/api/campaigns/9999/jingles".into(),
        json!({"title": "Lost", "filename": "lost.mp3"}),
    )
    .await;
    assert_eq!(status, Status::NotFound);

    let response = client.get(format!("/api/campaigns/{}", id)).dispatch().await;
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["brand"], "Brewery");
    assert_eq!(body["jingles"].as_array().unwrap().len(), 1);
    assert_eq!(body["jingles"][0]["filename"], "hops.mp3");

    let response = client.get("/api/campaigns").dispatch().await;
    let all: Value = response.into_json().await.unwrap();
    assert_eq!(all.as_array().unwrap().len(), 1);

    let response = client.get("/api/campaigns/9999").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);
}

#[rocket::async_test]
async fn test_unknown_route_returns_json_error() {
    let client = Client::tracked(test_rocket()).await.expect("valid rocket instance");
    let response = client.get("/api/nowhere").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);

    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body, json!({"error": "Not Found", "path": "/api/nowhere", "status": 404}));
}
