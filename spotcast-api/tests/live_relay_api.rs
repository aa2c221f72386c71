use std::sync::Arc;

use rocket::{
    http::{ContentType, Status},
    local::asynchronous::Client,
};
use serde_json::{Value, json};
use spotcast_api::events::{PlaybackEvent, PlaybackHub};
use spotcast_api::live_playback::LivePlaybackTracker;
use spotcast_api::orm::testing::test_rocket;

async fn create_device(client: &Client, name: &str) -> i64 {
    let response = client
        .post("/api/devices")
        .header(ContentType::JSON)
        .body(json!({"name": name}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);
    let body: Value = response.into_json().await.unwrap();
    body["id"].as_i64().unwrap()
}

async fn report(client: &Client, device_id: i64, body: Value) -> (Status, Value) {
    let response = client
        .post(format!("/api/live-relay/device/{}/playback", device_id))
        .header(ContentType::JSON)
        .body(body.to_string())
        .dispatch()
        .await;
    let status = response.status();
    (status, response.into_json().await.unwrap_or(Value::Null))
}

#[rocket::async_test]
async fn test_state_before_any_report() {
    let client = Client::tracked(test_rocket()).await.expect("valid rocket instance");
    let device_id = create_device(&client, "Quiet").await;

    let response =
        client.get(format!("/api/live-relay/device/{}/state", device_id)).dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["deviceId"], device_id);
    assert_eq!(body["active"], false);
    assert_eq!(body["stale"], false);
    assert_eq!(body["state"], Value::Null);
}

#[rocket::async_test]
async fn test_report_then_read_state() {
    let client = Client::tracked(test_rocket()).await.expect("valid rocket instance");
    let device_id = create_device(&client, "Lobby").await;

    let (status, state) =
        report(&client, device_id, json!({"jingleId": 7, "positionMs": 12500, "isPlaying": true}))
            .await;
    assert_eq!(status, Status::Ok);
    assert_eq!(state["currentJingleId"], 7);
    assert_eq!(state["positionMs"], 12500);

    let response =
        client.get(format!("/api/live-relay/device/{}/state", device_id)).dispatch().await;
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["active"], true);
    assert_eq!(body["stale"], false);
    assert_eq!(body["state"]["currentJingleId"], 7);
    assert_eq!(body["state"]["isPlaying"], true);
}

#[rocket::async_test]
async fn test_report_accepts_older_field_names() {
    let client = Client::tracked(test_rocket()).await.expect("valid rocket instance");
    let device_id = create_device(&client, "Legacy").await;

    let (status, state) =
        report(&client, device_id, json!({"currentJingle": 3, "position": 900, "isPlaying": false}))
            .await;
    assert_eq!(status, Status::Ok);
    assert_eq!(state["currentJingleId"], 3);
    assert_eq!(state["positionMs"], 900);
    assert_eq!(state["isPlaying"], false);
}

#[rocket::async_test]
async fn test_report_is_broadcast_as_status() {
    let client = Client::tracked(test_rocket()).await.expect("valid rocket instance");
    let device_id = create_device(&client, "Hall").await;
    let hub = client.rocket().state::<Arc<PlaybackHub>>().expect("hub is managed").clone();
    let mut rx = hub.subscribe();

    report(&client, device_id, json!({"jingleId": 5, "positionMs": 40, "isPlaying": true})).await;

    let event = rx.recv().await.unwrap();
    assert_eq!(event.name(), "playback:status");
    let payload = serde_json::to_value(&event).unwrap();
    assert_eq!(payload, json!({
        "deviceId": device_id,
        "currentJingle": 5,
        "position": 40,
        "isPlaying": true
    }));
}

#[rocket::async_test]
async fn test_unknown_device_is_not_found() {
    let client = Client::tracked(test_rocket()).await.expect("valid rocket instance");

    let (status, _) = report(&client, 999, json!({"jingleId": 1, "isPlaying": true})).await;
    assert_eq!(status, Status::NotFound);

    let response = client.get("/api/live-relay/device/999/state").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);

    let response = client.post("/api/live-relay/device/999/live-stream").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);
}

#[rocket::async_test]
async fn test_live_stream_times_out_with_last_state() {
    let client = Client::tracked(test_rocket()).await.expect("valid rocket instance");
    let device_id = create_device(&client, "Silent").await;
    report(&client, device_id, json!({"jingleId": 2, "positionMs": 10, "isPlaying": true})).await;

    let response =
        client.post(format!("/api/live-relay/device/{}/live-stream", device_id)).dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["stale"], true);
    assert_eq!(body["state"]["currentJingleId"], 2);
    assert!(body["timeout"].as_str().unwrap().contains("did not report"));
}

#[rocket::async_test]
async fn test_live_stream_returns_fresh_report() {
    let client = Client::tracked(test_rocket()).await.expect("valid rocket instance");
    let device_id = create_device(&client, "Responsive").await;
    let hub = client.rocket().state::<Arc<PlaybackHub>>().expect("hub is managed").clone();
    let mut rx = hub.subscribe();

    let request = async {
        client
            .post(format!("/api/live-relay/device/{}/live-stream", device_id))
            .dispatch()
            .await
            .into_json::<Value>()
            .await
            .unwrap()
    };
    let device = async {
        loop {
            if let PlaybackEvent::LiveRequest(req) = rx.recv().await.unwrap() {
                assert_eq!(req.device_id as i64, device_id);
                break;
            }
        }
        report(&client, device_id, json!({"jingleId": 11, "positionMs": 300, "isPlaying": true}))
            .await
    };

    let (body, (status, _)) = rocket::tokio::join!(request, device);
    assert_eq!(status, Status::Ok);
    assert_eq!(body["active"], true);
    assert_eq!(body["stale"], false);
    assert_eq!(body["state"]["currentJingleId"], 11);
    assert!(body.get("timeout").is_none());
}

#[rocket::async_test]
async fn test_decommission_drops_live_state() {
    let client = Client::tracked(test_rocket()).await.expect("valid rocket instance");
    let device_id = create_device(&client, "Retired").await;
    let (status, _) =
        report(&client, device_id, json!({"jingleId": 2, "positionMs": 100, "isPlaying": true}))
            .await;
    assert_eq!(status, Status::Ok);

    let tracker = client.rocket().state::<LivePlaybackTracker>().expect("tracker is managed");
    assert!(tracker.last_report(device_id as i32).is_some());

    let response = client.delete(format!("/api/devices/{}", device_id)).dispatch().await;
    assert_eq!(response.status(), Status::NoContent);
    assert!(tracker.last_report(device_id as i32).is_none());
}
