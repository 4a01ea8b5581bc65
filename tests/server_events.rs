use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::net::TcpListener;

use turbidity_host::push::{EventDecoder, PushMessage};
use turbidity_host::relay::BroadcastRelay;
use turbidity_host::server::{self, HostState};
use turbidity_host::{SensorState, StatusReport, SENSOR_DATA_EVENT};

async fn start_server(relay: BroadcastRelay) -> (String, HostState) {
    let state = HostState::new(relay, "/dev/ttyACM0");
    let app = server::router(state.clone(), Path::new("no-such-static-dir"));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::run_server(listener, app, std::future::pending()));
    (format!("http://{}", addr), state)
}

async fn wait_for_viewers(relay: &BroadcastRelay, n: usize) {
    for _ in 0..200 {
        if relay.viewer_count() == n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {} viewers, have {}", n, relay.viewer_count());
}

async fn next_message<S, B>(body: &mut S, decoder: &mut EventDecoder, pending: &mut Vec<PushMessage>) -> PushMessage
where
    S: futures::Stream<Item = reqwest::Result<B>> + Unpin,
    B: AsRef<[u8]>,
{
    loop {
        if !pending.is_empty() {
            return pending.remove(0);
        }
        let chunk = tokio::time::timeout(Duration::from_secs(5), body.next())
            .await
            .expect("push message in time")
            .expect("stream open")
            .expect("chunk");
        pending.extend(decoder.feed(chunk.as_ref()));
    }
}

#[tokio::test]
async fn test_lines_are_pushed_as_sensor_data_events() {
    let relay = BroadcastRelay::new(16);
    let (base, _state) = start_server(relay.clone()).await;

    let response = reqwest::get(format!("{}/events", base)).await.unwrap();
    assert!(response.status().is_success());
    let content_type = response.headers()[reqwest::header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/event-stream"));

    wait_for_viewers(&relay, 1).await;
    relay.publish("Turbidity: 641".to_string());
    relay.publish("garbage".to_string());

    let mut body = response.bytes_stream();
    let mut decoder = EventDecoder::new();
    let mut pending = Vec::new();

    let first = next_message(&mut body, &mut decoder, &mut pending).await;
    assert_eq!(first.event, SENSOR_DATA_EVENT);
    assert_eq!(first.data, "Turbidity: 641");

    let second = next_message(&mut body, &mut decoder, &mut pending).await;
    assert_eq!(second.data, "garbage");
}

#[tokio::test]
async fn test_viewer_connecting_later_gets_no_backfill() {
    let relay = BroadcastRelay::new(16);
    let (base, _state) = start_server(relay.clone()).await;

    relay.publish("Turbidity: 1".to_string());

    let response = reqwest::get(format!("{}/events", base)).await.unwrap();
    wait_for_viewers(&relay, 1).await;
    relay.publish("Turbidity: 2".to_string());

    let mut body = response.bytes_stream();
    let mut decoder = EventDecoder::new();
    let mut pending = Vec::new();
    let message = next_message(&mut body, &mut decoder, &mut pending).await;
    assert_eq!(message.data, "Turbidity: 2");
}

#[tokio::test]
async fn test_status_reports_sensor_and_viewers() {
    let relay = BroadcastRelay::new(16);
    let (base, state) = start_server(relay.clone()).await;
    state.set_sensor(SensorState::Offline).await;

    let events = reqwest::get(format!("{}/events", base)).await.unwrap();
    wait_for_viewers(&relay, 1).await;
    relay.publish("Turbidity: 3".to_string());

    let status: StatusReport = reqwest::get(format!("{}/api/status", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status.sensor, SensorState::Offline);
    assert_eq!(status.port, "/dev/ttyACM0");
    assert_eq!(status.viewers, 1);
    assert_eq!(status.lines_relayed, 1);

    // closing the push connection leaves the relay; the server notices once
    // a write to the dead connection fails
    drop(events);
    for _ in 0..100 {
        if relay.viewer_count() == 0 {
            break;
        }
        relay.publish("ping".to_string());
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(relay.viewer_count(), 0);
}

#[tokio::test]
async fn test_missing_static_dir_serves_not_found() {
    let (base, _state) = start_server(BroadcastRelay::new(4)).await;
    let response = reqwest::get(format!("{}/index.html", base)).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}
