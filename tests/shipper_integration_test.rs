use httpmock::prelude::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sumoship::config::Config;
use sumoship::logs::failure::FailureSink;
use sumoship::logs::flusher::{FlushOutcome, Tick};
use sumoship::logs::sender::TransmissionError;
use sumoship::logs::shipper::Shipper;
use sumoship::transport::{SumoLogicTransport, Transport};

const FOO_AND_BAR: &str = "{\"level\":\"info\",\"message\":\"foo\",\"meta\":{\"extra\":\"something\"}}\n{\"level\":\"error\",\"message\":\"bar\",\"meta\":{\"something\":\"different\"}}\n";

fn config(server: &MockServer) -> Config {
    Config {
        url: server.url("/receiver/v1/http/token"),
        ..Config::default()
    }
}

fn log_foo_and_bar(transport: &SumoLogicTransport) {
    transport
        .log(
            "info",
            "foo",
            Some(serde_json::json!({"extra": "something"})),
        )
        .expect("failed to log foo");
    transport
        .log(
            "error",
            "bar",
            Some(serde_json::json!({"something": "different"})),
        )
        .expect("failed to log bar");
}

#[tokio::test]
async fn posts_ndjson_batch() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/receiver/v1/http/token")
                .header("Content-Type", "text/plain")
                .body(FOO_AND_BAR);
            then.status(200);
        })
        .await;

    let transport = SumoLogicTransport::new(Arc::new(config(&server)), FailureSink::Silent)
        .expect("failed to create transport");
    log_foo_and_bar(&transport);

    let shipper = transport.shipper();
    assert_eq!(shipper.tick(), Tick::Started(2));
    assert_eq!(shipper.last_flush().await, FlushOutcome::Sent(2));
    mock.assert_async().await;
    assert_eq!(shipper.pending_len(), 0);

    // Nothing queued, nothing sent
    assert_eq!(shipper.tick(), Tick::Empty);
    assert_eq!(mock.hits_async().await, 1);
}

#[tokio::test]
async fn sends_custom_source_headers() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .header("X-Sumo-Category", "category")
                .header("X-Sumo-Host", "host")
                .header("X-Sumo-Name", "name");
            then.status(200);
        })
        .await;

    let transport = SumoLogicTransport::new(
        Arc::new(Config {
            custom_source_category: Some("category".to_string()),
            custom_source_host: Some("host".to_string()),
            custom_source_name: Some("name".to_string()),
            ..config(&server)
        }),
        FailureSink::Silent,
    )
    .expect("failed to create transport");
    transport.log("info", "foo", None).expect("failed to log");

    assert_eq!(transport.shipper().tick(), Tick::Started(1));
    assert_eq!(
        transport.shipper().last_flush().await,
        FlushOutcome::Sent(1)
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn failed_push_reaches_handler_and_keeps_queue() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(500).body("\"Uh oh\"");
        })
        .await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let failure_sink = FailureSink::delegated(move |error: TransmissionError| {
        let recorder = Arc::clone(&recorder);
        async move {
            recorder
                .lock()
                .expect("lock poisoned")
                .push((error.status(), error.to_string()));
        }
    });

    let shipper = Shipper::new(Arc::new(config(&server)), failure_sink)
        .expect("failed to create shipper");
    shipper.enqueue("info", "foo", None).expect("failed to enqueue");

    assert_eq!(shipper.tick(), Tick::Started(1));
    assert_eq!(shipper.last_flush().await, FlushOutcome::Failed(1));
    mock.assert_async().await;

    let seen = seen.lock().expect("lock poisoned").clone();
    assert_eq!(
        seen,
        vec![(
            Some(reqwest::StatusCode::INTERNAL_SERVER_ERROR),
            "500 Internal Server Error: failed to push logs: \"Uh oh\"".to_string()
        )]
    );
    assert_eq!(shipper.pending_len(), 1);
}

#[tokio::test]
async fn unreachable_endpoint_is_a_request_error() {
    // Nothing listens on the discard port
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let failure_sink = FailureSink::delegated(move |error: TransmissionError| {
        let recorder = Arc::clone(&recorder);
        async move {
            let is_request = matches!(error, TransmissionError::Request(_));
            recorder.lock().expect("lock poisoned").push(is_request);
        }
    });

    let shipper = Shipper::new(
        Arc::new(Config {
            url: "http://127.0.0.1:9/logs".to_string(),
            ..Config::default()
        }),
        failure_sink,
    )
    .expect("failed to create shipper");
    shipper.enqueue("info", "foo", None).expect("failed to enqueue");

    assert_eq!(shipper.tick(), Tick::Started(1));
    assert_eq!(shipper.last_flush().await, FlushOutcome::Failed(1));
    assert_eq!(*seen.lock().expect("lock poisoned"), vec![true]);
    assert_eq!(shipper.pending_len(), 1);
}

#[tokio::test]
async fn timer_flushes_on_its_own() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).body(FOO_AND_BAR);
            then.status(200);
        })
        .await;

    let transport = SumoLogicTransport::new(
        Arc::new(Config {
            interval: 50,
            ..config(&server)
        }),
        FailureSink::Silent,
    )
    .expect("failed to create transport");
    log_foo_and_bar(&transport);

    let shipper = transport.shipper();
    tokio::time::timeout(Duration::from_secs(5), async {
        while shipper.pending_len() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timer never flushed");

    mock.assert_async().await;
    transport.close().await;
    assert!(!shipper.is_armed());
}

#[tokio::test]
async fn close_ships_leftovers() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).body(FOO_AND_BAR);
            then.status(200);
        })
        .await;

    let transport = SumoLogicTransport::new(
        Arc::new(Config {
            interval: 60_000,
            ..config(&server)
        }),
        FailureSink::Silent,
    )
    .expect("failed to create transport");
    log_foo_and_bar(&transport);

    transport.close().await;
    mock.assert_async().await;
    assert_eq!(transport.shipper().pending_len(), 0);
}
