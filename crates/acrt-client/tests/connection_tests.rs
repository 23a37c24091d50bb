//! End-to-end scenarios against a fake Remote Telemetry server on loopback.

use std::error::Error;
use std::net::SocketAddr;
use std::time::Duration;

use acrt_client::{
    AcUdpConnection, CarSnapshot, ClientConfig, ClientError, ConnectionState, DataType,
    LapSnapshot,
};
use acrt_protocol::{
    CarInfoRecord, HandshakeOperation, HandshakeRequest, HandshakeResponse, LapRecord,
    SERVER_STATUS_OK,
};
use tokio::net::UdpSocket;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time::{sleep, timeout};

type TestResult = Result<(), Box<dyn Error>>;

const STEP: Duration = Duration::from_secs(5);
const SETTLE: Duration = Duration::from_millis(100);

fn handshake_response() -> HandshakeResponse {
    HandshakeResponse {
        car_name: "ks_ferrari_488_gt3%1x".to_string(),
        driver_name: "Player%".to_string(),
        identifier: SERVER_STATUS_OK,
        version: 1,
        track_name: "monza%".to_string(),
        track_config: "%".to_string(),
    }
}

fn client_for(server: &UdpSocket, data_type: DataType) -> Result<AcUdpConnection, Box<dyn Error>> {
    let port = server.local_addr()?.port();
    let config = ClientConfig::new("127.0.0.1", data_type).with_port(port);
    Ok(AcUdpConnection::new(config)?)
}

async fn recv_request(server: &UdpSocket) -> Result<(HandshakeRequest, SocketAddr), Box<dyn Error>> {
    let mut buf = [0u8; 64];
    let (len, source) = timeout(STEP, server.recv_from(&mut buf)).await??;
    let datagram = buf.get(..len).ok_or("datagram larger than buffer")?;
    Ok((HandshakeRequest::decode(datagram)?, source))
}

/// Drive the client through `Connecting → AwaitingHandshakeReply → Connected`
/// and return the client's address as seen by the server.
async fn complete_handshake(
    server: &UdpSocket,
    client: &AcUdpConnection,
) -> Result<SocketAddr, Box<dyn Error>> {
    let mut states = client.subscribe_state();
    client.connect().await?;

    let (request, source) = recv_request(server).await?;
    assert_eq!(request.operation, HandshakeOperation::Connect);
    assert_eq!(request.identifier, 1);
    assert_eq!(request.version, 1);

    server.send_to(&handshake_response().encode(), source).await?;

    let (request, subscriber) = recv_request(server).await?;
    assert_eq!(subscriber, source);
    assert_eq!(request.operation, client.data_type().handshake_operation());

    let state = *timeout(STEP, states.wait_for(ConnectionState::is_connected)).await??;
    assert_eq!(state, ConnectionState::Connected);
    Ok(source)
}

async fn wait_until<F>(mut condition: F) -> Result<(), Box<dyn Error>>
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + STEP;
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            return Err("condition not reached before deadline".into());
        }
        sleep(Duration::from_millis(10)).await;
    }
    Ok(())
}

#[tokio::test]
async fn test_car_info_session_receives_one_event_per_record() -> TestResult {
    let server = UdpSocket::bind("127.0.0.1:0").await?;
    let client = client_for(&server, DataType::CarInfo)?;

    let (tx, mut rx) = mpsc::unbounded_channel::<CarSnapshot>();
    client.on_car_update(move |car| {
        tx.send(car.clone())?;
        Ok(())
    });

    let source = complete_handshake(&server, &client).await?;

    let session = client.session();
    assert_eq!(session.car_name, "ks_ferrari_488_gt3");
    assert_eq!(session.driver_name, "Player");
    assert_eq!(session.track_name, "monza");
    assert_eq!(session.track_layout, "");

    let record = CarInfoRecord {
        speed_kmh: 123.4,
        gear: 3,
        engine_rpm: 7_250.0,
        lap_count: 2,
        lap_time: 41_000,
        ..CarInfoRecord::default()
    };
    server.send_to(&record.encode(), source).await?;

    let car = timeout(STEP, rx.recv()).await?.ok_or("car channel closed")?;
    assert!((car.speed_kph - 123.4).abs() < 1e-4);
    assert_eq!(car.gear, 3);
    assert_eq!(car.lap_number, 2);
    assert_eq!(car.current_lap_time, Duration::from_millis(41_000));
    assert!((car.max_engine_rpm() - 7_250.0).abs() < f32::EPSILON);

    let snapshot = client.car();
    assert!((snapshot.speed_kph - 123.4).abs() < 1e-4);
    assert_eq!(snapshot.gear, 3);

    sleep(SETTLE).await;
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

    let stats = client.stats();
    assert_eq!(stats.datagrams_received, 2);
    assert_eq!(stats.datagrams_decoded, 2);
    assert_eq!(stats.events_dispatched, 1);

    client.disconnect().await;
    Ok(())
}

#[tokio::test]
async fn test_malformed_lap_datagram_is_dropped() -> TestResult {
    let server = UdpSocket::bind("127.0.0.1:0").await?;
    let client = client_for(&server, DataType::LapTime)?;

    let (tx, mut rx) = mpsc::unbounded_channel::<LapSnapshot>();
    client.on_lap_update(move |lap| {
        tx.send(lap.clone())?;
        Ok(())
    });

    let source = complete_handshake(&server, &client).await?;

    server.send_to(&[0u8; 10], source).await?;
    wait_until(|| client.stats().datagrams_received >= 2).await?;

    assert_eq!(client.stats().malformed_datagrams, 1);
    assert_eq!(client.lap(), LapSnapshot::default());
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(client.state(), ConnectionState::Connected);

    // The loop keeps going after the bad datagram.
    let record = LapRecord {
        car_identifier_number: 0,
        lap: 4,
        driver_name: "Player%".to_string(),
        car_name: "ks_ferrari_488_gt3%".to_string(),
        time_ms: 105_320,
    };
    server.send_to(&record.encode(), source).await?;

    let lap = timeout(STEP, rx.recv()).await?.ok_or("lap channel closed")?;
    assert_eq!(lap.lap_number, 4);
    assert_eq!(lap.driver_name, "Player");
    assert_eq!(lap.lap_time, Duration::from_millis(105_320));
    assert_eq!(client.lap(), lap);

    client.disconnect().await;
    Ok(())
}

#[tokio::test]
async fn test_disconnect_signs_off_and_is_idempotent() -> TestResult {
    let server = UdpSocket::bind("127.0.0.1:0").await?;
    let client = client_for(&server, DataType::CarInfo)?;
    let source = complete_handshake(&server, &client).await?;

    client.disconnect().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);

    let (request, from) = recv_request(&server).await?;
    assert_eq!(from, source);
    assert_eq!(request.operation, HandshakeOperation::Disconnect);

    let before = client.stats();
    let late = CarInfoRecord {
        speed_kmh: 50.0,
        ..CarInfoRecord::default()
    };
    server.send_to(&late.encode(), source).await?;
    sleep(SETTLE).await;
    assert_eq!(client.stats(), before);
    assert_eq!(client.car(), CarSnapshot::default());

    client.disconnect().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
    if let Ok(extra) = timeout(SETTLE, recv_request(&server)).await {
        return Err(format!("second disconnect sent a request: {extra:?}").into());
    }

    assert!(client.wait_closed().await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_disconnect_before_handshake_reply_signs_off() -> TestResult {
    let server = UdpSocket::bind("127.0.0.1:0").await?;
    let client = client_for(&server, DataType::CarInfo)?;

    client.connect().await?;
    let (request, source) = recv_request(&server).await?;
    assert_eq!(request.operation, HandshakeOperation::Connect);
    assert_eq!(client.state(), ConnectionState::AwaitingHandshakeReply);

    client.disconnect().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);

    let (request, from) = recv_request(&server).await?;
    assert_eq!(from, source);
    assert_eq!(request.operation, HandshakeOperation::Disconnect);

    // A reply arriving after sign-off never completes the handshake.
    server.send_to(&handshake_response().encode(), source).await?;
    sleep(SETTLE).await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(client.stats().datagrams_received, 0);
    assert!(client.wait_closed().await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_connect_is_noop_while_active_and_reconnects_after_disconnect() -> TestResult {
    let server = UdpSocket::bind("127.0.0.1:0").await?;
    let client = client_for(&server, DataType::LapTime)?;
    complete_handshake(&server, &client).await?;

    client.connect().await?;
    if let Ok(extra) = timeout(SETTLE, recv_request(&server)).await {
        return Err(format!("connect while connected sent a request: {extra:?}").into());
    }

    client.disconnect().await;
    let (request, _) = recv_request(&server).await?;
    assert_eq!(request.operation, HandshakeOperation::Disconnect);

    complete_handshake(&server, &client).await?;
    assert!(client.is_connected());

    client.disconnect().await;
    Ok(())
}

#[tokio::test]
async fn test_failing_subscribers_do_not_stop_delivery() -> TestResult {
    let server = UdpSocket::bind("127.0.0.1:0").await?;
    let client = client_for(&server, DataType::CarInfo)?;

    client.on_car_update(|_| Err(anyhow::anyhow!("dashboard unavailable")));
    client.on_car_update(|_| -> anyhow::Result<()> {
        std::panic::panic_any("subscriber bug")
    });
    let (tx, mut rx) = mpsc::unbounded_channel::<i32>();
    client.on_car_update(move |car| {
        tx.send(car.gear)?;
        Ok(())
    });

    let source = complete_handshake(&server, &client).await?;

    for gear in [2, 3] {
        let record = CarInfoRecord {
            gear,
            ..CarInfoRecord::default()
        };
        server.send_to(&record.encode(), source).await?;
        let seen = timeout(STEP, rx.recv()).await?.ok_or("gear channel closed")?;
        assert_eq!(seen, gear);
    }

    let stats = client.stats();
    assert_eq!(stats.events_dispatched, 2);
    assert_eq!(stats.subscriber_failures, 4);
    assert_eq!(client.state(), ConnectionState::Connected);

    client.disconnect().await;
    Ok(())
}

#[tokio::test]
async fn test_unsubscribed_callback_is_not_invoked() -> TestResult {
    let server = UdpSocket::bind("127.0.0.1:0").await?;
    let client = client_for(&server, DataType::CarInfo)?;

    let (removed_tx, mut removed_rx) = mpsc::unbounded_channel::<()>();
    let removed = client.on_car_update(move |_| {
        removed_tx.send(())?;
        Ok(())
    });
    let (kept_tx, mut kept_rx) = mpsc::unbounded_channel::<()>();
    client.on_car_update(move |_| {
        kept_tx.send(())?;
        Ok(())
    });
    assert!(client.unsubscribe_car(removed));

    let source = complete_handshake(&server, &client).await?;
    server
        .send_to(&CarInfoRecord::default().encode(), source)
        .await?;

    timeout(STEP, kept_rx.recv()).await?.ok_or("kept channel closed")?;
    assert!(matches!(
        removed_rx.try_recv(),
        Err(TryRecvError::Disconnected)
    ));

    client.disconnect().await;
    Ok(())
}

#[tokio::test]
async fn test_unreachable_server_surfaces_socket_failure() -> TestResult {
    let port = {
        let placeholder = UdpSocket::bind("127.0.0.1:0").await?;
        placeholder.local_addr()?.port()
    };
    let client = AcUdpConnection::new(ClientConfig::new("127.0.0.1", DataType::CarInfo).with_port(port))?;

    client.connect().await?;
    let error = timeout(STEP, client.wait_closed())
        .await?
        .ok_or("receive loop ended without an error")?;

    assert!(matches!(*error, ClientError::SocketFailure { .. }));
    assert!(error.is_fatal());
    assert_eq!(client.state(), ConnectionState::Disconnected);

    // A second disconnect after the loop died is still harmless.
    client.disconnect().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
    Ok(())
}
