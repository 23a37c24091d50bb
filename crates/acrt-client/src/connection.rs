//! UDP connection to the Remote Telemetry server.
//!
//! [`AcUdpConnection`] owns the socket and a single receive-loop task. The
//! caller drives `connect`/`disconnect`; the loop drives the handshake reply
//! and steady-state transitions, decodes each datagram according to the
//! current state and data type, refreshes the matching snapshot and notifies
//! subscribers.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use acrt_protocol::{
    CarInfoRecord, HandshakeOperation, HandshakeRequest, HandshakeResponse, LapRecord,
};
use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{ClientConfig, DataType};
use crate::dispatch::{EventDispatcher, SubscriptionId, UpdateKind};
use crate::error::{ClientError, Result};
use crate::session::{CarSnapshot, LapSnapshot, SessionSnapshot};
use crate::state::{ConnectionState, ConnectionStats, StatsCounters};

/// State shared between the caller-facing handle and the receive loop.
struct Shared {
    data_type: DataType,
    state: watch::Sender<ConnectionState>,
    session: watch::Sender<SessionSnapshot>,
    lap: watch::Sender<LapSnapshot>,
    car: watch::Sender<CarSnapshot>,
    car_events: EventDispatcher<CarSnapshot>,
    lap_events: EventDispatcher<LapSnapshot>,
    counters: StatsCounters,
    last_error: Mutex<Option<Arc<ClientError>>>,
}

/// The running receive loop and the socket it reads from.
struct Worker {
    socket: Arc<UdpSocket>,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Remote Telemetry client for one server and one data stream.
///
/// All methods take `&self`; wrap the connection in an `Arc` to share it
/// between tasks.
pub struct AcUdpConnection {
    config: ClientConfig,
    endpoint: SocketAddr,
    shared: Arc<Shared>,
    worker: Mutex<Option<Worker>>,
}

impl AcUdpConnection {
    /// Create a disconnected client from a validated configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let endpoint = config.server_endpoint()?;

        let shared = Shared {
            data_type: config.data_type,
            state: watch::Sender::new(ConnectionState::Disconnected),
            session: watch::Sender::new(SessionSnapshot::default()),
            lap: watch::Sender::new(LapSnapshot::default()),
            car: watch::Sender::new(CarSnapshot::default()),
            car_events: EventDispatcher::new(UpdateKind::Car),
            lap_events: EventDispatcher::new(UpdateKind::Lap),
            counters: StatsCounters::default(),
            last_error: Mutex::new(None),
        };

        Ok(Self {
            config,
            endpoint,
            shared: Arc::new(shared),
            worker: Mutex::new(None),
        })
    }

    /// Client for `address` on the default server port.
    pub fn with_address(address: &str, data_type: DataType) -> Result<Self> {
        Self::new(ClientConfig::new(address, data_type))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn data_type(&self) -> DataType {
        self.shared.data_type
    }

    pub fn server_endpoint(&self) -> SocketAddr {
        self.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Receiver that observes every state transition.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    pub fn session(&self) -> SessionSnapshot {
        self.shared.session.borrow().clone()
    }

    pub fn lap(&self) -> LapSnapshot {
        self.shared.lap.borrow().clone()
    }

    pub fn car(&self) -> CarSnapshot {
        self.shared.car.borrow().clone()
    }

    pub fn stats(&self) -> ConnectionStats {
        self.shared.counters.snapshot()
    }

    /// The error that terminated the most recent receive loop, if any.
    pub fn last_error(&self) -> Option<Arc<ClientError>> {
        self.shared.last_error.lock().clone()
    }

    /// Register a subscriber for car updates. Only fires when the data type
    /// is [`DataType::CarInfo`].
    pub fn on_car_update<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&CarSnapshot) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.shared.car_events.subscribe(callback)
    }

    /// Register a subscriber for lap updates. Only fires when the data type
    /// is [`DataType::LapTime`].
    pub fn on_lap_update<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&LapSnapshot) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.shared.lap_events.subscribe(callback)
    }

    pub fn unsubscribe_car(&self, id: SubscriptionId) -> bool {
        self.shared.car_events.unsubscribe(id)
    }

    pub fn unsubscribe_lap(&self, id: SubscriptionId) -> bool {
        self.shared.lap_events.unsubscribe(id)
    }

    /// Open the socket, send the handshake and start the receive loop.
    ///
    /// Returns once the handshake request is sent; observe
    /// [`ConnectionState::Connected`] through [`Self::subscribe_state`]. A
    /// no-op unless the client is `Disconnected`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SocketFailure`] if the socket cannot be bound,
    /// connected or written; the client is left `Disconnected`.
    pub async fn connect(&self) -> Result<()> {
        let claimed = self.shared.state.send_if_modified(|state| {
            if state.is_disconnected() {
                *state = ConnectionState::Connecting;
                true
            } else {
                false
            }
        });
        if !claimed {
            debug!(state = %self.state(), "connect() ignored; client is not disconnected");
            return Ok(());
        }

        info!(endpoint = %self.endpoint, data_type = %self.shared.data_type, "Connecting to AC remote telemetry");
        *self.shared.last_error.lock() = None;

        let socket = match self.open_socket().await {
            Ok(socket) => socket,
            Err(e) => {
                error!(error = %e, endpoint = %self.endpoint, "Failed to start AC remote telemetry session");
                self.shared.state.send_replace(ConnectionState::Disconnected);
                return Err(e);
            }
        };

        self.start_receiving(socket).await;
        Ok(())
    }

    /// Hand a handshaking socket to a new receive loop, unless `disconnect()`
    /// ran while the handshake was being sent; that socket is signed off.
    async fn start_receiving(&self, socket: UdpSocket) {
        let superseded = {
            let mut worker = self.worker.lock();
            let awaiting = self.shared.state.send_if_modified(|state| {
                if *state == ConnectionState::Connecting {
                    *state = ConnectionState::AwaitingHandshakeReply;
                    true
                } else {
                    false
                }
            });

            if awaiting {
                let socket = Arc::new(socket);
                let (shutdown, shutdown_rx) = oneshot::channel();
                let subscribe_request = self.request(self.shared.data_type.handshake_operation());
                let handle = tokio::spawn(receive_loop(
                    Arc::clone(&self.shared),
                    Arc::clone(&socket),
                    shutdown_rx,
                    self.config.recv_buffer_size,
                    subscribe_request,
                ));
                *worker = Some(Worker {
                    socket,
                    shutdown,
                    handle,
                });
                None
            } else {
                Some(socket)
            }
        };

        match superseded {
            None => debug!(endpoint = %self.endpoint, "Handshake sent; awaiting reply"),
            Some(socket) => {
                debug!("connect() superseded by disconnect(); signing off");
                self.sign_off(&socket).await;
            }
        }
    }

    /// Sign off from the server and stop the receive loop.
    ///
    /// The disconnect request is best-effort: send failures are logged and
    /// swallowed. Calling this on a disconnected client does nothing.
    pub async fn disconnect(&self) {
        let began = self.shared.state.send_if_modified(|state| match state {
            ConnectionState::Disconnected | ConnectionState::Disconnecting => false,
            _ => {
                *state = ConnectionState::Disconnecting;
                true
            }
        });
        if !began {
            debug!("disconnect() ignored; client is not connected");
            return;
        }

        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            self.sign_off(&worker.socket).await;

            if worker.shutdown.send(()).is_err() {
                debug!("Receive loop had already stopped");
            }
            if let Err(e) = worker.handle.await {
                warn!(error = %e, "Receive loop task ended abnormally");
            }
        }

        self.shared.state.send_replace(ConnectionState::Disconnected);
        info!(endpoint = %self.endpoint, "Disconnected from AC remote telemetry");
    }

    /// Wait until the client is `Disconnected`, returning the error that
    /// ended the receive loop, if one did.
    ///
    /// Resolves immediately on a client that was never connected.
    pub async fn wait_closed(&self) -> Option<Arc<ClientError>> {
        let mut state = self.shared.state.subscribe();
        let closed = state
            .wait_for(ConnectionState::is_disconnected)
            .await
            .map(|_| ());
        if closed.is_err() {
            debug!("State channel closed while waiting for disconnect");
        }
        self.last_error()
    }

    /// Best-effort `Disconnect` request; failures are logged.
    async fn sign_off(&self, socket: &UdpSocket) {
        let request = self.request(HandshakeOperation::Disconnect);
        if let Err(e) = socket.send(&request.encode()).await {
            warn!(error = %e, "Failed to send AC disconnect request");
        }
    }

    fn request(&self, operation: HandshakeOperation) -> HandshakeRequest {
        HandshakeRequest::with_identity(operation, self.config.identifier, self.config.version)
    }

    async fn open_socket(&self) -> Result<UdpSocket> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .await
            .map_err(|e| ClientError::socket("binding local socket", e))?;
        socket
            .connect(self.endpoint)
            .await
            .map_err(|e| ClientError::socket("connecting to server", e))?;

        let request = self.request(HandshakeOperation::Connect);
        socket
            .send(&request.encode())
            .await
            .map_err(|e| ClientError::socket("sending handshake", e))?;
        Ok(socket)
    }
}

impl Drop for AcUdpConnection {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.get_mut().take() {
            worker.handle.abort();
        }
    }
}

impl std::fmt::Debug for AcUdpConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcUdpConnection")
            .field("endpoint", &self.endpoint)
            .field("data_type", &self.shared.data_type)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

async fn receive_loop(
    shared: Arc<Shared>,
    socket: Arc<UdpSocket>,
    mut shutdown: oneshot::Receiver<()>,
    buffer_size: usize,
    subscribe_request: HandshakeRequest,
) {
    let mut buf = vec![0u8; buffer_size];

    loop {
        let received = tokio::select! {
            _ = &mut shutdown => {
                debug!("Receive loop stopping");
                return;
            }
            received = socket.recv(&mut buf) => received,
        };

        let result = match received {
            Ok(len) => {
                let datagram = buf.get(..len).unwrap_or_default();
                shared.handle_datagram(&socket, datagram, subscribe_request).await
            }
            Err(e) => Err(ClientError::socket("receiving datagram", e)),
        };

        match result {
            Ok(()) => {}
            Err(e) if e.is_fatal() => {
                error!(error = %e, "AC remote telemetry receive loop terminated");
                *shared.last_error.lock() = Some(Arc::new(e));
                shared.state.send_replace(ConnectionState::Disconnected);
                return;
            }
            Err(e) => {
                shared.counters.record_malformed();
                warn!(error = %e, "Dropping AC telemetry datagram");
            }
        }
    }
}

impl Shared {
    async fn handle_datagram(
        &self,
        socket: &UdpSocket,
        datagram: &[u8],
        subscribe_request: HandshakeRequest,
    ) -> Result<()> {
        self.counters.record_received();

        let state = *self.state.borrow();
        match state {
            ConnectionState::AwaitingHandshakeReply => {
                self.complete_handshake(socket, datagram, subscribe_request)
                    .await
            }
            ConnectionState::Connected => self.process_update(datagram),
            other => {
                self.counters.record_ignored();
                debug!(state = %other, len = datagram.len(), "Ignoring datagram outside an active session");
                Ok(())
            }
        }
    }

    async fn complete_handshake(
        &self,
        socket: &UdpSocket,
        datagram: &[u8],
        subscribe_request: HandshakeRequest,
    ) -> Result<()> {
        let response = HandshakeResponse::decode(datagram)?;
        self.counters.record_decoded();
        self.session.send_modify(|session| session.apply(&response));

        socket
            .send(&subscribe_request.encode())
            .await
            .map_err(|e| ClientError::socket("sending data subscription", e))?;

        let connected = self.state.send_if_modified(|state| {
            if *state == ConnectionState::AwaitingHandshakeReply {
                *state = ConnectionState::Connected;
                true
            } else {
                false
            }
        });

        if connected {
            let session = self.session.borrow().clone();
            info!(
                driver = %session.driver_name,
                car = %session.car_name,
                track = %session.track_name,
                layout = %session.track_layout,
                data_type = %self.data_type,
                "AC remote telemetry connected"
            );
        }
        Ok(())
    }

    fn process_update(&self, datagram: &[u8]) -> Result<()> {
        let (kind, report) = match self.data_type {
            DataType::CarInfo => {
                let record = CarInfoRecord::decode(datagram)?;
                self.counters.record_decoded();
                self.car.send_modify(|car| car.apply(&record));
                let snapshot = self.car.borrow().clone();
                (self.car_events.kind(), self.car_events.notify(&snapshot))
            }
            DataType::LapTime => {
                let record = LapRecord::decode(datagram)?;
                self.counters.record_decoded();
                self.lap.send_modify(|lap| lap.apply(&record));
                let snapshot = self.lap.borrow().clone();
                debug!(
                    lap = snapshot.lap_number,
                    time_ms = snapshot.lap_time.as_millis(),
                    "Lap completed"
                );
                (self.lap_events.kind(), self.lap_events.notify(&snapshot))
            }
        };
        self.counters.record_dispatch(report);
        if report.failed > 0 {
            debug!(
                kind = %kind,
                attempted = report.attempted(),
                failed = report.failed,
                "Update dispatched with subscriber failures"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    async fn recv_request(server: &UdpSocket) -> std::result::Result<HandshakeRequest, Box<dyn std::error::Error>> {
        let mut buf = [0u8; 64];
        let (len, _) = tokio::time::timeout(Duration::from_secs(5), server.recv_from(&mut buf)).await??;
        let datagram = buf.get(..len).ok_or("datagram larger than buffer")?;
        Ok(HandshakeRequest::decode(datagram)?)
    }

    async fn handshake_socket(server: &UdpSocket) -> std::result::Result<UdpSocket, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("127.0.0.1:0").await?;
        socket.connect(server.local_addr()?).await?;
        Ok(socket)
    }

    #[test]
    fn test_new_rejects_non_ipv4_address() {
        let result = AcUdpConnection::with_address("not-an-address", DataType::CarInfo);
        assert!(matches!(result, Err(ClientError::InvalidAddress { .. })));

        let result = AcUdpConnection::with_address("::1", DataType::CarInfo);
        assert!(matches!(result, Err(ClientError::InvalidAddress { .. })));
    }

    #[test]
    fn test_new_client_is_disconnected_with_placeholders() -> TestResult {
        let client = AcUdpConnection::with_address("192.168.1.20", DataType::LapTime)?;
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(!client.is_connected());
        assert_eq!(client.data_type(), DataType::LapTime);
        assert_eq!(client.server_endpoint().to_string(), "192.168.1.20:9996");
        assert_eq!(client.session(), SessionSnapshot::default());
        assert_eq!(client.stats(), ConnectionStats::default());
        assert!(client.last_error().is_none());
        Ok(())
    }

    #[test]
    fn test_subscription_management() -> TestResult {
        let client = AcUdpConnection::with_address("127.0.0.1", DataType::CarInfo)?;
        let car = client.on_car_update(|_| Ok(()));
        let lap = client.on_lap_update(|_| Ok(()));

        assert!(client.unsubscribe_car(car));
        assert!(!client.unsubscribe_car(car));
        assert!(client.unsubscribe_lap(lap));
        assert!(!client.unsubscribe_lap(lap));
        Ok(())
    }

    #[tokio::test]
    async fn test_datagrams_outside_active_session_are_ignored() -> TestResult {
        let client = AcUdpConnection::with_address("127.0.0.1", DataType::CarInfo)?;
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let calls = Arc::clone(&calls);
            client.on_car_update(move |_| {
                calls.fetch_add(1, Ordering::Relaxed);
                Ok(())
            });
        }

        let socket = UdpSocket::bind("127.0.0.1:0").await?;
        let record = CarInfoRecord {
            speed_kmh: 99.0,
            ..CarInfoRecord::default()
        }
        .encode();
        let subscribe = HandshakeRequest::new(HandshakeOperation::RequestCarInfo);

        let states = [
            ConnectionState::Connecting,
            ConnectionState::Disconnecting,
            ConnectionState::Disconnected,
        ];
        for (seen, state) in (1u64..).zip(states) {
            client.shared.state.send_replace(state);
            client
                .shared
                .handle_datagram(&socket, &record, subscribe)
                .await?;

            let stats = client.stats();
            assert_eq!(stats.datagrams_received, seen, "{state}");
            assert_eq!(stats.ignored_datagrams, seen, "{state}");
            assert_eq!(stats.datagrams_decoded, 0, "{state}");
            assert_eq!(stats.events_dispatched, 0, "{state}");
            assert_eq!(client.car(), CarSnapshot::default(), "{state}");
            assert_eq!(client.state(), state);
        }
        assert_eq!(calls.load(Ordering::Relaxed), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_connect_overtaken_by_disconnect_signs_off() -> TestResult {
        let server = UdpSocket::bind("127.0.0.1:0").await?;
        let port = server.local_addr()?.port();
        let client = AcUdpConnection::new(ClientConfig::new("127.0.0.1", DataType::LapTime).with_port(port))?;

        // disconnect() has already run while the handshake socket was opening.
        client.start_receiving(handshake_socket(&server).await?).await;

        let request = recv_request(&server).await?;
        assert_eq!(request.operation, HandshakeOperation::Disconnect);
        assert!(client.worker.lock().is_none());
        assert_eq!(client.state(), ConnectionState::Disconnected);
        Ok(())
    }

    #[tokio::test]
    async fn test_connecting_socket_starts_receive_loop() -> TestResult {
        let server = UdpSocket::bind("127.0.0.1:0").await?;
        let port = server.local_addr()?.port();
        let client = AcUdpConnection::new(ClientConfig::new("127.0.0.1", DataType::LapTime).with_port(port))?;

        client.shared.state.send_replace(ConnectionState::Connecting);
        client.start_receiving(handshake_socket(&server).await?).await;
        assert_eq!(client.state(), ConnectionState::AwaitingHandshakeReply);
        assert!(client.worker.lock().is_some());

        client.disconnect().await;
        let request = recv_request(&server).await?;
        assert_eq!(request.operation, HandshakeOperation::Disconnect);
        assert!(client.worker.lock().is_none());
        assert_eq!(client.state(), ConnectionState::Disconnected);
        Ok(())
    }

    #[tokio::test]
    async fn test_disconnect_when_never_connected_is_noop() -> TestResult {
        let client = AcUdpConnection::with_address("127.0.0.1", DataType::CarInfo)?;
        client.disconnect().await;
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(client.wait_closed().await.is_none());
        Ok(())
    }
}
