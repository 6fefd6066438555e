#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use roomrelay::gateway::transport::WsConnector;
use roomrelay::gateway::{GatewayConnection, RetryPolicy};
use roomrelay::middleware::auth::SessionUser;
use roomrelay::rooms::{generate_session_id, RoomRegistry, RoomService};
use roomrelay::routes;
use roomrelay::state::AppState;
use roomrelay::store::{Collection, MemoryStore, SessionStore};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("127.0.0.1:{}", addr.port())
}

// ---- fake broker ----------------------------------------------------------

#[derive(Clone)]
struct BrokerState {
    frames: mpsc::UnboundedSender<Vec<u8>>,
    connections: Arc<AtomicUsize>,
    kick: broadcast::Sender<()>,
}

async fn broker_upgrade(ws: WebSocketUpgrade, State(state): State<BrokerState>) -> Response {
    ws.on_upgrade(move |socket| broker_socket(socket, state))
}

async fn broker_socket(mut socket: WebSocket, state: BrokerState) {
    let mut kick = state.kick.subscribe();
    state.connections.fetch_add(1, Ordering::SeqCst);
    loop {
        tokio::select! {
            _ = kick.recv() => {
                let _ = socket.send(Message::Close(None)).await;
                return;
            }
            msg = socket.recv() => match msg {
                Some(Ok(Message::Binary(bytes))) => {
                    let _ = state.frames.send(bytes.to_vec());
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                _ => {}
            }
        }
    }
}

/// In-process stand-in for the broker's `/emitters` endpoint.
pub struct FakeBroker {
    pub url: String,
    frames: tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    connections: Arc<AtomicUsize>,
    kick: broadcast::Sender<()>,
}

impl FakeBroker {
    pub async fn spawn() -> Self {
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let (kick, _) = broadcast::channel(4);
        let connections = Arc::new(AtomicUsize::new(0));
        let state = BrokerState {
            frames: frames_tx,
            connections: connections.clone(),
            kick: kick.clone(),
        };
        let app = Router::new()
            .route("/emitters", get(broker_upgrade))
            .with_state(state);
        let addr = serve(app).await;

        Self {
            url: format!("ws://{addr}/emitters"),
            frames: tokio::sync::Mutex::new(frames_rx),
            connections,
            kick,
        }
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Close every open socket from the broker side.
    pub fn kick(&self) {
        let _ = self.kick.send(());
    }

    pub async fn next_frame(&self) -> Vec<u8> {
        let mut rx = self.frames.lock().await;
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for a frame")
            .expect("broker channel closed")
    }

    pub async fn next_json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.next_frame().await).expect("frame is not JSON")
    }

    pub async fn wait_for_connections(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(3), async {
            while self.connections() < n {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("broker never saw {n} connection(s)"));
    }
}

// ---- fake registry --------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryCall {
    pub op: String,
    pub room_id: String,
    pub session_id: Option<String>,
    pub authorization: Option<String>,
}

#[derive(Clone, Default)]
struct RegistryState {
    calls: Arc<Mutex<Vec<RegistryCall>>>,
    script: Arc<Mutex<VecDeque<u16>>>,
}

async fn registry_alter(
    State(state): State<RegistryState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> StatusCode {
    state.calls.lock().unwrap().push(RegistryCall {
        op: query.get("op").cloned().unwrap_or_default(),
        room_id: query.get("room_id").cloned().unwrap_or_default(),
        session_id: query.get("session_id").cloned(),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });
    let status = state.script.lock().unwrap().pop_front().unwrap_or(200);
    StatusCode::from_u16(status).unwrap()
}

/// Answers `/alter` with scripted status codes (200 once the script runs out)
/// and records every call.
pub struct FakeRegistry {
    pub base_url: String,
    state: RegistryState,
}

impl FakeRegistry {
    pub async fn spawn() -> Self {
        let state = RegistryState::default();
        let app = Router::new()
            .route("/alter", post(registry_alter))
            .with_state(state.clone());
        let addr = serve(app).await;
        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn respond_with(&self, statuses: impl IntoIterator<Item = u16>) {
        self.state.script.lock().unwrap().extend(statuses);
    }

    pub fn calls(&self) -> Vec<RegistryCall> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn client(&self) -> RoomRegistry {
        RoomRegistry::new(self.base_url.clone())
    }
}

// ---- full app -------------------------------------------------------------

pub fn test_policy() -> RetryPolicy {
    RetryPolicy {
        attempts: 3,
        delay: Duration::from_millis(50),
        staged_countdown: false,
    }
}

pub fn connection_to(url: &str) -> GatewayConnection {
    GatewayConnection::new(
        url,
        Arc::new(WsConnector::new()),
        test_policy(),
        Duration::from_millis(100),
    )
}

pub struct TestApp {
    pub broker: FakeBroker,
    pub registry: FakeRegistry,
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        let broker = FakeBroker::spawn().await;
        let registry = FakeRegistry::spawn().await;
        let store = Arc::new(MemoryStore::new());

        let gateway = connection_to(&broker.url);
        gateway.connect().await.expect("failed to reach fake broker");
        broker.wait_for_connections(1).await;

        let rooms = RoomService::new(registry.client(), store.clone());
        let state = AppState {
            gateway,
            rooms,
            store: store.clone(),
        };

        Self {
            broker,
            registry,
            store,
            state,
        }
    }

    pub fn router(&self) -> Router {
        routes::router(self.state.clone())
    }

    /// Store a login session and return the matching `Cookie` header value.
    pub async fn login(&self, user_id: &str, username: &str, avatar: Option<&str>) -> String {
        let session_id = generate_session_id();
        let user = SessionUser {
            id: user_id.to_string(),
            username: username.to_string(),
            avatar: avatar.map(str::to_string),
        };
        self.store
            .set(
                Collection::Sessions,
                &session_id,
                serde_json::to_string(&user).unwrap(),
            )
            .await
            .unwrap();
        format!("session={session_id}")
    }
}
