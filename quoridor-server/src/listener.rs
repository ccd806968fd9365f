//! 网络监听与连接处理
//!
//! 每个连接一个读任务和一个写任务，消息统一经 [`MessageHandler`] 处理。

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use protocol::{
    ClientMessage, Connection, ErrorCode, Listener, ProtocolError, ServerMessage, TcpConnection,
    TcpListener, HEARTBEAT_TIMEOUT, MAX_CONNECTIONS,
};

use crate::server::{MessageHandler, ServerState};

/// 共享的服务器状态
pub type SharedState = Arc<Mutex<ServerState>>;

/// 每个连接的发送队列长度
const OUTBOUND_QUEUE: usize = 64;

/// 对局通道服务器
pub struct Server {
    listener: TcpListener,
    state: SharedState,
}

impl Server {
    /// 绑定地址
    pub async fn bind(addr: &str, state: ServerState) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("无法监听地址: {}", addr))?;
        Ok(Self {
            listener,
            state: Arc::new(Mutex::new(state)),
        })
    }

    pub fn local_addr(&self) -> Option<String> {
        self.listener.local_addr()
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    /// 接受连接直到出错
    pub async fn run(mut self) -> anyhow::Result<()> {
        info!(
            "Listening on {}",
            self.local_addr().unwrap_or_else(|| "?".to_string())
        );

        loop {
            let conn = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(ProtocolError::Io(e)) => {
                    warn!("Accept failed: {}", e);
                    continue;
                }
                Err(e) => return Err(e).context("监听失败"),
            };

            if self.state.lock().await.connections.len() >= MAX_CONNECTIONS {
                warn!(
                    "Too many connections, dropping {}",
                    conn.peer_addr().unwrap_or_default()
                );
                tokio::spawn(reject_connection(conn));
                continue;
            }

            let state = self.state.clone();
            tokio::spawn(handle_connection(conn, state));
        }
    }
}

/// 告知对端服务器已满后关闭连接
async fn reject_connection(mut conn: TcpConnection) {
    let busy = ServerMessage::Error {
        code: ErrorCode::ServerBusy,
        message: "Server is full".to_string(),
    };
    if let Err(e) = conn.send(&busy).await {
        debug!("Failed to notify rejected connection: {}", e);
    }
    if let Err(e) = conn.close().await {
        debug!("Failed to close rejected connection: {}", e);
    }
}

/// 处理单个连接，直到对端关闭、出错或心跳超时
async fn handle_connection(conn: TcpConnection, state: SharedState) {
    let peer = conn.peer_addr().unwrap_or_default();
    let (mut reader, mut writer) = conn.split();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(OUTBOUND_QUEUE);

    let client_id = state.lock().await.register(tx.clone());
    info!("Client {} connected from {}", client_id, peer);

    let writer_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = writer.send(&msg).await {
                debug!("Write to client {} failed: {}", client_id, e);
                break;
            }
        }
    });

    loop {
        let msg = match timeout(HEARTBEAT_TIMEOUT, reader.recv::<ClientMessage>()).await {
            Ok(Ok(msg)) => msg,
            Ok(Err(ProtocolError::ConnectionClosed)) => break,
            Ok(Err(e)) => {
                warn!("Client {} read error: {}", client_id, e);
                break;
            }
            Err(_) => {
                info!("Client {} heartbeat timeout", client_id);
                break;
            }
        };

        let reply = {
            let mut state = state.lock().await;
            MessageHandler::handle(&mut state, client_id, msg).await
        };
        if let Some(reply) = reply {
            if tx.send(reply).await.is_err() {
                break;
            }
        }
    }

    MessageHandler::handle_disconnect(&mut *state.lock().await, client_id).await;
    drop(tx);
    let _ = writer_task.await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageManager;
    use protocol::{Connector, GameConfig, PlayerId, PlayerInfo, TcpConnector};
    use tempfile::TempDir;

    async fn start_server() -> (String, SharedState, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = StorageManager::with_dir(temp_dir.path()).unwrap();
        let server = Server::bind("127.0.0.1:0", ServerState::with_storage(storage))
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let state = server.state();
        tokio::spawn(server.run());
        (addr, state, temp_dir)
    }

    async fn hello(addr: &str, nickname: &str) -> TcpConnection {
        let mut conn = TcpConnector.connect(addr).await.unwrap();
        conn.send(&ClientMessage::Hello {
            nickname: nickname.to_string(),
        })
        .await
        .unwrap();
        let reply: ServerMessage = conn.recv().await.unwrap();
        assert!(matches!(reply, ServerMessage::Welcome { .. }));
        conn
    }

    #[tokio::test]
    async fn test_hello_and_ping() {
        let (addr, _state, _dir) = start_server().await;
        let mut conn = hello(&addr, "甲").await;

        conn.send(&ClientMessage::Ping).await.unwrap();
        let reply: ServerMessage = conn.recv().await.unwrap();
        assert!(matches!(reply, ServerMessage::Pong));
    }

    #[tokio::test]
    async fn test_create_join_over_tcp() {
        let (addr, _state, _dir) = start_server().await;
        let mut host = hello(&addr, "甲").await;
        let mut guest = hello(&addr, "乙").await;

        host.send(&ClientMessage::CreateGame {
            player: PlayerInfo::new("甲"),
            config: GameConfig::default(),
        })
        .await
        .unwrap();
        let game_id = match host.recv::<ServerMessage>().await.unwrap() {
            ServerMessage::GameCreated { game_id, .. } => game_id,
            other => panic!("Unexpected reply: {:?}", other),
        };

        host.send(&ClientMessage::Subscribe { game_id })
            .await
            .unwrap();
        assert!(matches!(
            host.recv::<ServerMessage>().await.unwrap(),
            ServerMessage::Subscribed { .. }
        ));

        guest
            .send(&ClientMessage::JoinGame {
                game_id,
                player: PlayerInfo::new("乙"),
            })
            .await
            .unwrap();
        let snapshot = match guest.recv::<ServerMessage>().await.unwrap() {
            ServerMessage::GameJoined { seat, snapshot, .. } => {
                assert_eq!(seat, PlayerId::Two);
                snapshot
            }
            other => panic!("Unexpected reply: {:?}", other),
        };

        match host.recv::<ServerMessage>().await.unwrap() {
            ServerMessage::SnapshotUpdated { snapshot: s, .. } => assert_eq!(s, snapshot),
            other => panic!("Unexpected push: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejected_connection_is_told_and_closed() {
        let mut listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut client = TcpConnector.connect(&addr).await.unwrap();
        let conn = listener.accept().await.unwrap();

        reject_connection(conn).await;

        assert!(matches!(
            client.recv::<ServerMessage>().await.unwrap(),
            ServerMessage::Error {
                code: ErrorCode::ServerBusy,
                ..
            }
        ));
        assert!(matches!(
            client.recv::<ServerMessage>().await,
            Err(ProtocolError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_disconnect_cleans_up() {
        let (addr, state, _dir) = start_server().await;
        let conn = hello(&addr, "甲").await;
        assert_eq!(state.lock().await.clients.online_count(), 1);

        drop(conn);
        // 等待服务端处理断线
        for _ in 0..50 {
            if state.lock().await.clients.online_count() == 0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert_eq!(state.lock().await.clients.online_count(), 0);
    }
}
