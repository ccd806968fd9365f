//! 客户端管理

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use protocol::{ClientId, GameId, MAX_NICKNAME_LEN};

/// 客户端状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientStatus {
    /// 已连接，尚未报名
    Anonymous,
    /// 在大厅
    Lobby,
    /// 在匹配队列中
    Queued,
    /// 占据某个对局的座位
    InGame(GameId),
}

/// 客户端信息
#[derive(Debug, Clone)]
pub struct Client {
    pub id: ClientId,
    pub nickname: Option<String>,
    pub status: ClientStatus,
}

impl Client {
    pub fn new(id: ClientId) -> Self {
        Self {
            id,
            nickname: None,
            status: ClientStatus::Anonymous,
        }
    }

    /// 是否已报名
    pub fn is_identified(&self) -> bool {
        self.nickname.is_some()
    }
}

/// 客户端管理器
pub struct ClientManager {
    clients: HashMap<ClientId, Client>,
    next_id: AtomicU64,
}

impl ClientManager {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    fn generate_id(&self) -> ClientId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// 验证昵称
    pub fn validate_nickname(nickname: &str) -> Result<(), &'static str> {
        if nickname.trim().is_empty() {
            return Err("昵称不能为空");
        }
        if nickname.chars().count() > MAX_NICKNAME_LEN {
            return Err("昵称不能超过20个字符");
        }
        Ok(())
    }

    /// 登记新连接
    pub fn connect(&mut self) -> ClientId {
        let id = self.generate_id();
        self.clients.insert(id, Client::new(id));
        id
    }

    /// 报名（设置昵称）
    pub fn identify(&mut self, client_id: ClientId, nickname: String) -> Result<(), &'static str> {
        Self::validate_nickname(&nickname)?;
        let client = self.clients.get_mut(&client_id).ok_or("连接不存在")?;
        client.nickname = Some(nickname);
        if client.status == ClientStatus::Anonymous {
            client.status = ClientStatus::Lobby;
        }
        Ok(())
    }

    /// 移除客户端（断线）
    pub fn remove(&mut self, client_id: ClientId) -> Option<Client> {
        self.clients.remove(&client_id)
    }

    pub fn get(&self, client_id: ClientId) -> Option<&Client> {
        self.clients.get(&client_id)
    }

    pub fn set_status(&mut self, client_id: ClientId, status: ClientStatus) {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.status = status;
        }
    }

    pub fn status(&self, client_id: ClientId) -> Option<ClientStatus> {
        self.clients.get(&client_id).map(|c| c.status)
    }

    pub fn nickname(&self, client_id: ClientId) -> Option<&str> {
        self.clients
            .get(&client_id)
            .and_then(|c| c.nickname.as_deref())
    }

    pub fn is_identified(&self, client_id: ClientId) -> bool {
        self.clients
            .get(&client_id)
            .is_some_and(Client::is_identified)
    }

    /// 在线客户端数量
    pub fn online_count(&self) -> usize {
        self.clients.len()
    }
}

impl Default for ClientManager {
    fn default() -> Self {
        Self::new()
    }
}
