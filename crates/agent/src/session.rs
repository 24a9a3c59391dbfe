use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use printdesk_core::flows::{ConversationContext, Message, SessionId};

/// Everything the runtime keeps for one chat.
#[derive(Clone, Debug)]
pub struct SessionEntry {
    pub context: ConversationContext,
    pub transcript: Vec<Message>,
    pub quick_replies: Vec<String>,
}

impl SessionEntry {
    pub fn new(context: ConversationContext) -> Self {
        Self { context, transcript: Vec::new(), quick_replies: Vec::new() }
    }
}

/// Session state keyed by session id. Each entry sits behind its own mutex so
/// turns within a session are serialized while different sessions proceed
/// independently.
#[derive(Default)]
pub struct SessionArena {
    entries: RwLock<HashMap<SessionId, Arc<Mutex<SessionEntry>>>>,
}

impl SessionArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, entry: SessionEntry) -> Arc<Mutex<SessionEntry>> {
        let id = entry.context.session.id.clone();
        let slot = Arc::new(Mutex::new(entry));
        self.entries.write().await.insert(id, Arc::clone(&slot));
        slot
    }

    pub async fn get(&self, id: &SessionId) -> Option<Arc<Mutex<SessionEntry>>> {
        self.entries.read().await.get(id).cloned()
    }

    pub async fn remove(&self, id: &SessionId) -> Option<Arc<Mutex<SessionEntry>>> {
        self.entries.write().await.remove(id)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
