use async_trait::async_trait;

use crate::core::links::ConversationContext;
use crate::shared::error::EngineResult;
use crate::shared::settings::DEFAULT_CHANNEL_HISTORY_LIMIT;
use crate::store::UnitStore;

/// Minimal view of a channel message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub author_id: String,
    /// Bots, webhooks and other automated senders.
    pub automated: bool,
}

impl ChannelMessage {
    pub fn human(author_id: &str) -> Self {
        Self { author_id: author_id.to_string(), automated: false }
    }

    pub fn automated(author_id: &str) -> Self {
        Self { author_id: author_id.to_string(), automated: true }
    }
}

pub struct MessageContext<'a> {
    store: &'a dyn UnitStore,
    author_id: String,
    community_id: Option<String>,
    /// Most recent first.
    recent: Vec<ChannelMessage>,
    private: bool,
    history_limit: usize,
}

impl<'a> MessageContext<'a> {
    pub fn new(store: &'a dyn UnitStore, author_id: &str) -> Self {
        Self {
            store,
            author_id: author_id.to_string(),
            community_id: None,
            recent: Vec::new(),
            private: true,
            history_limit: DEFAULT_CHANNEL_HISTORY_LIMIT,
        }
    }

    /// Channel in a community, with its recent history (most recent first).
    pub fn in_channel(mut self, community_id: &str, recent: Vec<ChannelMessage>) -> Self {
        self.community_id = Some(community_id.to_string());
        self.recent = recent;
        self.private = false;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Distinct human authors among the last `history_limit` messages.
    fn participants(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for message in self.recent.iter().take(self.history_limit) {
            if message.automated || message.author_id == self.author_id {
                continue;
            }
            if !seen.contains(&message.author_id.as_str()) {
                seen.push(&message.author_id);
            }
        }
        seen
    }
}

#[async_trait]
impl<'a> ConversationContext for MessageContext<'a> {
    async fn relevant_currency_codes(&self) -> EngineResult<Vec<String>> {
        let mut codes = self.store.user_currencies(&self.author_id).await?;

        if !self.private {
            for participant in self.participants() {
                codes.extend(self.store.user_currencies(participant).await?);
            }
        }

        if let Some(community_id) = &self.community_id {
            codes.extend(self.store.community_currencies(community_id).await?);
        }

        let mut unique: Vec<String> = Vec::with_capacity(codes.len());
        for code in codes {
            let code = code.to_lowercase();
            if !unique.contains(&code) {
                unique.push(code);
            }
        }
        Ok(unique)
    }
}
