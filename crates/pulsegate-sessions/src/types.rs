use serde::{Deserialize, Serialize};

use pulsegate_core::AgentId;

use crate::error::{Result, SessionError};

/// Structured session key (spec §3 `Session`), extended with an optional
/// fourth, sticky-routing segment identifying the originating channel —
/// this spec's sessions are channel-bridge conversations as well as pulse
/// sessions, unlike the teacher's purely user-centric
/// `skynet_sessions::types::SessionKey` (SPEC_FULL.md §3).
///
/// Wire format: `user:{user_id}:agent:{agent_id}:{name}`, or
/// `chan:{channel}:user:{user_id}:agent:{agent_id}:{name}` when a channel
/// is attached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub user_id: String,
    pub agent_id: AgentId,
    pub name: String,
    pub channel: Option<String>,
}

impl SessionKey {
    pub fn new(user_id: impl Into<String>, agent_id: AgentId, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            agent_id,
            name: name.into(),
            channel: None,
        }
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn format(&self) -> String {
        let core = format!("user:{}:agent:{}:{}", self.user_id, self.agent_id, self.name);
        match &self.channel {
            Some(c) => format!("chan:{c}:{core}"),
            None => core,
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        let (channel, rest) = if let Some(after_chan) = s.strip_prefix("chan:") {
            let pos = after_chan.find(":user:").ok_or_else(|| {
                SessionError::InvalidKey(format!("missing ':user:' after channel segment: {s}"))
            })?;
            (Some(after_chan[..pos].to_string()), &after_chan[pos + 1..])
        } else {
            (None, s)
        };

        let after_user = rest.strip_prefix("user:").ok_or_else(|| {
            SessionError::InvalidKey(format!("missing 'user:' prefix: {s}"))
        })?;
        let agent_marker = ":agent:";
        let agent_pos = after_user.find(agent_marker).ok_or_else(|| {
            SessionError::InvalidKey(format!("missing ':agent:' segment: {s}"))
        })?;
        let user_id = &after_user[..agent_pos];
        let after_agent = &after_user[agent_pos + agent_marker.len()..];
        let colon_pos = after_agent
            .find(':')
            .ok_or_else(|| SessionError::InvalidKey(format!("missing session name segment: {s}")))?;
        let agent_id = &after_agent[..colon_pos];
        let name = &after_agent[colon_pos + 1..];

        if user_id.is_empty() || agent_id.is_empty() || name.is_empty() {
            return Err(SessionError::InvalidKey(format!("key components must not be empty: {s}")));
        }

        Ok(Self {
            user_id: user_id.to_string(),
            agent_id: AgentId::new(agent_id),
            name: name.to_string(),
            channel,
        })
    }

    /// Channel-bridge session id, matching spec §4.8's `chan_{sender}_{agentId}`
    /// shape used by `/new` (spec §8 scenario 5), derived from this key.
    pub fn channel_session_id(&self) -> String {
        format!("chan_{}_{}", self.user_id, self.agent_id)
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format())
    }
}

/// A persisted conversation session (spec §3 `Session`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub key: SessionKey,
    pub model: Option<String>,
    pub title: Option<String>,
    pub message_count: u32,
    pub total_tokens: u64,
    pub created_at: String,
    pub updated_at: String,
}

/// `{channelName, senderIdentity} -> {agentId, lastActivityMs}` (spec §3
/// `Routing sticky entry`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StickyKey {
    pub channel: String,
    pub sender_identity: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StickyEntry {
    pub agent_id: AgentId,
    pub last_activity_ms: i64,
}

impl StickyEntry {
    /// Whether this entry is still within `ttl_minutes` of `now_ms`
    /// (spec §3 "TTL = stickyTtlMinutes since lastActivityMs").
    pub fn is_live(&self, now_ms: i64, ttl_minutes: u64) -> bool {
        let ttl_ms = ttl_minutes as i64 * 60_000;
        now_ms - self.last_activity_ms < ttl_ms
    }
}

/// Per-channel allowlist entry (spec §3 `Allowlist entry`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowlistEntry {
    pub id: String,
    pub channel: String,
    pub sender_identity: String,
    pub label: Option<String>,
    pub default_agent_id: Option<AgentId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_without_channel() {
        let key = SessionKey::new("u-1", AgentId::new("main"), "main");
        let formatted = key.format();
        assert_eq!(formatted, "user:u-1:agent:main:main");
        assert_eq!(SessionKey::parse(&formatted).unwrap(), key);
    }

    #[test]
    fn roundtrip_with_channel() {
        let key = SessionKey::new("u-1", AgentId::new("main"), "main").with_channel("telegram");
        let formatted = key.format();
        assert_eq!(formatted, "chan:telegram:user:u-1:agent:main:main");
        assert_eq!(SessionKey::parse(&formatted).unwrap(), key);
    }

    #[test]
    fn name_may_contain_colons() {
        let key = SessionKey::new("u-1", AgentId::new("main"), "trip:paris:2026");
        let parsed = SessionKey::parse(&key.format()).unwrap();
        assert_eq!(parsed.name, "trip:paris:2026");
    }

    #[test]
    fn sticky_entry_expires_after_ttl() {
        let entry = StickyEntry { agent_id: AgentId::new("a"), last_activity_ms: 0 };
        assert!(entry.is_live(60_000, 30));
        assert!(!entry.is_live(30 * 60_000 + 1, 30));
    }
}
