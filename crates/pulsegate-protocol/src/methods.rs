// Well-known RPC method names exposed by each channel bridge's pub/sub
// listener (spec §4.8 "RPC surface"), following `skynet-protocol::methods`'
// flat-constants style.

pub const SEND: &str = "send";
pub const STATUS: &str = "status";
pub const RESTART: &str = "restart";

// Channels with linking (e.g. WhatsApp's QR pairing) only.
pub const LINK: &str = "link";
pub const LINK_STATUS: &str = "link_status";
pub const PAIRING_CODE: &str = "pairing_code";
pub const UNLINK: &str = "unlink";

/// Pub/sub pattern subscribed to for inbound wake notifications (spec §4.4,
/// §6). `*` matches any agent id.
pub const WAKE_PATTERN: &str = "agent:*:wake";

/// Pub/sub channel for credential hot-reload notifications (spec §4.8, §6).
pub const CREDENTIALS_CHANGED: &str = "channel:credentials-changed";

/// Build the per-channel RPC request subject (spec §6).
pub fn rpc_request_subject(channel: &str) -> String {
    format!("{channel}:rpc:request")
}

/// Build the one-shot reply subject for a given request id (spec §6).
pub fn rpc_reply_subject(channel: &str, request_id: &str) -> String {
    format!("{channel}:rpc:reply:{request_id}")
}

/// Build the wake subject for a specific agent (matches [`WAKE_PATTERN`]).
pub fn wake_subject(agent_id: &str) -> String {
    format!("agent:{agent_id}:wake")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wake_subject_matches_pattern_shape() {
        let subject = wake_subject("alice");
        assert_eq!(subject, "agent:alice:wake");
        let parts: Vec<&str> = subject.split(':').collect();
        let pattern_parts: Vec<&str> = WAKE_PATTERN.split(':').collect();
        assert_eq!(parts.len(), pattern_parts.len());
    }

    #[test]
    fn rpc_subjects_are_distinct() {
        let req = rpc_request_subject("telegram");
        let reply = rpc_reply_subject("telegram", "req-1");
        assert_ne!(req, reply);
    }
}
