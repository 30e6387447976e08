//! Tunables for the synchronization layer.
use std::env;
use std::time::Duration;

/// Synchronization configuration shared by the bus and its worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    /// How long a subordinate waits for a verdict on a submitted intent.
    pub intent_timeout: Duration,
    /// How long to wait for a recovery response before re-sending the request.
    pub recovery_timeout: Duration,
    /// Recovery requests sent per round, the first one included.
    pub recovery_max_attempts: u32,
    /// Consecutive fingerprint mismatches that start recovery.
    pub mismatch_threshold: u32,
    /// Early intents the authority holds per sender.
    pub max_buffered_intents: usize,
    /// Early confirmations a subordinate holds before treating the gap as loss.
    pub max_buffered_confirmations: usize,
    pub command_buffer_size: usize,
    pub event_buffer_size: usize,
    /// Treat a session with missing identities as a local authority instead
    /// of failing with a role error.
    pub allow_offline_authority: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            intent_timeout: Duration::from_secs(15),
            recovery_timeout: Duration::from_secs(5),
            recovery_max_attempts: 3,
            mismatch_threshold: 1,
            max_buffered_intents: 64,
            max_buffered_confirmations: 64,
            command_buffer_size: 32,
            event_buffer_size: 100,
            allow_offline_authority: false,
        }
    }
}

impl SyncConfig {
    /// Construct configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SYNC_INTENT_TIMEOUT_MS` - Intent verdict timeout (default: 15000)
    /// - `SYNC_RECOVERY_TIMEOUT_MS` - Recovery response timeout (default: 5000)
    /// - `SYNC_RECOVERY_MAX_ATTEMPTS` - Requests per recovery round (default: 3)
    /// - `SYNC_MISMATCH_THRESHOLD` - Mismatches before recovery (default: 1)
    /// - `SYNC_MAX_BUFFERED_INTENTS` - Per-sender intent buffer (default: 64)
    /// - `SYNC_MAX_BUFFERED_CONFIRMATIONS` - Confirmation buffer (default: 64)
    /// - `SYNC_COMMAND_BUFFER` - Worker inbox capacity (default: 32)
    /// - `SYNC_EVENT_BUFFER` - Event channel capacity (default: 100)
    /// - `SYNC_ALLOW_OFFLINE_AUTHORITY` - Offline fallback (default: false)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`SyncConfig::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(ms) = parse::<u64>(lookup("SYNC_INTENT_TIMEOUT_MS")) {
            config.intent_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse::<u64>(lookup("SYNC_RECOVERY_TIMEOUT_MS")) {
            config.recovery_timeout = Duration::from_millis(ms);
        }
        if let Some(attempts) = parse::<u32>(lookup("SYNC_RECOVERY_MAX_ATTEMPTS")) {
            config.recovery_max_attempts = attempts.max(1);
        }
        if let Some(threshold) = parse::<u32>(lookup("SYNC_MISMATCH_THRESHOLD")) {
            config.mismatch_threshold = threshold.max(1);
        }
        if let Some(size) = parse(lookup("SYNC_MAX_BUFFERED_INTENTS")) {
            config.max_buffered_intents = size;
        }
        if let Some(size) = parse(lookup("SYNC_MAX_BUFFERED_CONFIRMATIONS")) {
            config.max_buffered_confirmations = size;
        }
        if let Some(size) = parse::<usize>(lookup("SYNC_COMMAND_BUFFER")) {
            config.command_buffer_size = size.max(1);
        }
        if let Some(size) = parse::<usize>(lookup("SYNC_EVENT_BUFFER")) {
            config.event_buffer_size = size.max(1);
        }
        if let Some(flag) = lookup("SYNC_ALLOW_OFFLINE_AUTHORITY") {
            config.allow_offline_authority = matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        config
    }
}

fn parse<T>(value: Option<String>) -> Option<T>
where
    T: std::str::FromStr,
{
    value?.trim().parse().ok()
}
