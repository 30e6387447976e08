//! Demo scenario configuration.
use std::env;

/// Settings of the scripted two-peer demo.
#[derive(Clone, Debug)]
pub struct DemoConfig {
    /// Seed shared by both peers for the duel setup.
    pub seed: u64,
    /// Turns to play before stopping.
    pub turns: u32,
    /// Frame index (0-based) the guest's transport silently drops.
    pub drop_guest_frame: Option<usize>,
    /// Also write logs to a file under the platform cache directory.
    pub log_to_file: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            seed: 7,
            turns: 6,
            drop_guest_frame: Some(0),
            log_to_file: false,
        }
    }
}

impl DemoConfig {
    /// Construct demo configuration from environment variables.
    ///
    /// Environment variables:
    /// - `DEMO_SEED` - Duel seed (default: 7)
    /// - `DEMO_TURNS` - Turns to play (default: 6)
    /// - `DEMO_DROP_GUEST_FRAME` - Guest frame to drop, or `none` (default: 0)
    /// - `SYNC_LOG_TO_FILE` - Also log to a file (default: false)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(seed) = read_env("DEMO_SEED") {
            config.seed = seed;
        }
        if let Some(turns) = read_env::<u32>("DEMO_TURNS") {
            config.turns = turns.max(1);
        }
        if let Ok(frame) = env::var("DEMO_DROP_GUEST_FRAME") {
            config.drop_guest_frame = match frame.trim() {
                "" | "none" | "off" => None,
                index => index.parse().ok(),
            };
        }
        if let Some(flag) = read_env_bool("SYNC_LOG_TO_FILE") {
            config.log_to_file = flag;
        }

        config
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

fn read_env_bool(key: &str) -> Option<bool> {
    let value = env::var(key).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
