//! Environment variable helpers shared by the workspace crates.
//!
//! Every lookup treats an empty value as unset. Profiled lookups try
//! `{PROFILE}_{KEY}` first and fall back to `{KEY}`.

use std::env;

/// Env var naming the active profile (e.g. `PROD`).
pub const PROFILE_VAR: &str = "SNOWGLUE_PROFILE";

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

pub fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

pub fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

/// Active profile from `SNOWGLUE_PROFILE`, uppercased. Empty when unset.
pub fn active_profile() -> String {
    env_or(PROFILE_VAR, "").to_uppercase()
}

/// Read a profiled env var: tries `{PROFILE}_{KEY}` first, falls back to `{KEY}`.
pub fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}
