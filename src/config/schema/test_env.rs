use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

/// Every variable `apply_env_overrides` reads.
pub(super) const OVERRIDE_VARS: [&str; 6] = [
    "GEMINI_API_KEY",
    "GOOGLE_API_KEY",
    "CODE_ASSISTANT_MODEL",
    "CODE_ASSISTANT_MAX_ITERS",
    "CODE_ASSISTANT_BASE_URL",
    "CODE_ASSISTANT_TEMPERATURE",
];

static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Holds the process-wide env lock with every override variable cleared,
/// restoring the previous values on drop.
pub(super) struct IsolatedEnv {
    saved: Vec<(&'static str, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl IsolatedEnv {
    pub(super) fn new() -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let saved = OVERRIDE_VARS
            .iter()
            .map(|key| (*key, std::env::var(key).ok()))
            .collect();
        for key in OVERRIDE_VARS {
            // SAFETY: test-only; ENV_LOCK serializes env mutation across tests.
            unsafe {
                std::env::remove_var(key);
            }
        }
        Self { saved, _lock: lock }
    }

    pub(super) fn set(&self, key: &'static str, value: &str) {
        // SAFETY: test-only; this guard holds ENV_LOCK.
        unsafe {
            std::env::set_var(key, value);
        }
    }
}

impl Drop for IsolatedEnv {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            // SAFETY: test-only restoration while ENV_LOCK is still held.
            unsafe {
                match value {
                    Some(value) => std::env::set_var(key, value),
                    None => std::env::remove_var(key),
                }
            }
        }
    }
}
