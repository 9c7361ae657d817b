use std::ffi::c_int;
use std::str::FromStr;

/// Events fetched per wait call.
pub const DEFAULT_EVENT_CAPACITY: usize = 128;

/// Listen backlog for registered listeners.
pub const DEFAULT_BACKLOG: c_int = 128;

/// Size of the buffer the adapters arm for each read.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 32;

/// Overrides [`DEFAULT_EVENT_CAPACITY`].
pub const EVENT_CAPACITY_ENV: &str = "EDGE_UV_EVENT_CAPACITY";

/// Overrides [`DEFAULT_BACKLOG`].
pub const BACKLOG_ENV: &str = "EDGE_UV_BACKLOG";

/// Overrides [`DEFAULT_READ_BUFFER_SIZE`].
pub const READ_BUFFER_SIZE_ENV: &str = "EDGE_UV_READ_BUFFER_SIZE";

/// Settings a [`Reactor`](crate::Reactor) is constructed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    name: String,
    event_capacity: usize,
    backlog: c_int,
    read_buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            name: format!("edge-uv-reactor-{}", uuid::Uuid::new_v4()),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            backlog: DEFAULT_BACKLOG,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

fn env_get<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[allow(missing_docs)]
impl Config {
    /// Defaults, overridden by any `EDGE_UV_*` environment variable that parses.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Config::default();
        _ = config
            .set_event_capacity(env_get(EVENT_CAPACITY_ENV, DEFAULT_EVENT_CAPACITY))
            .set_backlog(env_get(BACKLOG_ENV, DEFAULT_BACKLOG))
            .set_read_buffer_size(env_get(READ_BUFFER_SIZE_ENV, DEFAULT_READ_BUFFER_SIZE));
        config
    }

    #[must_use]
    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn get_event_capacity(&self) -> usize {
        self.event_capacity
    }

    /// Zero is clamped to one.
    pub fn set_event_capacity(&mut self, event_capacity: usize) -> &mut Self {
        self.event_capacity = event_capacity.max(1);
        self
    }

    #[must_use]
    pub fn get_backlog(&self) -> c_int {
        self.backlog
    }

    pub fn set_backlog(&mut self, backlog: c_int) -> &mut Self {
        self.backlog = backlog;
        self
    }

    #[must_use]
    pub fn get_read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }

    /// Zero is clamped to one, an empty buffer cannot be armed.
    pub fn set_read_buffer_size(&mut self, read_buffer_size: usize) -> &mut Self {
        self.read_buffer_size = read_buffer_size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert!(config.get_name().starts_with("edge-uv-reactor-"));
        assert_eq!(DEFAULT_EVENT_CAPACITY, config.get_event_capacity());
        assert_eq!(DEFAULT_BACKLOG, config.get_backlog());
        assert_eq!(DEFAULT_READ_BUFFER_SIZE, config.get_read_buffer_size());
        assert_ne!(config.get_name(), Config::default().get_name());
    }

    #[test]
    fn setters_chain() {
        let mut config = Config::default();
        _ = config
            .set_name("test")
            .set_event_capacity(0)
            .set_backlog(16)
            .set_read_buffer_size(0);
        assert_eq!("test", config.get_name());
        assert_eq!(1, config.get_event_capacity());
        assert_eq!(16, config.get_backlog());
        assert_eq!(1, config.get_read_buffer_size());
    }
}
