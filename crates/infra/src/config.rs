//! Database configuration.

/// Default database location (relative to the working directory).
pub const DEFAULT_DATABASE_URL: &str = "sqlite://bloodbank.db";

/// Default connection pool size for file-backed databases.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Where the records live and how many connections may be opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>, max_connections: u32) -> Self {
        Self {
            url: url.into(),
            max_connections,
        }
    }

    /// A private in-memory database (tests, dry runs).
    pub fn in_memory() -> Self {
        Self::new("sqlite::memory:", 1)
    }

    /// Whether the URL points at an in-memory database.
    pub fn is_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }

    /// Pool size actually used.
    ///
    /// Every connection to `sqlite::memory:` opens its own empty database, so
    /// in-memory URLs are pinned to a single connection.
    pub fn effective_max_connections(&self) -> u32 {
        if self.is_memory() {
            1
        } else {
            self.max_connections.max(1)
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATABASE_URL, DEFAULT_MAX_CONNECTIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_urls_use_one_connection() {
        assert_eq!(DatabaseConfig::in_memory().effective_max_connections(), 1);
        assert_eq!(
            DatabaseConfig::new("sqlite::memory:", 8).effective_max_connections(),
            1
        );
        assert_eq!(
            DatabaseConfig::new("sqlite://file.db", 0).effective_max_connections(),
            1
        );
        assert_eq!(
            DatabaseConfig::new("sqlite://file.db", 8).effective_max_connections(),
            8
        );
    }

    #[test]
    fn default_points_at_local_file() {
        let config = DatabaseConfig::default();
        assert_eq!(config.url, DEFAULT_DATABASE_URL);
        assert!(!config.is_memory());
    }
}
