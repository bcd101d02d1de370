use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::sql::{Compiler, Dialect};

static URL_PASSWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(://[^:/@]*:)[^@]*@").expect("valid url password regex"));
static KV_PASSWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b((?:password|pwd)\s*=\s*)('[^']*'|[^\s;]*)").expect("valid password regex")
});

/// A saved connection. The id keys both the driver memo and the SQL log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub dialect: Dialect,
    pub connection_string: String,
}

impl ConnectionConfig {
    pub fn new(id: impl Into<String>, dialect: Dialect, connection_string: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            dialect,
            connection_string: connection_string.into(),
        }
    }

    /// Connection string with any password masked, safe for logs.
    pub fn display_string(&self) -> String {
        redact(&self.connection_string)
    }
}

pub fn redact(connection_string: &str) -> String {
    let masked = URL_PASSWORD.replace_all(connection_string, "${1}***@");
    KV_PASSWORD.replace_all(&masked, "${1}***").into_owned()
}

/// The per-connection compiler together with the credentials it was built for.
#[derive(Debug, Clone, PartialEq)]
pub struct Driver {
    pub dialect: Dialect,
    pub compiler: Compiler,
    pub connection_string: String,
}

impl Driver {
    pub fn new(config: &ConnectionConfig) -> Self {
        Self {
            dialect: config.dialect,
            compiler: Compiler::new(config.dialect),
            connection_string: config.connection_string.clone(),
        }
    }

    fn matches(&self, config: &ConnectionConfig) -> bool {
        self.dialect == config.dialect && self.connection_string == config.connection_string
    }
}

/// Memoizes one `Driver` per connection id.
///
/// A lookup whose dialect or connection string differs from the memoized
/// driver replaces it. Two racing rebuilds produce equal drivers.
#[derive(Debug, Default)]
pub struct DriverRegistry {
    drivers: DashMap<String, Arc<Driver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn driver(&self, config: &ConnectionConfig) -> Arc<Driver> {
        if let Some(existing) = self.drivers.get(&config.id) {
            if existing.matches(config) {
                return Arc::clone(existing.value());
            }
        }

        debug!(
            connection = %config.id,
            dialect = %config.dialect,
            target = %config.display_string(),
            "building driver"
        );
        let driver = Arc::new(Driver::new(config));
        self.drivers.insert(config.id.clone(), Arc::clone(&driver));
        driver
    }

    pub fn invalidate(&self, connection_id: &str) -> bool {
        self.drivers.remove(connection_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}
