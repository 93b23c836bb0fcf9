//! Carrier PLMN override table
//!
//! Loaded once from the partner `plmn-conf.xml` file:
//!
//! ```xml
//! <plmnOverrides>
//!     <plmnOverride numeric="310260" plmn="T-Mobile"/>
//! </plmnOverrides>
//! ```
//!
//! A missing or malformed file yields an empty table; lookups never fail.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Default location of the override file on a device image
pub const DEFAULT_PLMN_OVERRIDE_PATH: &str = "/system/etc/plmn-conf.xml";

static ROOT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<plmnOverrides\b[^>]*>").expect("valid regex"));

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

static ELEMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([A-Za-z][\w.-]*)\b([^>]*?)/?>").expect("valid regex"));

static ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([A-Za-z_][\w.-]*)\s*=\s*"([^"]*)""#).expect("valid regex"));

/// Lookup table from numeric operator id (MCC+MNC) to display PLMN
#[derive(Debug, Clone, Default)]
pub struct PlmnOverride {
    carriers: HashMap<String, String>,
}

impl PlmnOverride {
    /// Load the table from `path`, logging and returning an empty table on failure
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Can not open {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match Self::parse(&content) {
            Ok(table) => {
                tracing::debug!(
                    "Loaded {} PLMN overrides from {}",
                    table.len(),
                    path.display()
                );
                table
            }
            Err(e) => {
                tracing::warn!("Exception in plmn-conf parser: {}", e);
                Self::default()
            }
        }
    }

    /// Parse override entries from XML text.
    ///
    /// Entries are read in document order after the `<plmnOverrides>` root
    /// and reading stops at the first element with another name. Commented
    /// out entries are ignored.
    pub fn parse(xml: &str) -> Result<Self> {
        let xml = COMMENT_RE.replace_all(xml, "");
        let root = ROOT_RE
            .find(&xml)
            .ok_or_else(|| Error::config("missing <plmnOverrides> root element"))?;

        let mut carriers = HashMap::new();
        for element in ELEMENT_RE.captures_iter(&xml[root.end()..]) {
            if &element[1] != "plmnOverride" {
                break;
            }

            let attrs: HashMap<&str, &str> = ATTR_RE
                .captures_iter(element.get(2).map_or("", |m| m.as_str()))
                .filter_map(|c| Some((c.get(1)?.as_str(), c.get(2)?.as_str())))
                .collect();

            match (attrs.get("numeric"), attrs.get("plmn")) {
                (Some(numeric), Some(plmn)) => {
                    carriers.insert(numeric.to_string(), plmn.to_string());
                }
                _ => tracing::warn!("Skipping incomplete plmnOverride entry"),
            }
        }

        Ok(Self { carriers })
    }

    pub fn contains_carrier(&self, numeric: &str) -> bool {
        self.carriers.contains_key(numeric)
    }

    pub fn plmn(&self, numeric: &str) -> Option<&str> {
        self.carriers.get(numeric).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.carriers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.carriers.is_empty()
    }
}
