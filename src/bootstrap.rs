//! Editor page bootstrap.
//!
//! The server renders the editor page with two inline script variables:
//! `initialData`, a JSON object with the saved label fields (or `null` for a
//! new label), and `labelUuid`, the label's id. This module pulls both out
//! of the page.

use crate::{Error, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

const INITIAL_DATA_VAR: &str = "initialData";
const LABEL_UUID_VAR: &str = "labelUuid";

/// Server-supplied state a page starts from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageBootstrap {
    pub initial_data: Option<Map<String, Value>>,
    pub label_uuid: Option<String>,
}

impl PageBootstrap {
    pub fn is_empty(&self) -> bool {
        self.initial_data.is_none() && self.label_uuid.is_none()
    }

    /// Build from already-parsed values. `initial` must be an object or `null`.
    pub fn from_json(initial: Value, label_uuid: Option<String>) -> Result<Self> {
        let initial_data = match initial {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                return Err(Error::DecodeError(format!(
                    "initial data must be a JSON object, got {}",
                    other
                )))
            }
        };
        Ok(Self { initial_data, label_uuid })
    }

    /// Scan script sources for the bootstrap assignments. Later scripts win.
    pub fn from_scripts<'a>(scripts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut boot = Self::default();
        for script in scripts {
            if let Some(Value::Object(map)) = extract_assignment(script, INITIAL_DATA_VAR) {
                boot.initial_data = Some(map);
            }
            if let Some(uuid) = extract_assignment(script, LABEL_UUID_VAR)
                .as_ref()
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
            {
                boot.label_uuid = Some(uuid.to_string());
            }
        }
        boot
    }

    /// Parse an editor page, reading inline `<script>` blocks only
    #[cfg(feature = "http")]
    pub fn parse_html(html: &str) -> Result<Self> {
        use scraper::{Html, Selector};

        let document = Html::parse_document(html);
        let selector = Selector::parse("script")
            .map_err(|e| Error::DecodeError(format!("bad script selector: {:?}", e)))?;
        let scripts: Vec<String> = document
            .select(&selector)
            .filter(|el| el.value().attr("src").is_none())
            .map(|el| el.text().collect::<String>())
            .collect();
        Ok(Self::from_scripts(scripts.iter().map(String::as_str)))
    }
}

/// Find `name = <value>` in a script and parse the value.
///
/// `const`/`let`/`var`/`window.` prefixes need no special handling since
/// only the identifier and the `=` are matched. The value is a JSON document
/// or a single-quoted string; whatever follows it (`;`, more code) is
/// ignored.
pub fn extract_assignment(script: &str, name: &str) -> Option<Value> {
    for (idx, _) in script.match_indices(name) {
        let preceded_by_ident = script[..idx].chars().next_back().is_some_and(is_ident_char);
        if preceded_by_ident {
            continue;
        }
        let rest = script[idx + name.len()..].trim_start();
        let Some(rest) = rest.strip_prefix('=') else {
            continue;
        };
        if rest.starts_with('=') {
            continue;
        }
        let rest = rest.trim_start();

        if let Some(quoted) = rest.strip_prefix('\'') {
            if let Some(end) = quoted.find('\'') {
                return Some(Value::String(quoted[..end].to_string()));
            }
            continue;
        }

        let mut de = serde_json::Deserializer::from_str(rest);
        if let Ok(value) = Value::deserialize(&mut de) {
            return Some(value);
        }
    }
    None
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
