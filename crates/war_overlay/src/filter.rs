//! `${token}` substitution for filtered overlays.

use std::collections::BTreeMap;

/// Rewrites the text of a filtered resource.
pub trait ResourceFilter: Send + Sync {
    fn filter(&self, text: &str) -> String;
}

/// Replaces `${key}` with the value of `key`.
///
/// Unknown keys and unterminated expressions are left as written; `\${`
/// produces a literal `${`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertiesFilter {
    properties: BTreeMap<String, String>,
}

impl PropertiesFilter {
    pub fn new(properties: BTreeMap<String, String>) -> Self {
        Self { properties }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

impl ResourceFilter for PropertiesFilter {
    fn filter(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find("${") {
            if rest[..start].ends_with('\\') {
                out.push_str(&rest[..start - 1]);
                out.push_str("${");
                rest = &rest[start + 2..];
                continue;
            }

            out.push_str(&rest[..start]);
            let Some(len) = rest[start + 2..].find('}') else {
                rest = &rest[start..];
                break;
            };

            let end = start + 2 + len + 1;
            let key = &rest[start + 2..start + 2 + len];
            match self.properties.get(key) {
                Some(value) => out.push_str(value),
                None => out.push_str(&rest[start..end]),
            }
            rest = &rest[end..];
        }

        out.push_str(rest);
        out
    }
}
