use std::fmt::{Display, Formatter};
use thiserror::Error;

pub const DEFAULT_MODELS: [&str; 2] = ["deepseek-r1:1.5b", "deepseek-r1:3b"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("model allow-list is empty")]
    EmptyCatalog,
    #[error("unknown model '{name}' (available: {available})")]
    UnknownModel { name: String, available: String },
}

/// Static allow-list of model identifiers the endpoint may be asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    names: Vec<String>,
}

/// A model identifier known to be in the catalog it was selected from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelSelector {
    name: String,
}

impl ModelSelector {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for ModelSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            names: DEFAULT_MODELS.iter().map(|name| name.to_string()).collect(),
        }
    }
}

impl ModelCatalog {
    /// Builds a catalog from raw names. Blank entries are dropped and
    /// duplicates keep their first position.
    pub fn new<I, S>(names: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() || unique.iter().any(|known| known == name) {
                continue;
            }
            unique.push(name.to_string());
        }

        if unique.is_empty() {
            return Err(ModelError::EmptyCatalog);
        }

        Ok(Self { names: unique })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|known| known == name.trim())
    }

    pub fn select(&self, name: &str) -> Result<ModelSelector, ModelError> {
        let name = name.trim();
        if self.contains(name) {
            Ok(ModelSelector {
                name: name.to_string(),
            })
        } else {
            Err(ModelError::UnknownModel {
                name: name.to_string(),
                available: self.names.join(", "),
            })
        }
    }

    pub fn default_selector(&self) -> ModelSelector {
        ModelSelector {
            name: self.names[0].clone(),
        }
    }

    /// Cycles to the entry after `current`, wrapping around. A selector that is
    /// no longer listed falls back to the first entry.
    pub fn next_after(&self, current: &ModelSelector) -> ModelSelector {
        let next = self
            .names
            .iter()
            .position(|name| *name == current.name)
            .map_or(0, |idx| (idx + 1) % self.names.len());
        ModelSelector {
            name: self.names[next].clone(),
        }
    }
}
