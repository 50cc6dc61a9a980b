use super::model::{ModelCatalog, ModelError, ModelSelector};
use super::transcript::Transcript;

/// Everything one conversation owns: the transcript and the model picked from
/// the allow-list. Dropped when the session ends.
#[derive(Debug, Clone)]
pub struct ChatSession {
    catalog: ModelCatalog,
    transcript: Transcript,
    model: ModelSelector,
}

impl ChatSession {
    pub fn new(catalog: ModelCatalog) -> Self {
        let model = catalog.default_selector();
        Self {
            catalog,
            transcript: Transcript::new(),
            model,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub(crate) fn transcript_mut(&mut self) -> &mut Transcript {
        &mut self.transcript
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn model(&self) -> &ModelSelector {
        &self.model
    }

    /// Switches the model for subsequent cycles. History is left untouched.
    pub fn select_model(&mut self, name: &str) -> Result<&ModelSelector, ModelError> {
        self.model = self.catalog.select(name)?;
        Ok(&self.model)
    }

    pub fn cycle_model(&mut self) -> &ModelSelector {
        self.model = self.catalog.next_after(&self.model);
        &self.model
    }

    /// Restores the greeting-only transcript. The model selection survives.
    pub fn reset(&mut self) {
        self.transcript.reset();
    }
}
