//! Registry of transformers and selection against a media.

use super::{CombinedTransformer, IdentityTransformer, Transformer};
use crate::core::Media;
use crate::errors::PipelineError;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Name-keyed registry of transformers.
///
/// Registration order is significant: selection walks transformers in the
/// order they were registered. The registry is an ordinary value; create
/// one at startup, share it (usually behind an `Arc`), and [`clear`] it on
/// shutdown.
///
/// [`clear`]: TransformerRegistry::clear
pub struct TransformerRegistry {
    entries: RwLock<Vec<Arc<dyn Transformer>>>,
    identity: Arc<dyn Transformer>,
}

impl TransformerRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            identity: Arc::new(IdentityTransformer),
        }
    }

    /// Registers a transformer under its name.
    pub fn register(&self, transformer: Arc<dyn Transformer>) -> Result<(), PipelineError> {
        let mut entries = self.entries.write();
        if entries.iter().any(|t| t.name() == transformer.name()) {
            return Err(PipelineError::DuplicateTransformer {
                name: transformer.name().to_string(),
            });
        }

        debug!(transformer = %transformer.name(), position = entries.len(), "Registered transformer");
        entries.push(transformer);
        Ok(())
    }

    /// Removes a transformer by name.
    pub fn unregister(&self, name: &str) -> Option<Arc<dyn Transformer>> {
        let mut entries = self.entries.write();
        let index = entries.iter().position(|t| t.name() == name)?;
        Some(entries.remove(index))
    }

    /// Gets a transformer by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Transformer>> {
        self.entries
            .read()
            .iter()
            .find(|t| t.name() == name)
            .cloned()
    }

    /// Lists registered names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries
            .read()
            .iter()
            .map(|t| t.name().to_string())
            .collect()
    }

    /// Returns the number of registered transformers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Removes every registered transformer.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Returns the identity transformer used when nothing applies.
    #[must_use]
    pub fn identity(&self) -> Arc<dyn Transformer> {
        Arc::clone(&self.identity)
    }

    /// Selects the first usable transformer, or the identity transformer.
    #[must_use]
    pub fn from_media(&self, media: &Media) -> Arc<dyn Transformer> {
        self.entries
            .read()
            .iter()
            .find(|t| t.is_usable(media))
            .cloned()
            .unwrap_or_else(|| self.identity())
    }

    /// Selects every usable transformer in registration order.
    ///
    /// Never empty: falls back to `[identity]`.
    #[must_use]
    pub fn all_from_media(&self, media: &Media) -> Vec<Arc<dyn Transformer>> {
        let usable: Vec<_> = self
            .entries
            .read()
            .iter()
            .filter(|t| t.is_usable(media))
            .cloned()
            .collect();

        if usable.is_empty() {
            vec![self.identity()]
        } else {
            usable
        }
    }

    /// Selects one transformer covering every usable one.
    ///
    /// A single match is returned as is; several are folded into a
    /// [`CombinedTransformer`].
    pub fn combined_from_media(&self, media: &Media) -> Result<Arc<dyn Transformer>, PipelineError> {
        let mut usable = self.all_from_media(media);
        if usable.len() == 1 {
            return Ok(usable.remove(0));
        }

        debug!(media = %media.id, count = usable.len(), "Combining transformers");
        Ok(Arc::new(CombinedTransformer::new(usable)?))
    }
}

impl Default for TransformerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TransformerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformerRegistry")
            .field("transformers", &self.names())
            .finish()
    }
}
