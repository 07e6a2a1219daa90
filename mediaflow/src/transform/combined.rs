//! Folding an ordered list of transformers into one.

use super::{PipelineTransformer, Transformer};
use crate::core::Media;
use crate::errors::PipelineError;
use crate::tasks::{
    CombinedResult, CombinedTask, DoNothingResult, DoNothingTask, ResultRef, TaskRef,
};
use std::fmt;
use std::sync::Arc;

/// A transformer that applies several transformers side by side.
///
/// The resulting chain is a [`CombinedTask`] / [`CombinedResult`] whose
/// branch `i` is produced by member `i`. The chain finishes when every
/// branch has finished.
pub struct CombinedTransformer {
    name: String,
    members: Vec<Arc<dyn Transformer>>,
}

impl CombinedTransformer {
    /// Combines `members`, keeping their order.
    ///
    /// Fails if `members` is empty.
    pub fn new(members: Vec<Arc<dyn Transformer>>) -> Result<Self, PipelineError> {
        if members.is_empty() {
            return Err(PipelineError::EmptyCombination {
                what: "transformers",
            });
        }

        let names: Vec<&str> = members.iter().map(|m| m.name()).collect();
        let name = format!("combined({})", names.join("+"));

        Ok(Self { name, members })
    }

    /// Returns the combined transformers in order.
    #[must_use]
    pub fn members(&self) -> &[Arc<dyn Transformer>] {
        &self.members
    }
}

impl Transformer for CombinedTransformer {
    fn name(&self) -> &str {
        &self.name
    }

    /// Usable when every member is usable.
    fn is_usable(&self, media: &Media) -> bool {
        self.members.iter().all(|m| m.is_usable(media))
    }

    fn pipeline_transformer(&self) -> Arc<dyn PipelineTransformer> {
        Arc::new(CombinedPipelineTransformer {
            members: self
                .members
                .iter()
                .map(|m| m.pipeline_transformer())
                .collect(),
        })
    }
}

impl fmt::Debug for CombinedTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombinedTransformer")
            .field("name", &self.name)
            .field("members", &self.members.len())
            .finish()
    }
}

/// Fans one task or result out to every member mapping.
struct CombinedPipelineTransformer {
    members: Vec<Arc<dyn PipelineTransformer>>,
}

impl PipelineTransformer for CombinedPipelineTransformer {
    fn transform_task(&self, task: TaskRef) -> Option<TaskRef> {
        let children: Vec<TaskRef> = self
            .members
            .iter()
            .map(|m| {
                m.transform_task(Arc::clone(&task))
                    .unwrap_or_else(DoNothingTask::shared)
            })
            .collect();

        // Members are never empty, see `CombinedTransformer::new`.
        CombinedTask::new(children)
            .ok()
            .map(|combined| Arc::new(combined) as TaskRef)
    }

    fn transform_result(&self, result: ResultRef) -> Option<ResultRef> {
        let children: Vec<ResultRef> = self
            .members
            .iter()
            .map(|m| {
                m.transform_result(Arc::clone(&result))
                    .unwrap_or_else(DoNothingResult::shared)
            })
            .collect();

        CombinedResult::new(children)
            .ok()
            .map(|combined| Arc::new(combined) as ResultRef)
    }
}
