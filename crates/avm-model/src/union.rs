//! # Union Resolution
//!
//! A union value carries no tag, so the branch is chosen by trial: each
//! branch model, in declaration order, tries to conform the value, and the
//! first success wins. A value that several branches accept always binds to
//! the earliest of them.
//!
//! Every rejection is kept, so a value no branch accepts reports why each
//! branch turned it down.

use avm_core::Datum;
use avm_schema::Schema;

use crate::error::{BranchFailure, ModelError};
use crate::model::ModelType;

/// Select the first branch of `union` that accepts `value`.
///
/// Returns the branch index and the value's canonical form under that
/// branch.
pub(crate) fn resolve(
    union: &ModelType,
    branches: &[Schema],
    value: Datum,
) -> Result<(usize, Datum), ModelError> {
    let mut attempts = Vec::with_capacity(branches.len());
    for (index, branch) in branches.iter().enumerate() {
        let outcome = union
            .registry()
            .model_for(branch)
            .and_then(|model| model.conform_nested(value.clone()));
        match outcome {
            Ok((canonical, _)) => {
                tracing::trace!(union = union.name(), index, branch = %branch.label(), "union branch selected");
                return Ok((index, canonical));
            }
            Err(err) => {
                tracing::trace!(union = union.name(), index, branch = %branch.label(), error = %err, "union branch rejected");
                attempts.push(BranchFailure {
                    index,
                    branch: branch.label(),
                    reason: err.to_string(),
                });
            }
        }
    }
    Err(ModelError::NoMatch {
        model: union.name().to_string(),
        value,
        attempts,
    })
}
