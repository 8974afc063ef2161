//! Policy composition.
//!
//! `Pipeline::wrap([g1, g2, g3])` applied to `op` yields
//! `g1.wrap(g2.wrap(g3.wrap(op)))`: the first policy listed is outermost. It is
//! the first to see errors surfacing from the inner chain and the last to see
//! the result on the way out.

use std::fmt;
use std::sync::Arc;

use crate::operation::Operation;
use crate::resilience::Policy;

/// Ordered, immutable stack of policies.
pub struct Pipeline<T> {
    policies: Vec<Arc<dyn Policy<T>>>,
}

impl<T> Clone for Pipeline<T> {
    fn clone(&self) -> Self {
        Self {
            policies: self.policies.clone(),
        }
    }
}

impl<T: Send + 'static> fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("policies", &self.names())
            .finish()
    }
}

impl<T: Send + 'static> Default for Pipeline<T> {
    fn default() -> Self {
        Self {
            policies: Vec::new(),
        }
    }
}

impl<T: Send + 'static> Pipeline<T> {
    /// Compose policies, outermost first.
    pub fn wrap(policies: impl IntoIterator<Item = Arc<dyn Policy<T>>>) -> Self {
        Self {
            policies: policies.into_iter().collect(),
        }
    }

    pub fn builder() -> PipelineBuilder<T> {
        PipelineBuilder {
            policies: Vec::new(),
        }
    }

    /// Policy names, outermost first.
    pub fn names(&self) -> Vec<&str> {
        self.policies.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl<T: Send + 'static> Policy<T> for Pipeline<T> {
    fn name(&self) -> &str {
        "pipeline"
    }

    fn wrap(&self, inner: Operation<T>) -> Operation<T> {
        self.policies
            .iter()
            .rev()
            .fold(inner, |op, policy| policy.wrap(op))
    }
}

/// Appends policies from outermost to innermost.
pub struct PipelineBuilder<T> {
    policies: Vec<Arc<dyn Policy<T>>>,
}

impl<T: Send + 'static> PipelineBuilder<T> {
    /// Add the next (inner) policy.
    pub fn policy<P>(mut self, policy: P) -> Self
    where
        P: Policy<T> + 'static,
    {
        self.policies.push(Arc::new(policy));
        self
    }

    pub fn build(self) -> Pipeline<T> {
        Pipeline {
            policies: self.policies,
        }
    }
}
