use std::sync::Arc;

use crate::core::config::Settings;
use crate::grading::{Resolvers, ScoringEngine};
use crate::services::ResolverBackends;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    resolvers: Resolvers,
    backends: ResolverBackends,
    engine: ScoringEngine,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        resolvers: Resolvers,
        backends: ResolverBackends,
        engine: ScoringEngine,
    ) -> Self {
        Self { inner: Arc::new(InnerState { settings, resolvers, backends, engine }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn resolvers(&self) -> &Resolvers {
        &self.inner.resolvers
    }

    pub(crate) fn backends(&self) -> ResolverBackends {
        self.inner.backends
    }

    pub(crate) fn engine(&self) -> &ScoringEngine {
        &self.inner.engine
    }
}
