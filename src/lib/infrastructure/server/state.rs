use crate::application::service::AgentService;
use crate::model::ModelProvider;
use std::sync::Arc;

pub(crate) struct ServerState<P: ModelProvider> {
    service: Arc<AgentService<P>>,
}

impl<P: ModelProvider> ServerState<P> {
    pub(crate) fn new(service: Arc<AgentService<P>>) -> Self {
        Self { service }
    }

    pub(crate) fn service(&self) -> &AgentService<P> {
        &self.service
    }
}
