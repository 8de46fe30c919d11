use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Params;
use crate::engine::data_context::DataContext;
use crate::engine::manager::ClusterManager;

/// Everything one run shares across its vertices: the caller's cancellation
/// token, data context and parameters, plus the manager that started it so
/// subgraph vertices can recurse.
#[derive(Clone)]
pub struct RunScope {
    pub(crate) cancel: CancellationToken,
    pub(crate) data: Arc<DataContext>,
    pub(crate) params: Option<Params>,
    pub(crate) manager: ClusterManager,
}

impl RunScope {
    pub(crate) fn new(
        cancel: CancellationToken,
        data: Arc<DataContext>,
        params: Option<Params>,
        manager: ClusterManager,
    ) -> Self {
        Self {
            cancel,
            data,
            params,
            manager,
        }
    }

    pub fn data(&self) -> &Arc<DataContext> {
        &self.data
    }

    pub fn params(&self) -> Option<&Params> {
        self.params.as_ref()
    }
}
