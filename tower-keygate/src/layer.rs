use std::sync::Arc;

use keygate::Registry;
use tower::Layer;

use crate::service::AdmissionService;

/// Applies per-client admission control to requests.
///
/// All services produced by one layer, and all their clones, share the layer's
/// registry: a client's budget is the same whichever clone handles its request.
#[derive(Debug, Clone)]
pub struct AdmissionLayer<K> {
    registry: Arc<Registry>,
    extractor: K,
}

impl<K> AdmissionLayer<K> {
    /// Create an AdmissionLayer
    pub fn new(registry: Arc<Registry>, extractor: K) -> Self {
        AdmissionLayer {
            registry,
            extractor,
        }
    }
}

impl<K, S> Layer<S> for AdmissionLayer<K>
where
    K: Clone,
{
    type Service = AdmissionService<K, S>;

    fn layer(&self, service: S) -> Self::Service {
        AdmissionService::new(service, self.registry.clone(), self.extractor.clone())
    }
}
