use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use keygate::Registry;
use tower::BoxError;
use tower::Layer;
use tower::Service;
use tower::util::BoxCloneSyncService;

use crate::AdmissionLayer;
use crate::KeygateError;
use crate::key::KeyExtractor;

/// A pre-composed admission stack with a deadline on the inner service.
///
/// ### Error Responsibilities:
/// - **Rejection (`KeygateError::RateLimited`)**: The caller's limiter denied the
///   request. This is decided before the inner service is called and is near-instant.
/// - **Timeout (`KeygateError::Timeout`)**: The *inner service* took longer than
///   `max_duration` to respond.
/// - **Inner (`KeygateError::Inner`)**: Any other failure of the inner service.
pub struct ManagedAdmissionLayer<K, Req> {
    admission: AdmissionLayer<K>,
    max_duration: Duration,
    _phantom: PhantomData<fn(Req)>,
}

// Note: Deriving Clone causes issues when using the layer with Axum.
// We'll just implemented it explicitly.
impl<K: Clone, Req> Clone for ManagedAdmissionLayer<K, Req> {
    fn clone(&self) -> Self {
        Self {
            admission: self.admission.clone(),
            max_duration: self.max_duration,
            _phantom: PhantomData,
        }
    }
}

impl<S, K, Req> Layer<S> for ManagedAdmissionLayer<K, Req>
where
    K: KeyExtractor<Req> + Clone + Send + Sync + 'static,
    S: Service<Req, Error = BoxError> + Clone + Send + Sync + 'static,
    S::Future: Send + 'static,
    S::Response: 'static,
    Req: Send + 'static,
{
    type Service = BoxCloneSyncService<Req, S::Response, BoxError>;

    fn layer(&self, inner: S) -> Self::Service {
        let svc = tower::ServiceBuilder::new()
            .map_err(|err: BoxError| {
                if err.is::<tower::timeout::error::Elapsed>() {
                    BoxError::from(KeygateError::Timeout)
                } else if err.is::<KeygateError>() {
                    err
                } else {
                    // Wrap any other inner service errors
                    Box::from(KeygateError::Inner(err.to_string()))
                }
            })
            .layer(self.admission.clone())
            .timeout(self.max_duration)
            .service(inner);

        BoxCloneSyncService::new(svc)
    }
}

impl<K, Req> ManagedAdmissionLayer<K, Req> {
    pub fn new(registry: Arc<Registry>, extractor: K, max_duration: Duration) -> Self {
        Self {
            admission: AdmissionLayer::new(registry, extractor),
            max_duration,
            _phantom: PhantomData,
        }
    }
}
