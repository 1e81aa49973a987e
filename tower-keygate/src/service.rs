use std::future::Future;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Context;
use std::task::Poll;
use std::time::Duration;

use keygate::Reason;
use keygate::Registry;
use keygate::Strategy;
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::Counter;
use pin_project_lite::pin_project;
use tower::BoxError;
use tower::Service;
use tracing::trace;
use tracing::warn;

use crate::error::KeygateError;
use crate::key::KeyExtractor;
use crate::key::UNKNOWN_KEY;

#[derive(Clone, Debug)]
struct AdmissionMetrics {
    admitted: Counter<u64>,
    rejected: Counter<u64>,
    attributes: [KeyValue; 1],
}

/// Forwards admitted requests to the inner service and rejects the rest.
#[derive(Clone, Debug)]
pub struct AdmissionService<K, S> {
    inner: S,
    registry: Arc<Registry>,
    extractor: K,
    instruments: AdmissionMetrics,
}

pin_project! {
    /// Either the inner service's future or an immediate rejection.
    pub struct ResponseFuture<F> {
        #[pin]
        kind: Kind<F>,
    }
}

pin_project! {
    #[project = KindProj]
    enum Kind<F> {
        Admitted {
            #[pin]
            future: F,
        },
        Rejected {
            retry_after: Duration,
        },
    }
}

impl<F, T> Future for ResponseFuture<F>
where
    F: Future<Output = Result<T, BoxError>>,
{
    type Output = Result<T, BoxError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project().kind.project() {
            KindProj::Admitted { future } => future.poll(cx),
            KindProj::Rejected { retry_after } => {
                Poll::Ready(Err(Box::new(KeygateError::RateLimited {
                    retry_after: *retry_after,
                })))
            }
        }
    }
}

impl<K, S, Req> Service<Req> for AdmissionService<K, S>
where
    K: KeyExtractor<Req>,
    S: Service<Req, Error = BoxError>,
{
    type Response = S::Response;
    type Error = BoxError;
    type Future = ResponseFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Admission is decided per request in `call`, once the key is known
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let key = self.extractor.extract(&req).unwrap_or_else(|| {
            warn!("request has no client key, using the shared fallback limiter");
            UNKNOWN_KEY.to_owned()
        });

        // The registry lock is released before the limiter is consulted
        let limiter = self.registry.get_or_create(&key);

        let kind = match limiter.process() {
            ControlFlow::Continue(_) => {
                trace!(%key, "request allowed");
                self.instruments
                    .admitted
                    .add(1, &self.instruments.attributes);
                Kind::Admitted {
                    future: self.inner.call(req),
                }
            }
            ControlFlow::Break(Reason::Overloaded { retry_after }) => {
                trace!(%key, ?retry_after, "request denied");
                self.instruments
                    .rejected
                    .add(1, &self.instruments.attributes);
                Kind::Rejected { retry_after }
            }
        };

        ResponseFuture { kind }
    }
}

impl<K, S> AdmissionService<K, S> {
    pub fn new(inner: S, registry: Arc<Registry>, extractor: K) -> Self {
        let meter = global::meter("keygate");
        let instruments = AdmissionMetrics {
            admitted: meter.u64_counter("admitted").build(),
            rejected: meter.u64_counter("rejected").build(),
            attributes: [KeyValue::new("algorithm", registry.config().name())],
        };

        Self {
            inner,
            registry,
            extractor,
            instruments,
        }
    }
}
