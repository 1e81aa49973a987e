/// The key shared by all requests whose caller cannot be identified.
///
/// A caller whose extracted key is literally `"unknown"` shares this limiter too.
pub const UNKNOWN_KEY: &str = "unknown";

/// Derives the client key of a request.
///
/// Requests with equal keys share one limiter. Closures of the form
/// `Fn(&Req) -> Option<String>` implement this trait.
pub trait KeyExtractor<Req> {
    /// Returns the client key, or `None` if the caller cannot be identified.
    fn extract(&self, req: &Req) -> Option<String>;
}

impl<F, Req> KeyExtractor<Req> for F
where
    F: Fn(&Req) -> Option<String>,
{
    fn extract(&self, req: &Req) -> Option<String> {
        self(req)
    }
}

#[cfg(feature = "axum")]
mod http_keys {
    use std::net::SocketAddr;

    use axum::extract::ConnectInfo;
    use http::HeaderMap;
    use http::Request;

    use super::KeyExtractor;

    /// Keys requests by the IP address of the connected peer.
    ///
    /// Requires the server to be started with
    /// `into_make_service_with_connect_info::<SocketAddr>()`.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct PeerIp;

    impl<B> KeyExtractor<Request<B>> for PeerIp {
        fn extract(&self, req: &Request<B>) -> Option<String> {
            peer_ip(req)
        }
    }

    /// Keys requests by the client address reported by a reverse proxy.
    ///
    /// Uses the first `X-Forwarded-For` entry, then `X-Real-IP`, then the peer
    /// address. Only trust this behind a proxy that overwrites those headers.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct RealIp;

    impl<B> KeyExtractor<Request<B>> for RealIp {
        fn extract(&self, req: &Request<B>) -> Option<String> {
            forwarded_for(req.headers())
                .or_else(|| header_value(req.headers(), "x-real-ip"))
                .or_else(|| peer_ip(req))
        }
    }

    fn peer_ip<B>(req: &Request<B>) -> Option<String> {
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    }

    fn forwarded_for(headers: &HeaderMap) -> Option<String> {
        header_value(headers, "x-forwarded-for")?
            .split(',')
            .next()
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_owned)
    }

    fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
        let value = headers.get(name)?.to_str().ok()?.trim();
        (!value.is_empty()).then(|| value.to_owned())
    }

}

#[cfg(feature = "axum")]
pub use http_keys::PeerIp;
#[cfg(feature = "axum")]
pub use http_keys::RealIp;
