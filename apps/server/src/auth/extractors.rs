use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};

use crate::error::AppError;

/// Form service credential passed through from the caller's
/// `Authorization: Bearer <token>` header
///
/// Usage in handlers:
/// ```ignore
/// async fn my_handler(credential: BearerCredential) -> HttpResponse {
///     // credential.0 is the raw token
/// }
/// ```
pub struct BearerCredential(pub String);

impl FromRequest for BearerCredential {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let header = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok());

        let result = match header {
            None => Err(AppError::Unauthorized(
                "Missing Authorization header".to_string(),
            )),
            Some(value) => match value.strip_prefix("Bearer ") {
                Some(token) if !token.trim().is_empty() => {
                    Ok(BearerCredential(token.trim().to_string()))
                }
                _ => Err(AppError::Unauthorized(
                    "Invalid Authorization header format, expected 'Bearer <token>'".to_string(),
                )),
            },
        };

        ready(result)
    }
}

/// Who is asking, for quota accounting: the client IP as reported by the
/// connection info (honours `Forwarded` / `X-Forwarded-For`)
pub struct RequesterIdentity(pub String);

impl FromRequest for RequesterIdentity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let identity = req
            .connection_info()
            .realip_remote_addr()
            .map(strip_port)
            .unwrap_or_else(|| "unknown".to_string());

        ready(Ok(RequesterIdentity(identity)))
    }
}

/// `1.2.3.4:5678` → `1.2.3.4`, `[::1]:80` → `::1`; bare addresses pass through
fn strip_port(addr: &str) -> String {
    if let Ok(socket) = addr.parse::<std::net::SocketAddr>() {
        return socket.ip().to_string();
    }
    addr.to_string()
}
