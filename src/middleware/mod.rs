/// Middleware module
///
/// Access token authentication and request logging.

mod jwt_middleware;
mod logger;

pub use jwt_middleware::{AuthenticatedSubject, JwtMiddleware};
pub use logger::LoggerMiddleware;
