pub mod error_details;
pub mod rate_limit;

pub use cutout_infra::{request_id_middleware, security_headers_middleware};
pub use error_details::{error_details_middleware, ErrorDetailPolicy};
pub use rate_limit::{rate_limit_middleware, RateLimitState};
