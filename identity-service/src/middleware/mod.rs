pub mod protection;

pub use protection::{protection_middleware, ProtectedResource, Protection};
