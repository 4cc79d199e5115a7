pub mod request;
pub mod response;

pub use request::{JsonRpcBody, RPCRequest};
pub use response::{rewrite_id, JsonRpcError, JsonRpcErrorResponse};
