//! Function-call vocabulary shared by the dispatcher and its transports.
//!
//! - `name`: the closed set of callable functions (`FunctionName`)
//! - `params`: typed parameters per function
//! - `results`: typed result payloads per function
//! - `response`: the `{ result, error? }` envelope returned to transports

mod name;
pub mod params;
mod response;
pub mod results;

pub use name::FunctionName;
pub use response::FunctionCallResponse;
