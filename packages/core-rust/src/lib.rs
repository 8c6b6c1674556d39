//! JAX-RX core: query parameter vocabulary, resource paths, and the backend contract.

pub mod constants;
pub mod error;
pub mod listing;
pub mod output;
pub mod parameter;
pub mod path;
pub mod traits;

pub use error::{JaxRxError, JaxRxResult};
pub use output::StreamingOutput;
pub use parameter::{ParameterMap, QueryParameter, UnknownParameter};
pub use path::ResourcePath;
pub use traits::Backend;
