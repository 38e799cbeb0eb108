pub mod response;

pub use response::{Rendered, RenderedResponse, ResponseBody, status_from_code};
