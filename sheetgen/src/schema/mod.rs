pub mod parser;
pub mod types;
pub mod value;

pub use parser::{parse_extraction, parse_extraction_str};
pub use types::*;
pub use value::qualified_name;
