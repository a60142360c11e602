//! Safe SQL builder: table names from metadata only, fields and values as parameters.

mod builder;
pub use builder::*;
