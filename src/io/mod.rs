pub mod csv;

pub use csv::{read_wishes, write_wishes};
