mod color_record;
mod hex_code;

pub use color_record::ColorRecord;
pub use hex_code::{HexCode, HexCodeError};
