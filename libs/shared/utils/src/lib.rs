pub mod extractor;
pub mod jwt;
pub mod text;
pub mod test_utils;
