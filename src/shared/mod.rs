pub mod security;
pub mod test_helpers;
