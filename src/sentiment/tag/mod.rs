pub mod dict;
pub mod resolver;
