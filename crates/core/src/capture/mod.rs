pub mod domain;
pub mod feed;
pub mod infrastructure;
