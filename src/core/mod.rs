pub mod domain;
pub mod grid;
pub mod spatial;
