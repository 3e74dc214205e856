pub mod builder;
pub mod footprint;
