pub mod builder;
pub mod liquid_exts;

pub use builder::Templates;
