pub mod account;
pub mod profile;

pub use account::*;
pub use profile::*;
