mod operation;
mod tier;
mod usage;

pub use operation::*;
pub use tier::*;
pub use usage::*;
