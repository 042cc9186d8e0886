pub mod descriptor;
pub mod errors;
pub mod variable;

pub use descriptor::*;
pub use errors::*;
pub use variable::*;
