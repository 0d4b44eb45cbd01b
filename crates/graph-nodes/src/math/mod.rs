//! Math nodes
//!
//! Arithmetic over float and numeric inputs.

mod add;
mod multiply;
mod sum;

pub use add::Add;
pub use multiply::Multiply;
pub use sum::Sum;
