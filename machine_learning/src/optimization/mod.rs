mod gradient_descent;
mod newton;
mod optimizer;

pub use gradient_descent::GradientDescent;
pub use newton::Newton;
pub use optimizer::{Optimizer, StepKind};
