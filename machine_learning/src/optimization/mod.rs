mod adadelta;
mod adagrad;
mod adam;
mod ftrl;
mod gradient_descent;
mod optimizer;
mod rmsprop;
mod spec;

pub use adadelta::Adadelta;
pub use adagrad::Adagrad;
pub use adam::Adam;
pub use ftrl::Ftrl;
pub use gradient_descent::GradientDescent;
pub use optimizer::Optimizer;
pub use rmsprop::RmsProp;
pub use spec::OptimizerSpec;
