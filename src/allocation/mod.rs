mod overview;
mod weights;

pub use overview::*;
pub use weights::*;
