mod asset_class;
mod holding;
mod id;

pub use asset_class::{AssetClass, Bucket};
pub use holding::{Holding, HoldingPatch, HoldingView, NewHolding};
pub use id::Id;
