pub mod evaluation;
pub mod model;

pub use evaluation::{Auction, BidReason, BidValidation};
pub use model::{Bid, Item};
