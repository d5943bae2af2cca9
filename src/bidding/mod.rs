pub mod commands;

pub use commands::{handle_place_bid, BidError, PlaceBidCommand};
