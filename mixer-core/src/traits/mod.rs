pub use mixer::*;
pub use price_feed::*;

mod mixer;
mod price_feed;
