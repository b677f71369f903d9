pub use job::*;
pub use prices::*;
pub use transaction::*;
pub use withdraw::*;

mod job;
mod prices;
mod transaction;
mod withdraw;
