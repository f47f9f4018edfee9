pub use botpoker_shared::{CardRank, CardSuit};
