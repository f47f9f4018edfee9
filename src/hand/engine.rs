//! The `HandEngine` contract (spec §6): everything a `HandRunner` needs from
//! the rules engine, regardless of which implementation backs it.

use botpoker_shared::{ActionLabel, Card, HandResult, NormalizedAction, Street};

use crate::error::HandError;

pub trait HandEngine: Send {
    fn active_seat(&self) -> Option<usize>;
    fn valid_actions(&self) -> Vec<ActionLabel>;
    fn apply_action(&mut self, seat: usize, action: NormalizedAction) -> Result<(), HandError>;
    /// Idempotent for an already-folded seat.
    fn force_fold(&mut self, seat: usize);
    fn current_street(&self) -> Street;
    /// Advance to the next street without soliciting action, for dealing the
    /// remaining board when every active seat is all-in (spec §4.4.2).
    fn advance_street(&mut self) -> Result<(), HandError>;
    fn is_complete(&self) -> bool;
    /// Per pot, in pot order, the set of winning seats.
    fn get_winners(&self) -> Vec<Vec<usize>>;
    /// Seats credited at resolution, with the amount each was paid.
    fn winner_payouts(&self) -> Vec<(usize, u32)>;
    fn pot(&self) -> u32;
    fn to_call(&self, seat: usize) -> u32;
    fn min_bet(&self) -> u32;
    fn min_raise(&self) -> u32;
    fn seat_count(&self) -> usize;
    fn seat_chips(&self, seat: usize) -> u32;
    fn seat_bet(&self, seat: usize) -> u32;
    fn seat_total_bet(&self, seat: usize) -> u32;
    fn seat_folded(&self, seat: usize) -> bool;
    fn seat_all_in(&self, seat: usize) -> bool;
    fn board(&self) -> Vec<Card>;
    fn hole_cards(&self, seat: usize) -> [Card; 2];
    /// Populated once `is_complete()` is true and the hand actually reached
    /// showdown (empty for a fold-out resolution).
    fn showdown_results(&self) -> Vec<HandResult>;
}
