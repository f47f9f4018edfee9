//! Human-readable one-line rendering of broadcast hand events, for the demo
//! binary's console log (SPEC_FULL §10). Mirrors the teacher's `pretty.rs`
//! card-face helpers, retargeted at `ServerFrame` instead of `ActionEvent`.

use botpoker_shared::{ActionLabel, Card, CardRank, CardSuit, ServerFrame, Street};
use owo_colors::OwoColorize;

fn rank_str(rank: CardRank) -> &'static str {
    match rank {
        CardRank::Ace => "A",
        CardRank::Two => "2",
        CardRank::Three => "3",
        CardRank::Four => "4",
        CardRank::Five => "5",
        CardRank::Six => "6",
        CardRank::Seven => "7",
        CardRank::Eight => "8",
        CardRank::Nine => "9",
        CardRank::Ten => "T",
        CardRank::Jack => "J",
        CardRank::Queen => "Q",
        CardRank::King => "K",
    }
}

fn suit_icon(suit: CardSuit) -> char {
    match suit {
        CardSuit::Clubs => '♣',
        CardSuit::Diamonds => '♦',
        CardSuit::Hearts => '♥',
        CardSuit::Spades => '♠',
    }
}

fn card_face(c: Card) -> String {
    let s = format!("{}{}", rank_str(c.rank()), suit_icon(c.suit()));
    match c.suit() {
        CardSuit::Hearts | CardSuit::Diamonds => s.red().to_string(),
        CardSuit::Clubs | CardSuit::Spades => s.to_string(),
    }
}

fn cards_str(cards: &[Card]) -> String {
    cards.iter().map(|&c| card_face(c)).collect::<Vec<_>>().join(" ")
}

fn street_str(street: Street) -> &'static str {
    match street {
        Street::Preflop => "preflop",
        Street::Flop => "flop",
        Street::Turn => "turn",
        Street::River => "river",
        Street::Showdown => "showdown",
    }
}

fn action_str(action: ActionLabel) -> &'static str {
    match action {
        ActionLabel::Fold => "folds",
        ActionLabel::Check => "checks",
        ActionLabel::Call => "calls",
        ActionLabel::Raise => "raises",
        ActionLabel::AllIn => "is all-in",
        ActionLabel::PostSmallBlind => "posts small blind",
        ActionLabel::PostBigBlind => "posts big blind",
        ActionLabel::TimeoutFold => "folds (timeout)",
    }
}

/// Render one frame as a single-line human-readable string, or `None` for
/// frames not worth printing (`game_update`'s per-seat snapshot is noisy and
/// redundant with `player_action`).
pub fn render(frame: &ServerFrame) -> Option<String> {
    match frame {
        ServerFrame::HandStart {
            hand_id,
            your_seat,
            hole_cards,
            small_blind,
            big_blind,
            ..
        } => Some(format!(
            "{} seat {} dealt {} (blinds {}/{})",
            hand_id.bold(),
            your_seat,
            cards_str(hole_cards),
            small_blind,
            big_blind
        )),
        ServerFrame::ActionRequest {
            hand_id,
            pot,
            to_call,
            ..
        } => Some(format!(
            "{} action requested (pot {}, to call {})",
            hand_id, pot, to_call
        )),
        ServerFrame::PlayerAction {
            hand_id,
            street,
            player_name,
            action,
            amount_paid,
            pot,
            ..
        } => Some(format!(
            "{} [{}] {} {}{} (pot {})",
            hand_id,
            street_str(*street),
            player_name.bold(),
            action_str(*action),
            if *amount_paid > 0 {
                format!(" {}", amount_paid)
            } else {
                String::new()
            },
            pot
        )),
        ServerFrame::GameUpdate { .. } => None,
        ServerFrame::StreetChange {
            hand_id,
            street,
            board,
        } => Some(format!(
            "{} -- {} -- {}",
            hand_id,
            street_str(*street),
            cards_str(board)
        )),
        ServerFrame::HandResult {
            hand_id, winners, ..
        } => {
            let summary = winners
                .iter()
                .map(|w| format!("{} +{}", w.name, w.amount))
                .collect::<Vec<_>>()
                .join(", ");
            Some(format!("{} result: {}", hand_id, summary))
        }
        ServerFrame::GameCompleted {
            game_id,
            hands_completed,
            reason,
            ..
        } => Some(format!(
            "{} complete after {} hands ({})",
            game_id, hands_completed, reason
        )),
        ServerFrame::Error { message } => Some(format!("error: {}", message.red())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botpoker_shared::{SeatInfo, WinnerInfo};

    #[test]
    fn hand_start_renders_hole_cards() {
        let frame = ServerFrame::HandStart {
            hand_id: "hand-1".into(),
            players: vec![SeatInfo {
                name: "a".into(),
                chips: 1000,
                seat: 0,
            }],
            button: 0,
            your_seat: 0,
            hole_cards: [Card(0), Card(13)],
            small_blind: 5,
            big_blind: 10,
        };
        let line = render(&frame).unwrap();
        assert!(line.contains("hand-1"));
        assert!(line.contains("blinds 5/10"));
    }

    #[test]
    fn game_update_is_suppressed() {
        let frame = ServerFrame::GameUpdate {
            hand_id: "hand-1".into(),
            pot: 0,
            players: Vec::new(),
        };
        assert!(render(&frame).is_none());
    }

    #[test]
    fn hand_result_lists_winners() {
        let frame = ServerFrame::HandResult {
            hand_id: "hand-1".into(),
            winners: vec![WinnerInfo {
                name: "a".into(),
                amount: 15,
                hole_cards: [Card(0), Card(13)],
                hand_rank: botpoker_shared::HandRank {
                    category: botpoker_shared::HandRankCategory::HighCard,
                    tiebreakers: vec![],
                },
            }],
            board: vec![],
            showdown: vec![],
        };
        let line = render(&frame).unwrap();
        assert!(line.contains("a +15"));
    }
}
