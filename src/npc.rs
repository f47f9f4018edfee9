//! NPC seat strategy hook (spec §9 "Bot role plugin-point", SPEC_FULL §15).
//!
//! An NPC seat has no transport behind it; `HandRunner::wait_for_action`
//! consults this trait instead of waiting on the seat's inbox. The strategy
//! still returns an `ActionEnvelope`, so NPC and player seats are resolved
//! through the exact same `HandEngine::apply_action` path.

use botpoker_shared::{ActionFrame, ActionEnvelope, BotId, ClientActionKind};
use rand::random;

/// Everything an NPC strategy needs to decide, mirroring the fields of an
/// `action_request` frame (spec §6).
#[derive(Debug, Clone, Copy)]
pub struct NpcContext {
    pub stack: u32,
    pub to_call: u32,
    pub pot: u32,
    pub min_raise: u32,
    pub big_blind: u32,
}

pub trait NpcStrategy: Send + Sync {
    fn decide(&self, bot_id: &BotId, ctx: &NpcContext) -> ActionEnvelope;
}

/// Ported from the teacher's `bot::SimpleBot`: opens for the big blind when
/// nothing is owed, otherwise folds with a probability that scales with bet
/// size relative to stack.
#[derive(Debug, Clone)]
pub struct SimpleNpcStrategy {
    pub base_fold_chance: f64,
    pub max_fold_chance: f64,
}

impl Default for SimpleNpcStrategy {
    fn default() -> Self {
        Self {
            base_fold_chance: 0.10,
            max_fold_chance: 0.95,
        }
    }
}

impl NpcStrategy for SimpleNpcStrategy {
    fn decide(&self, bot_id: &BotId, ctx: &NpcContext) -> ActionEnvelope {
        let action = if ctx.to_call == 0 {
            ActionFrame {
                action: ClientActionKind::Raise,
                amount: ctx.big_blind.max(ctx.min_raise),
            }
        } else if ctx.to_call >= ctx.stack {
            ActionFrame {
                action: ClientActionKind::Call,
                amount: 0,
            }
        } else {
            let relative_bet = ctx.to_call as f64 / (ctx.stack + ctx.pot).max(1) as f64;
            let fold_chance = (self.base_fold_chance + relative_bet * (1.0 - self.base_fold_chance))
                .min(self.max_fold_chance);
            if random::<f64>() < fold_chance {
                ActionFrame {
                    action: ClientActionKind::Fold,
                    amount: 0,
                }
            } else {
                ActionFrame {
                    action: ClientActionKind::Call,
                    amount: 0,
                }
            }
        };
        ActionEnvelope {
            bot_id: bot_id.clone(),
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_big_blind_with_nothing_owed() {
        let strat = SimpleNpcStrategy::default();
        let ctx = NpcContext {
            stack: 1000,
            to_call: 0,
            pot: 0,
            min_raise: 10,
            big_blind: 10,
        };
        let env = strat.decide(&BotId::from("npc-1"), &ctx);
        assert_eq!(env.action.action, ClientActionKind::Raise);
        assert_eq!(env.action.amount, 10);
    }

    #[test]
    fn calls_when_call_would_be_all_in() {
        let strat = SimpleNpcStrategy::default();
        let ctx = NpcContext {
            stack: 50,
            to_call: 100,
            pot: 40,
            min_raise: 10,
            big_blind: 10,
        };
        let env = strat.decide(&BotId::from("npc-1"), &ctx);
        assert_eq!(env.action.action, ClientActionKind::Call);
    }
}
