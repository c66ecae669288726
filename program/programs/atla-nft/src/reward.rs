use crate::state::{ItemId, RewardState};

/// Single slot holding the most recently assigned reward item.
///
/// Written only by a successful fulfillment.
#[derive(Debug, Clone, Default)]
pub struct RewardSlot {
    state: RewardState,
}

impl RewardSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> RewardState {
        self.state
    }

    pub(crate) fn assign(&mut self, item_id: ItemId) {
        self.state = RewardState {
            value: item_id,
            set: true,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unset() {
        assert_eq!(
            RewardSlot::new().current(),
            RewardState {
                value: 0,
                set: false
            }
        );
    }

    #[test]
    fn assign_overwrites() {
        let mut slot = RewardSlot::new();
        slot.assign(4);
        slot.assign(2);
        assert_eq!(slot.current(), RewardState { value: 2, set: true });
    }
}
