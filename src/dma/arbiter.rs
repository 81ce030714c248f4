use std::ops::BitAnd;

use tracing::trace;

use super::{channel::ChannelId, DmaController};

/// Bitset over the four channels, bit `n` standing for channel `n`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelSet(u8);

impl ChannelSet {
    pub const EMPTY: ChannelSet = ChannelSet(0);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, id: ChannelId) -> bool {
        self.0 & id.bit() != 0
    }

    pub fn insert(&mut self, id: ChannelId) {
        self.0 |= id.bit();
    }

    pub fn remove(&mut self, id: ChannelId) {
        self.0 &= !id.bit();
    }

    /// Lowest-indexed member, i.e. the one that wins arbitration.
    pub fn highest_priority(self) -> Option<ChannelId> {
        if self.is_empty() {
            None
        } else {
            Some(ChannelId::from_bit_position(self.0.trailing_zeros()))
        }
    }

    /// Members in priority order.
    pub fn iter(self) -> impl Iterator<Item = ChannelId> {
        ChannelId::ALL.into_iter().filter(move |id| self.contains(*id))
    }
}

impl BitAnd for ChannelSet {
    type Output = ChannelSet;

    fn bitand(self, rhs: Self) -> Self::Output {
        ChannelSet(self.0 & rhs.0)
    }
}

impl FromIterator<ChannelId> for ChannelSet {
    fn from_iter<T: IntoIterator<Item = ChannelId>>(iter: T) -> Self {
        let mut set = ChannelSet::EMPTY;
        for id in iter {
            set.insert(id);
        }
        set
    }
}

impl DmaController {
    /// Schedules `id` for execution.
    ///
    /// An idle controller starts on `id` right away. Otherwise `id` only takes
    /// over if it outranks the running channel, in which case the running
    /// channel is told to stop at its next unit boundary. Anything else waits
    /// in the run set.
    pub fn mark_runnable(&mut self, id: ChannelId) {
        if self.run_set.is_empty() {
            trace!(target: "dma", "{id} starts on idle controller");
            self.current = id;
        } else if id < self.current {
            trace!(target: "dma", "{id} preempts {}", self.current);
            self.current = id;
            self.interleaved = true;
        } else {
            trace!(target: "dma", "{id} queued behind {}", self.current);
        }

        self.run_set.insert(id);
    }

    /// Picks the next channel after the current one left the run set.
    pub(super) fn reselect(&mut self) {
        if let Some(next) = self.run_set.highest_priority() {
            self.current = next;
        }
    }
}
