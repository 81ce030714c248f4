use std::array;

use tracing::trace;

mod arbiter;
mod channel;
mod engine;
mod registers;

pub use arbiter::ChannelSet;
pub use channel::{
    AddressControl, Channel, ChannelError, ChannelId, DmaControl, Latched, Timing, UnitSize,
    CHANNEL_COUNT,
};
pub use registers::{BLOCK_SIZE, IO_BASE};

/// Sound FIFOs and the channel that feeds each of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fifo {
    A,
    B,
}

impl Fifo {
    pub fn channel(self) -> ChannelId {
        match self {
            Fifo::A => ChannelId::DMA1,
            Fifo::B => ChannelId::DMA2,
        }
    }
}

/// The four DMA channels and the scheduling state shared between them.
#[derive(Debug, Clone)]
pub struct DmaController {
    channels: [Channel; CHANNEL_COUNT],
    hblank_mask: ChannelSet,
    vblank_mask: ChannelSet,
    run_set: ChannelSet,
    current: ChannelId,
    interleaved: bool,
}

impl Default for DmaController {
    fn default() -> Self {
        Self {
            channels: array::from_fn(|index| Channel::new(ChannelId::ALL[index])),
            hblank_mask: ChannelSet::EMPTY,
            vblank_mask: ChannelSet::EMPTY,
            run_set: ChannelSet::EMPTY,
            current: ChannelId::DMA0,
            interleaved: false,
        }
    }
}

impl DmaController {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn channel(&self, id: ChannelId) -> &Channel {
        &self.channels[id.index()]
    }

    /// Channel `run` will work on. Only meaningful while `is_active`.
    pub fn current(&self) -> ChannelId {
        self.current
    }

    pub fn run_set(&self) -> ChannelSet {
        self.run_set
    }

    /// Whether some channel is waiting for `run`.
    pub fn is_active(&self) -> bool {
        !self.run_set.is_empty()
    }

    fn enabled(&self) -> ChannelSet {
        self.channels
            .iter()
            .filter(|channel| channel.enable())
            .map(Channel::id)
            .collect()
    }

    pub fn trigger_hblank(&mut self) {
        let ready = self.hblank_mask & self.enabled();
        self.trigger(ready, "hblank");
    }

    pub fn trigger_vblank(&mut self) {
        let ready = self.vblank_mask & self.enabled();
        self.trigger(ready, "vblank");
    }

    fn trigger(&mut self, ready: ChannelSet, event: &str) {
        for id in ready.iter() {
            trace!(target: "dma", "{event} triggers {id}");
            self.mark_runnable(id);
        }
    }

    /// Called by the sound unit when `fifo` wants more samples.
    pub fn request_fifo(&mut self, fifo: Fifo) {
        let id = fifo.channel();
        let channel = &self.channels[id.index()];
        if channel.enable() && channel.timing() == Timing::Special {
            self.mark_runnable(id);
        } else {
            trace!(target: "dma", "FIFO {fifo:?} request ignored, {id} not armed for it");
        }
    }
}
