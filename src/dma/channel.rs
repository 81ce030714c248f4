use std::fmt::Display;

use bitfield::bitfield;
use thiserror::Error;

pub const CHANNEL_COUNT: usize = 4;

const SRC_MASK: [u32; CHANNEL_COUNT] = [0x07FF_FFFF, 0x0FFF_FFFF, 0x0FFF_FFFF, 0x0FFF_FFFF];
const DST_MASK: [u32; CHANNEL_COUNT] = [0x07FF_FFFF, 0x07FF_FFFF, 0x07FF_FFFF, 0x0FFF_FFFF];
const LEN_MASK: [u32; CHANNEL_COUNT] = [0x3FFF, 0x3FFF, 0x3FFF, 0xFFFF];

/// Index of a DMA channel. Lower index means higher priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(u8);

impl ChannelId {
    pub const DMA0: ChannelId = ChannelId(0);
    pub const DMA1: ChannelId = ChannelId(1);
    pub const DMA2: ChannelId = ChannelId(2);
    pub const DMA3: ChannelId = ChannelId(3);

    pub const ALL: [ChannelId; CHANNEL_COUNT] =
        [Self::DMA0, Self::DMA1, Self::DMA2, Self::DMA3];

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn bit(self) -> u8 {
        1 << self.0
    }

    pub(crate) fn from_bit_position(position: u32) -> Self {
        Self(position as u8)
    }
}

impl Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DMA{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("no DMA channel {0}, valid channels are 0-3")]
    OutOfRange(usize),
}

impl TryFrom<usize> for ChannelId {
    type Error = ChannelError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        if index < CHANNEL_COUNT {
            Ok(Self(index as u8))
        } else {
            Err(ChannelError::OutOfRange(index))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitSize {
    Half,
    Word,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timing {
    Immediate,
    VBlank,
    HBlank,
    Special,
}

impl From<u16> for Timing {
    fn from(bits: u16) -> Self {
        match bits & 3 {
            0 => Timing::Immediate,
            1 => Timing::VBlank,
            2 => Timing::HBlank,
            _ => Timing::Special,
        }
    }
}

/// Address update mode. `Reload` is only meaningful on the destination side;
/// on the source side the slot is reserved and behaves like `Increment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressControl {
    Increment,
    Decrement,
    Fixed,
    Reload,
}

impl From<u16> for AddressControl {
    fn from(bits: u16) -> Self {
        match bits & 3 {
            0 => AddressControl::Increment,
            1 => AddressControl::Decrement,
            2 => AddressControl::Fixed,
            _ => AddressControl::Reload,
        }
    }
}

impl AddressControl {
    /// Signed address change applied after each unit.
    pub fn step(self, size: UnitSize) -> i32 {
        let unit = match size {
            UnitSize::Half => 2,
            UnitSize::Word => 4,
        };
        match self {
            AddressControl::Increment | AddressControl::Reload => unit,
            AddressControl::Decrement => -unit,
            AddressControl::Fixed => 0,
        }
    }
}

bitfield! {
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct DmaControl(u16);
    impl Debug;
    pub u16, dst_control_bits, set_dst_control_bits: 6, 5;
    pub u16, src_control_bits, set_src_control_bits: 8, 7;
    pub repeat, set_repeat: 9;
    pub word_size, set_word_size: 10;
    pub gamepak_drq, set_gamepak_drq: 11;
    pub u16, timing_bits, set_timing_bits: 13, 12;
    pub irq, set_irq: 14;
    pub enable, set_enable: 15;
}

/// Working copies of the transfer registers, taken on the enable edge.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Latched {
    pub src: u32,
    pub dst: u32,
    pub length: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct Channel {
    id: ChannelId,
    pub src: u32,
    pub dst: u32,
    pub length: u16,
    control: DmaControl,
    pub(crate) internal: Latched,
}

impl Channel {
    pub fn new(id: ChannelId) -> Self {
        Self {
            id,
            src: 0,
            dst: 0,
            length: 0,
            control: DmaControl::default(),
            internal: Latched::default(),
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn control(&self) -> DmaControl {
        self.control
    }

    pub fn internal(&self) -> Latched {
        self.internal
    }

    pub fn enable(&self) -> bool {
        self.control.enable()
    }

    pub fn repeat(&self) -> bool {
        self.control.repeat()
    }

    pub fn irq(&self) -> bool {
        self.control.irq()
    }

    pub fn gamepak_drq(&self) -> bool {
        self.control.gamepak_drq()
    }

    pub fn unit_size(&self) -> UnitSize {
        if self.control.word_size() {
            UnitSize::Word
        } else {
            UnitSize::Half
        }
    }

    pub fn timing(&self) -> Timing {
        Timing::from(self.control.timing_bits())
    }

    pub fn dst_control(&self) -> AddressControl {
        AddressControl::from(self.control.dst_control_bits())
    }

    pub fn src_control(&self) -> AddressControl {
        AddressControl::from(self.control.src_control_bits())
    }

    pub(crate) fn disable(&mut self) {
        self.control.set_enable(false);
    }

    /// Bits 0-4 of the low byte are unused and always read back as zero.
    pub(crate) fn write_control_low(&mut self, value: u8) {
        self.control.0 = (self.control.0 & 0xFF00) | (u16::from(value) & 0x00E0);
    }

    pub(crate) fn write_control_high(&mut self, value: u8) {
        self.control.0 = (self.control.0 & 0x00FF) | (u16::from(value) << 8);
    }

    pub(crate) fn read_control_low(&self) -> u8 {
        self.control.0 as u8
    }

    pub(crate) fn read_control_high(&self) -> u8 {
        (self.control.0 >> 8) as u8
    }

    /// Programmed length clipped to the channel's counter width, with 0
    /// standing for a full-range transfer.
    pub fn masked_length(&self) -> u32 {
        let mask = LEN_MASK[self.id.index()];
        match u32::from(self.length) & mask {
            0 => mask + 1,
            length => length,
        }
    }

    pub(crate) fn latch(&mut self) {
        let index = self.id.index();
        self.internal = Latched {
            src: self.src & SRC_MASK[index],
            dst: self.dst & DST_MASK[index],
            length: self.masked_length(),
        };
    }

    pub(crate) fn reload_length(&mut self) {
        self.internal.length = self.masked_length();
    }

    pub(crate) fn reload_dst(&mut self) {
        self.internal.dst = self.dst & DST_MASK[self.id.index()];
    }
}
