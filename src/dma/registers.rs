use tracing::debug;

use super::{
    channel::{ChannelId, Timing},
    DmaController,
};

/// First byte of the DMA0 register block in the I/O map.
pub const IO_BASE: u32 = 0x0400_00B0;
/// Bytes per channel: SAD, DAD, CNT_L, CNT_H.
pub const BLOCK_SIZE: u32 = 12;

/// Splits an I/O address into channel and register offset.
fn decode_io(addr: u32) -> Option<(ChannelId, usize)> {
    let relative = addr.checked_sub(IO_BASE)?;
    let id = ChannelId::try_from((relative / BLOCK_SIZE) as usize).ok()?;
    Some((id, (relative % BLOCK_SIZE) as usize))
}

fn merge_byte(field: u32, offset: usize, value: u8) -> u32 {
    let shift = offset * 8;
    (field & !(0xFF << shift)) | (u32::from(value) << shift)
}

impl DmaController {
    /// Only the control bytes are readable, everything else reads as zero.
    pub fn read(&self, id: ChannelId, offset: usize) -> u8 {
        let channel = &self.channels[id.index()];
        match offset {
            10 => channel.read_control_low(),
            11 => channel.read_control_high(),
            _ => 0,
        }
    }

    pub fn write(&mut self, id: ChannelId, offset: usize, value: u8) {
        let channel = &mut self.channels[id.index()];
        match offset {
            0..=3 => channel.src = merge_byte(channel.src, offset, value),
            4..=7 => channel.dst = merge_byte(channel.dst, offset - 4, value),
            8..=9 => {
                channel.length = merge_byte(u32::from(channel.length), offset - 8, value) as u16
            }
            10 => channel.write_control_low(value),
            11 => {
                let was_enabled = channel.enable();
                channel.write_control_high(value);
                let timing = channel.timing();

                match timing {
                    Timing::HBlank => {
                        self.hblank_mask.insert(id);
                        self.vblank_mask.remove(id);
                    }
                    Timing::VBlank => {
                        self.hblank_mask.remove(id);
                        self.vblank_mask.insert(id);
                    }
                    Timing::Immediate | Timing::Special => {
                        self.hblank_mask.remove(id);
                        self.vblank_mask.remove(id);
                    }
                }

                let channel = &mut self.channels[id.index()];
                if !was_enabled && channel.enable() {
                    channel.latch();
                    let latched = channel.internal();
                    debug!(
                        target: "dma",
                        "{id} latched src={:#010X} dst={:#010X} len={:#X} {:?}",
                        latched.src, latched.dst, latched.length, timing
                    );

                    if timing == Timing::Immediate {
                        self.mark_runnable(id);
                    }
                }
            }
            _ => {}
        }
    }

    /// Reads a byte from the DMA part of the I/O map, `None` outside of it.
    pub fn read_io(&self, addr: u32) -> Option<u8> {
        decode_io(addr).map(|(id, offset)| self.read(id, offset))
    }

    /// Returns whether `addr` belonged to the DMA registers.
    pub fn write_io(&mut self, addr: u32, value: u8) -> bool {
        match decode_io(addr) {
            Some((id, offset)) => {
                self.write(id, offset, value);
                true
            }
            None => false,
        }
    }
}
