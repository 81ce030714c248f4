use tracing::debug;

use super::{
    channel::{AddressControl, ChannelId, Timing, UnitSize},
    DmaController,
};
use crate::bus::{Access, DmaBus, IrqSink, IRQ_DMA0};

impl DmaController {
    /// Drains the current channel.
    ///
    /// Returns early when the bus runs out of cycles or when a higher priority
    /// channel took over since the last unit. All progress lives in the
    /// channel's latched registers, so calling `run` again picks up exactly
    /// where it stopped.
    pub fn run<B, I>(&mut self, bus: &mut B, irq: &mut I)
    where
        B: DmaBus + ?Sized,
        I: IrqSink + ?Sized,
    {
        if self.run_set.is_empty() {
            return;
        }

        let id = self.current;
        let channel = &mut self.channels[id.index()];
        let size = channel.unit_size();
        let src_step = channel.src_control().step(size);
        let dst_step = channel.dst_control().step(size);

        while channel.internal.length != 0 {
            if bus.cycles_left() <= 0 {
                return;
            }

            if self.interleaved {
                self.interleaved = false;
                return;
            }

            let src = channel.internal.src;
            let dst = channel.internal.dst;
            match size {
                UnitSize::Word => {
                    let data = bus.read_word(src, Access::Sequential);
                    bus.write_word(dst, data, Access::Sequential);
                }
                UnitSize::Half => {
                    let data = bus.read_half(src, Access::Sequential);
                    bus.write_half(dst, data, Access::Sequential);
                }
            }

            channel.internal.src = src.wrapping_add_signed(src_step);
            channel.internal.dst = dst.wrapping_add_signed(dst_step);
            channel.internal.length -= 1;
        }

        self.complete(id, irq);
    }

    fn complete<I: IrqSink + ?Sized>(&mut self, id: ChannelId, irq: &mut I) {
        let channel = &mut self.channels[id.index()];
        debug!(target: "dma", "{id} transfer complete");

        if channel.irq() {
            irq.request(IRQ_DMA0 << id.index());
        }

        if channel.repeat() {
            channel.reload_length();
            if channel.dst_control() == AddressControl::Reload {
                channel.reload_dst();
            }
            if channel.timing() != Timing::Immediate {
                self.run_set.remove(id);
            }
        } else {
            channel.disable();
            self.run_set.remove(id);
        }

        self.reselect();
    }
}
