use tracing::{debug, trace};

use crate::{
    bus::{Access, DmaBus, IrqSink},
    dma::{DmaController, Fifo},
    mem::Mem,
};

pub const FIFO_A: u32 = 0x0400_00A0;
pub const FIFO_B: u32 = 0x0400_00A4;

/// Memory map seen by the DMA engine.
///
/// Every DMA access charges one cycle against `budget`. Accesses made on the
/// CPU's behalf through `peek`/`poke` are free.
#[derive(Default)]
pub struct HostBus {
    ewram: Mem<0x40000>,
    iwram: Mem<0x8000>,
    vram: Mem<0x20000>,
    rom: Mem<0x100000>,
    fifo_a: Vec<u32>,
    fifo_b: Vec<u32>,
    budget: i32,
}

impl HostBus {
    pub fn peek(&self, addr: u32) -> u8 {
        match addr >> 24 {
            0x02 => self.ewram.read(addr),
            0x03 => self.iwram.read(addr),
            0x06 => self.vram.read(addr),
            0x08..=0x0D => self.rom.read(addr),
            _ => 0x00,
        }
    }

    /// Stores a byte anywhere backed by memory, ROM included.
    pub fn poke(&mut self, addr: u32, data: u8) {
        match addr >> 24 {
            0x02 => self.ewram.write(addr, data),
            0x03 => self.iwram.write(addr, data),
            0x06 => self.vram.write(addr, data),
            0x08..=0x0D => self.rom.write(addr, data),
            _ => trace!(target: "bus", "poke to unmapped {:#010X} dropped", addr),
        }
    }

    pub fn peek_word(&self, addr: u32) -> u32 {
        u32::from_le_bytes([0, 1, 2, 3].map(|i| self.peek(addr.wrapping_add(i))))
    }

    pub fn poke_word(&mut self, addr: u32, data: u32) {
        for (i, byte) in (0u32..).zip(data.to_le_bytes()) {
            self.poke(addr.wrapping_add(i), byte);
        }
    }

    pub fn fifo(&self, fifo: Fifo) -> &[u32] {
        match fifo {
            Fifo::A => &self.fifo_a,
            Fifo::B => &self.fifo_b,
        }
    }

    pub fn budget(&self) -> i32 {
        self.budget
    }

    /// DMA side store. ROM is read-only and the only I/O registers
    /// listening are the sound FIFOs.
    fn store(&mut self, addr: u32, bytes: &[u8]) {
        match addr >> 24 {
            0x04 => {
                let mut data = [0u8; 4];
                data[..bytes.len()].copy_from_slice(bytes);
                let data = u32::from_le_bytes(data);
                match addr & !3 {
                    FIFO_A => self.fifo_a.push(data),
                    FIFO_B => self.fifo_b.push(data),
                    _ => debug!(target: "bus", "DMA write to I/O {:#010X} not handled", addr),
                }
            }
            0x08..=0x0D => debug!(target: "bus", "DMA write to ROM {:#010X} ignored", addr),
            _ => {
                for (i, byte) in (0u32..).zip(bytes) {
                    self.poke(addr.wrapping_add(i), *byte);
                }
            }
        }
    }
}

impl DmaBus for HostBus {
    fn read_half(&mut self, addr: u32, _access: Access) -> u16 {
        self.budget -= 1;
        let addr = addr & !1;
        u16::from_le_bytes([self.peek(addr), self.peek(addr.wrapping_add(1))])
    }

    fn read_word(&mut self, addr: u32, _access: Access) -> u32 {
        self.budget -= 1;
        self.peek_word(addr & !3)
    }

    fn write_half(&mut self, addr: u32, data: u16, _access: Access) {
        self.budget -= 1;
        self.store(addr & !1, &data.to_le_bytes());
    }

    fn write_word(&mut self, addr: u32, data: u32, _access: Access) {
        self.budget -= 1;
        self.store(addr & !3, &data.to_le_bytes());
    }

    fn cycles_left(&self) -> i32 {
        self.budget
    }
}

/// The IF register, as far as DMA is concerned.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IrqFlags(pub u16);

impl IrqSink for IrqFlags {
    fn request(&mut self, mask: u16) {
        self.0 |= mask;
    }
}

/// DMA controller wired to memory and an IF register.
#[derive(Default)]
pub struct Host {
    pub dma: DmaController,
    pub bus: HostBus,
    pub irq: IrqFlags,
}

impl Host {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// CPU store: DMA registers get their side effects, memory is written.
    pub fn cpu_write(&mut self, addr: u32, data: u8) {
        if !self.dma.write_io(addr, data) {
            self.bus.poke(addr, data);
        }
    }

    pub fn cpu_read(&self, addr: u32) -> u8 {
        self.dma
            .read_io(addr)
            .unwrap_or_else(|| self.bus.peek(addr))
    }

    pub fn hblank(&mut self) {
        self.dma.trigger_hblank();
    }

    pub fn vblank(&mut self) {
        self.dma.trigger_vblank();
    }

    pub fn fifo_request(&mut self, fifo: Fifo) {
        self.dma.request_fifo(fifo);
    }

    /// Lends `cycles` to the DMA engine and runs it until it goes idle or the
    /// cycles are gone. An overdraft from a previous step is paid back first.
    /// Returns the cycles used.
    pub fn step(&mut self, cycles: i32) -> i32 {
        self.bus.budget += cycles;
        let start = self.bus.budget;
        while self.dma.is_active() && self.bus.budget > 0 {
            self.dma.run(&mut self.bus, &mut self.irq);
        }
        let used = start - self.bus.budget;
        // whatever DMA did not use goes back to the CPU
        self.bus.budget = self.bus.budget.min(0);
        used
    }
}

#[cfg(test)]
mod tests {
    use super::{Host, FIFO_A};
    use crate::{
        bus::IRQ_DMA0,
        dma::{ChannelId, Fifo},
    };

    fn cpu_write32(host: &mut Host, addr: u32, data: u32) {
        for (i, byte) in (0u32..).zip(data.to_le_bytes()) {
            host.cpu_write(addr + i, byte);
        }
    }

    fn cpu_write16(host: &mut Host, addr: u32, data: u16) {
        let [lo, hi] = data.to_le_bytes();
        host.cpu_write(addr, lo);
        host.cpu_write(addr + 1, hi);
    }

    #[test]
    fn regions() {
        let mut host = Host::default();
        host.bus.poke_word(0x0200_0000, 0xDEAD_BEEF);
        assert_eq!(host.bus.peek_word(0x0204_0000), 0xDEAD_BEEF);
        host.bus.poke_word(0x0800_0010, 0x1234_5678);
        assert_eq!(host.cpu_read(0x0A00_0010), 0x78);
        assert_eq!(host.cpu_read(0x0000_0000), 0);
    }

    #[test]
    fn ewram_to_iwram_copy() {
        let mut host = Host::default();
        for i in 0..4 {
            host.bus.poke_word(0x0200_0000 + i * 4, 0xA0 + i);
        }

        cpu_write32(&mut host, 0x0400_00B0, 0x0200_0000);
        cpu_write32(&mut host, 0x0400_00B4, 0x0300_0000);
        cpu_write16(&mut host, 0x0400_00B8, 4);
        cpu_write16(&mut host, 0x0400_00BA, 0xC400);
        assert_eq!(host.cpu_read(0x0400_00BB), 0xC4);

        let used = host.step(100);
        assert_eq!(used, 8);
        for i in 0..4 {
            assert_eq!(host.bus.peek_word(0x0300_0000 + i * 4), 0xA0 + i);
        }
        assert_eq!(host.irq.0, IRQ_DMA0);
        assert_eq!(host.cpu_read(0x0400_00BB), 0x44);
        assert_eq!(host.bus.budget(), 0);
    }

    #[test]
    fn overdraft_carries_over() {
        let mut host = Host::default();
        cpu_write16(&mut host, 0x0400_00D4 + 8, 10);
        cpu_write16(&mut host, 0x0400_00D4 + 10, 0x8000);
        // second access of a unit runs past the budget
        assert_eq!(host.step(3), 4);
        assert_eq!(host.bus.budget(), -1);
        assert_eq!(host.step(1), 0);
        assert_eq!(host.dma.channel(ChannelId::DMA3).internal().length, 8);
        assert_eq!(host.step(100), 16);
        assert!(!host.dma.is_active());
    }

    #[test]
    fn rom_is_read_only_for_dma() {
        let mut host = Host::default();
        host.bus.poke_word(0x0200_0000, 0x5555_5555);
        // only DMA3 can address the cartridge
        cpu_write32(&mut host, 0x0400_00D4, 0x0200_0000);
        cpu_write32(&mut host, 0x0400_00D8, 0x0800_0000);
        cpu_write16(&mut host, 0x0400_00DC, 1);
        cpu_write16(&mut host, 0x0400_00DE, 0x8400);
        assert_eq!(host.step(10), 2);
        assert_eq!(host.bus.peek_word(0x0800_0000), 0);
    }

    #[test]
    fn sound_fifo_feed() {
        let mut host = Host::default();
        for i in 0..8 {
            host.bus.poke_word(0x0200_0000 + i * 4, i);
        }
        cpu_write32(&mut host, 0x0400_00BC, 0x0200_0000);
        cpu_write32(&mut host, 0x0400_00C0, FIFO_A);
        cpu_write16(&mut host, 0x0400_00C4, 4);
        // special timing, repeat, word, fixed destination
        cpu_write16(&mut host, 0x0400_00C6, 0xB640);

        host.step(100);
        assert!(host.bus.fifo(Fifo::A).is_empty());

        host.fifo_request(Fifo::A);
        host.step(100);
        host.fifo_request(Fifo::A);
        host.step(100);
        assert_eq!(host.bus.fifo(Fifo::A), &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert!(host.bus.fifo(Fifo::B).is_empty());
    }
}
