/// Access-timing class of a bus cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Nonsequential,
    Sequential,
}

/// IF bit of DMA channel 0. Channels 1-3 follow in the next bits.
pub const IRQ_DMA0: u16 = 1 << 8;

/// The system bus as seen by the DMA engine.
///
/// `cycles_left` is the execution budget shared with the CPU. The engine only
/// reads it; whoever implements the bus is expected to charge every access
/// against it.
#[cfg_attr(test, mockall::automock)]
pub trait DmaBus {
    fn read_half(&mut self, addr: u32, access: Access) -> u16;
    fn read_word(&mut self, addr: u32, access: Access) -> u32;
    fn write_half(&mut self, addr: u32, data: u16, access: Access);
    fn write_word(&mut self, addr: u32, data: u32, access: Access);
    fn cycles_left(&self) -> i32;
}

/// Interrupt controller side: ORs a mask into the IF register.
#[cfg_attr(test, mockall::automock)]
pub trait IrqSink {
    fn request(&mut self, mask: u16);
}
