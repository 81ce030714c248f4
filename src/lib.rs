pub mod bus;
pub mod dma;
pub mod host;
pub mod mem;
pub mod script;

pub use bus::{Access, DmaBus, IrqSink};
pub use dma::{ChannelId, DmaController, Fifo};
