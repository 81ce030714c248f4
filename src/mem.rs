#[derive(Clone)]
pub struct Mem<const S: usize> {
    data: Vec<u8>,
}

impl<const S: usize> Default for Mem<S> {
    fn default() -> Self {
        Self { data: vec![0; S] }
    }
}

impl<const S: usize> Mem<S> {
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.data.as_mut_slice()
    }

    pub fn read(&self, addr: u32) -> u8 {
        // modulo = mirroring addresses down to the real address
        self.data[(addr as usize) % S]
    }

    pub fn write(&mut self, addr: u32, data: u8) {
        self.data[(addr as usize) % S] = data;
    }

    pub fn read_word(&self, addr: u32) -> u32 {
        u32::from_le_bytes([0, 1, 2, 3].map(|i| self.read(addr.wrapping_add(i))))
    }

    pub fn write_word(&mut self, addr: u32, data: u32) {
        for (i, byte) in (0u32..).zip(data.to_le_bytes()) {
            self.write(addr.wrapping_add(i), byte);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Mem;

    #[test]
    fn mirroring() {
        // 32k of iwram mirrored across its 16M page
        let mut ram = Mem::<0x8000>::default();

        ram.write(0x0300_0001, 0xAA);
        assert_eq!(ram.read(0x0300_0001), 0xAA);
        assert_eq!(ram.read(0x0300_8001), 0xAA);
        assert_eq!(ram.read(0x03FF_8001), 0xAA);

        ram.write(0x0301_7456, 0xBB);
        assert_eq!(ram.read(0x0300_7456), 0xBB);
        assert_eq!(ram.read(0x0300_F456), 0xBB);
    }

    #[test]
    fn words_are_little_endian() {
        let mut ram = Mem::<0x100>::default();
        ram.write_word(0x10, 0x1234_5678);
        assert_eq!(ram.read(0x10), 0x78);
        assert_eq!(ram.read(0x13), 0x12);
        assert_eq!(ram.read_word(0x10), 0x1234_5678);

        ram.as_mut_slice()[0x20..0x24].copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(ram.read_word(0x20), 0x0403_0201);
    }
}
