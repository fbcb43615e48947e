//! Page chunking for multi-byte writes

/// Splits a write into chunks no larger than one page.
///
/// Yields `(logical_start, chunk)` pairs covering the input in order.
#[derive(Debug, Clone)]
pub struct PageChunks<'a> {
    data: &'a [u8],
    address: u32,
    page_size: usize,
    aligned: bool,
}

impl<'a> PageChunks<'a> {
    /// Chunks counted from the start of `data`: every chunk but the last is
    /// exactly `page_size` long, regardless of where `start` sits in a page.
    pub fn new(start: u32, data: &'a [u8], page_size: u16) -> Self {
        Self {
            data,
            address: start,
            page_size: usize::from(page_size).max(1),
            aligned: false,
        }
    }

    /// Chunks that never cross a physical page boundary. The first chunk runs
    /// from `start` to the end of its page.
    pub fn aligned(start: u32, data: &'a [u8], page_size: u16) -> Self {
        Self {
            aligned: true,
            ..Self::new(start, data, page_size)
        }
    }
}

impl<'a> Iterator for PageChunks<'a> {
    type Item = (u32, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.is_empty() {
            return None;
        }

        let room = if self.aligned {
            self.page_size - (self.address as usize % self.page_size)
        } else {
            self.page_size
        };
        let (chunk, rest) = self.data.split_at(room.min(self.data.len()));

        let start = self.address;
        self.address = self.address.wrapping_add(chunk.len() as u32);
        self.data = rest;

        Some((start, chunk))
    }
}
