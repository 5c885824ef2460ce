use std::io;

/// Types that can be read back from a received frame.
pub trait Deserialize<'a>: Sized {
    /// Parses `buf` into `Self`, borrowing from it when possible.
    ///
    /// # Arguments
    /// * `buf` - The frame contents without the length prefix.
    ///
    /// # Returns
    /// The parsed value or an `InvalidData` io error.
    fn deserialize(buf: &'a mut [u8]) -> io::Result<Self>;
}
