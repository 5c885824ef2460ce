use std::io;

/// Types that can be written into a frame.
pub trait Serialize<'a> {
    /// Writes the serialized form of `self` into `buf`.
    ///
    /// # Arguments
    /// * `buf` - The frame buffer, it may already contain bytes that must be kept.
    ///
    /// # Returns
    /// An optional trailing slice to be written after `buf` without copying it,
    /// or an io error if serialization failed.
    fn serialize(&'a self, buf: &mut Vec<u8>) -> io::Result<Option<&'a [u8]>>;
}
