use std::io;

/// Types that can be written into a single protocol frame.
pub trait Serialize {
    /// Appends the encoded form of `self` to `buf`.
    ///
    /// # Arguments
    /// * `buf` - The frame buffer, it may already contain a prefix that must be preserved.
    ///
    /// # Returns
    /// An io error if the value can't be encoded.
    fn serialize(&self, buf: &mut Vec<u8>) -> io::Result<()>;
}
