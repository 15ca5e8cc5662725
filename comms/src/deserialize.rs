use std::io;

/// Types that can be decoded from a single protocol frame.
pub trait Deserialize: Sized {
    /// Decodes an instance from the body of a frame.
    ///
    /// # Arguments
    /// * `buf` - The frame body, without the length prefix.
    ///
    /// # Returns
    /// The decoded value or an `InvalidData` io error.
    fn deserialize(buf: &[u8]) -> io::Result<Self>;
}
