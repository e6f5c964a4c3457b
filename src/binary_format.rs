use byteorder::{BigEndian, WriteBytesExt};
use std::io::Result;

/// Utility trait for writing patched constructs back out in class file form
///
/// Everything is big-endian, opcodes are always `u8`, and local variable indices are `u8` or
/// `u16` depending on whether the instruction is widened.
pub trait Serialize: Sized {
    /// Serialize construct into a binary output stream
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()>;
}

impl Serialize for u8 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(*self)
    }
}

impl Serialize for u16 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_u16::<BigEndian>(*self)
    }
}

impl Serialize for i8 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_i8(*self)
    }
}

impl Serialize for i16 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_i16::<BigEndian>(*self)
    }
}

/// Serialize into a fresh byte vector
pub fn to_bytes<S: Serialize>(value: &S) -> Result<Vec<u8>> {
    let mut bytes = vec![];
    value.serialize(&mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn big_endian() {
        assert_eq!(to_bytes(&0x1234u16).unwrap(), vec![0x12, 0x34]);
        assert_eq!(to_bytes(&-2i16).unwrap(), vec![0xFF, 0xFE]);
        assert_eq!(to_bytes(&-1i8).unwrap(), vec![0xFF]);
    }
}
