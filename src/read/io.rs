use crate::error::Error;
use std::io::{Read, Seek, SeekFrom};

pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// Reads `size` bytes from the current position. Sizes come straight from the
/// file, so anything longer than what is left of the stream is rejected before
/// allocating.
pub fn read_block(input: &mut impl ReadSeek, size: u64) -> Result<Vec<u8>, Error> {
    let position = input.stream_position()?;
    let end = input.seek(SeekFrom::End(0))?;
    input.seek(SeekFrom::Start(position))?;
    if size > end.saturating_sub(position) {
        return Err(Error::Hdf5Error(format!(
            "Block of {} bytes at {} runs past the end of the data ({} bytes)",
            size, position, end
        )));
    }
    let mut block = vec![0; size as usize];
    input.read_exact(&mut block)?;
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_blocks_within_the_stream() {
        let mut input = Cursor::new(vec![1, 2, 3, 4, 5]);
        input.set_position(1);
        assert_eq!(read_block(&mut input, 3).unwrap(), vec![2, 3, 4]);
        assert_eq!(input.position(), 4);
    }

    #[test]
    fn rejects_blocks_past_the_end() {
        let mut input = Cursor::new(vec![0; 16]);
        input.set_position(8);
        assert!(matches!(
            read_block(&mut input, 9),
            Err(Error::Hdf5Error(_))
        ));
        assert!(matches!(
            read_block(&mut input, u64::MAX),
            Err(Error::Hdf5Error(_))
        ));
        assert_eq!(input.position(), 8);
    }
}
