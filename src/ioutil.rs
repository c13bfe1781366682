//! Small shared helpers for turning `std::io` EOF conditions into
//! [`Error::UnexpectedEndOfStream`](crate::error::Error::UnexpectedEndOfStream),
//! the way `itm`'s `Buffer::buffer_some` turns a zero-byte read into its own
//! `DecoderErrorInt::Eof`.

use std::io::Read;

use crate::error::{Error, Result};

pub(crate) fn read_byte<R: Read>(r: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    read_exact(r, &mut buf)?;
    Ok(buf[0])
}

pub(crate) fn read_exact<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<()> {
    match r.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(Error::UnexpectedEndOfStream)
        }
        Err(e) => Err(Error::Io(e)),
    }
}
