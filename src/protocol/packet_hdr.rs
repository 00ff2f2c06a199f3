use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::utils::Seq;

use super::DecodingError;

pub const PACKET_HDR_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum PacketType {
    Data = 0,
    Ack = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    ty: PacketType,
    seq: Seq,
}

pub struct PacketHeaderBuilder {
    pub ty: PacketType,
    pub seq: Seq,
}

impl PacketHeaderBuilder {
    pub fn build(self) -> PacketHeader {
        let this = PacketHeader {
            ty: self.ty,
            seq: self.seq,
        };
        this.check_rep();
        this
    }
}

impl PacketHeader {
    #[inline]
    fn check_rep(&self) {}

    /// Reads the header from the front of `rdr` and leaves the cursor at the
    /// first body byte.
    pub fn from_bytes(rdr: &mut Cursor<&[u8]>) -> Result<Self, DecodingError> {
        let len = rdr.get_ref().len();
        let too_short = |_e: std::io::Error| DecodingError::TooShort { len };
        let ty = rdr.read_u16::<BigEndian>().map_err(too_short)?;
        let seq = rdr.read_u16::<BigEndian>().map_err(too_short)?;

        let ty = PacketType::try_from(ty).map_err(|_e| DecodingError::UnknownType(ty))?;
        let seq = Seq::from_u16(seq).ok_or(DecodingError::InvalidSeq(seq))?;

        let this = PacketHeader { ty, seq };
        this.check_rep();
        Ok(this)
    }

    pub fn append_to(&self, wtr: &mut Vec<u8>) {
        let start = wtr.len();
        wtr.write_u16::<BigEndian>(self.ty.into()).unwrap();
        wtr.write_u16::<BigEndian>(self.seq.to_u16()).unwrap();
        debug_assert_eq!(wtr.len() - start, PACKET_HDR_LEN);
    }

    #[must_use]
    #[inline]
    pub fn ty(&self) -> PacketType {
        self.ty
    }

    #[must_use]
    #[inline]
    pub fn seq(&self) -> Seq {
        self.seq
    }
}
