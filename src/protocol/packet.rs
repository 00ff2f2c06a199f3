use std::io::Cursor;

use thiserror::Error;

use super::{
    packet_hdr::{PacketHeader, PacketHeaderBuilder, PacketType, PACKET_HDR_LEN},
    DecodingError, EncodingError,
};
use crate::utils::Seq;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    hdr: PacketHeader,
    body: Vec<u8>,
}

pub struct PacketBuilder {
    pub hdr: PacketHeader,
    pub body: Vec<u8>,
}

impl PacketBuilder {
    pub fn build(self) -> Result<Packet, Error> {
        if self.hdr.ty() == PacketType::Ack && !self.body.is_empty() {
            return Err(Error::AckWithBody);
        }
        let this = Packet {
            hdr: self.hdr,
            body: self.body,
        };
        this.check_rep();
        Ok(this)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("ack packets carry no body")]
    AckWithBody,
}

impl Packet {
    #[inline]
    fn check_rep(&self) {
        if self.hdr.ty() == PacketType::Ack {
            assert!(self.body.is_empty());
        }
    }

    #[must_use]
    pub fn data(seq: Seq, body: &[u8]) -> Self {
        let this = Packet {
            hdr: PacketHeaderBuilder {
                ty: PacketType::Data,
                seq,
            }
            .build(),
            body: body.to_vec(),
        };
        this.check_rep();
        this
    }

    #[must_use]
    pub fn ack(seq: Seq) -> Self {
        let this = Packet {
            hdr: PacketHeaderBuilder {
                ty: PacketType::Ack,
                seq,
            }
            .build(),
            body: Vec::new(),
        };
        this.check_rep();
        this
    }

    /// Decodes one datagram.
    ///
    /// Bytes trailing the header of an ack are dropped.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodingError> {
        let mut rdr = Cursor::new(bytes);
        let hdr = PacketHeader::from_bytes(&mut rdr)?;
        let body = match hdr.ty() {
            PacketType::Data => bytes[rdr.position() as usize..].to_vec(),
            PacketType::Ack => Vec::new(),
        };

        let this = Packet { hdr, body };
        this.check_rep();
        Ok(this)
    }

    pub fn append_to(&self, wtr: &mut Vec<u8>) {
        self.hdr.append_to(wtr);
        wtr.extend_from_slice(&self.body);
    }

    /// Encodes into a fresh datagram no longer than `max_packet`.
    pub fn encode(&self, max_packet: usize) -> Result<Vec<u8>, EncodingError> {
        let len = self.len();
        if len > max_packet {
            return Err(EncodingError::TooLarge {
                len,
                max: max_packet,
            });
        }
        let mut wtr = Vec::with_capacity(len);
        self.append_to(&mut wtr);
        Ok(wtr)
    }

    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        PACKET_HDR_LEN + self.body.len()
    }

    #[must_use]
    pub fn is_ack_for(&self, seq: Seq) -> bool {
        self.hdr.ty() == PacketType::Ack && self.hdr.seq() == seq
    }

    #[must_use]
    #[inline]
    pub fn hdr(&self) -> &PacketHeader {
        &self.hdr
    }

    #[must_use]
    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}
