//! SkyTraq binary protocol, used to configure the GNSS receiver.

#![no_std]

pub mod command;
pub mod error;

pub use command::{Attributes, Command, NmeaIntervals, PowerMode, PpsMode};
pub use error::Error;

pub mod message_id {
    pub const CONFIGURE_NMEA: u8 = 0x08;
    pub const CONFIGURE_POWER: u8 = 0x0c;
    pub const CONFIGURE_UPDATE_RATE: u8 = 0x0e;
    pub const CONFIGURE_PPS: u8 = 0x3e;
    pub const ACK: u8 = 0x83;
    pub const NACK: u8 = 0x84;
}

/// XOR over the payload, message ID included.
pub fn checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0, |acc, c| acc ^ c)
}

// SkyTraq Frame:
// 0       1       2       3       4       5               4+N     5+N     6+N
// +-------+-------+-------+-------+-------+-------+-------+-------+-------+-------+
// | Preamble      | Length (N)    | ID    | Body          | CS    | Trailer       |
// +-------+-------+-------+-------+-------+-------+-------+-------+-------+-------+
// Length counts the ID and the body, big endian. CS is the XOR of the same bytes.

const PREAMBLE1: u8 = 0xa0;
const PREAMBLE2: u8 = 0xa1;
const TRAILER: [u8; 2] = [b'\r', b'\n'];

const FRAME_LENGTH_OFFSET: usize = 2;
const FRAME_LENGTH_SIZE: usize = 2;

const FRAME_PAYLOAD_OFFSET: usize = FRAME_LENGTH_OFFSET + FRAME_LENGTH_SIZE;

const FRAME_METADATA_SIZE: usize = 2 + FRAME_LENGTH_SIZE + 1 + TRAILER.len();

/// Encodes a frame carrying `id` and `body` into `buf`, returning the encoded bytes.
pub fn write_frame<'a>(buf: &'a mut [u8], id: u8, body: &[u8]) -> Result<&'a [u8], Error> {
    let payload_size = body.len() + 1;
    let length = u16::try_from(payload_size).map_err(|_| Error::PayloadTooLarge(payload_size))?;
    let frame_size = FRAME_METADATA_SIZE + payload_size;
    let frame = buf
        .get_mut(..frame_size)
        .ok_or(Error::BufferTooSmall(frame_size))?;

    frame[0] = PREAMBLE1;
    frame[1] = PREAMBLE2;
    frame[FRAME_LENGTH_OFFSET..FRAME_PAYLOAD_OFFSET].copy_from_slice(&length.to_be_bytes());
    frame[FRAME_PAYLOAD_OFFSET] = id;
    frame[FRAME_PAYLOAD_OFFSET + 1..FRAME_PAYLOAD_OFFSET + payload_size].copy_from_slice(body);
    frame[FRAME_PAYLOAD_OFFSET + payload_size] =
        checksum(&frame[FRAME_PAYLOAD_OFFSET..FRAME_PAYLOAD_OFFSET + payload_size]);
    frame[frame_size - TRAILER.len()..].copy_from_slice(&TRAILER);
    Ok(frame)
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq)]
pub struct Frame<'a> {
    pub id: u8,
    pub body: &'a [u8],
}

/// Receiver's answer to a configuration message.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    /// Carries the ID of the accepted message.
    Ack(u8),
    Nack(u8),
}

impl Frame<'_> {
    pub fn reply(&self) -> Option<Reply> {
        match (self.id, self.body) {
            (message_id::ACK, [id, ..]) => Some(Reply::Ack(*id)),
            (message_id::NACK, [id, ..]) => Some(Reply::Nack(*id)),
            _ => None,
        }
    }
}

/// Picks binary frames out of a receive stream that also carries NMEA text.
pub struct FrameStream<const N: usize> {
    buf: [u8; N],
    begin: usize,
    end: usize,
}

impl<const N: usize> Default for FrameStream<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> FrameStream<N> {
    pub fn new() -> Self {
        Self {
            buf: [0; N],
            begin: 0,
            end: 0,
        }
    }

    pub fn commit(&mut self, n: usize) {
        self.end = N.min(self.end + n);
    }

    pub fn consume(&mut self, n: usize) {
        self.begin = self.end.min(self.begin + n);
    }

    /// Appends one byte, making room first if the buffer ran full.
    pub fn push(&mut self, byte: u8) {
        if self.end == N {
            self.compact();
        }
        if let Some(slot) = self.buf_unused_mut().first_mut() {
            *slot = byte;
            self.commit(1);
        }
    }

    fn compact(&mut self) {
        self.buf.copy_within(self.begin..self.end, 0);
        self.end -= self.begin;
        self.begin = 0;
    }

    pub fn pop(&mut self) -> Option<Frame<'_>> {
        if self.end == N {
            self.compact();
        }

        for i in self.begin..self.end {
            match self.buf[i..self.end] {
                [PREAMBLE1, PREAMBLE2, ..] => (),
                [] | [PREAMBLE1] => break,
                _ => {
                    self.begin = i + 1; // not a frame start
                    continue;
                }
            }

            let frame = &self.buf[i..self.end];
            if frame.len() < FRAME_PAYLOAD_OFFSET {
                break;
            }

            let payload_size =
                u16::from_be_bytes([frame[FRAME_LENGTH_OFFSET], frame[FRAME_LENGTH_OFFSET + 1]])
                    as usize;
            if payload_size == 0 || FRAME_METADATA_SIZE + payload_size > N {
                // can never complete here, look for the next preamble
                self.begin = i + 1;
                continue;
            }
            if frame.len() < FRAME_METADATA_SIZE + payload_size {
                break;
            }

            let frame = &frame[..FRAME_METADATA_SIZE + payload_size];
            let payload = &frame[FRAME_PAYLOAD_OFFSET..FRAME_PAYLOAD_OFFSET + payload_size];
            let cs = frame[FRAME_PAYLOAD_OFFSET + payload_size];
            let trailer = &frame[frame.len() - TRAILER.len()..];

            self.begin = i + FRAME_METADATA_SIZE + payload_size;

            if cs != checksum(payload) || trailer != TRAILER {
                break;
            }

            return Some(Frame {
                id: payload[0],
                body: &payload[1..],
            });
        }

        None
    }

    pub fn buf_filled(&self) -> &[u8] {
        &self.buf[self.begin..self.end]
    }

    pub fn buf_unused_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.end..]
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;

    const ACK_UPDATE_RATE: [u8; 9] = [
        0xa0, 0xa1, // header
        0x00, 0x02, // length
        0x83, // id (=ACK)
        0x0e, // acked id (=configure update rate)
        0x8d, // cs
        0x0d, 0x0a, // trailer
    ];

    const NACK_NMEA: [u8; 9] = [
        0xa0, 0xa1, // header
        0x00, 0x02, // length
        0x84, // id (=NACK)
        0x08, // nacked id (=configure NMEA)
        0x8c, // cs
        0x0d, 0x0a, // trailer
    ];

    fn feed<const N: usize>(stream: &mut FrameStream<N>, data: &[u8]) {
        stream.buf_unused_mut()[..data.len()].copy_from_slice(data);
        stream.commit(data.len());
    }

    #[test]
    fn test_checksum() {
        assert_eq!(checksum(&[0x0e, 0x01, 0x00]), 0x0f);
        assert_eq!(checksum(&[0x83, 0x0e]), 0x8d);
    }

    #[test]
    fn test_write_frame() {
        let mut buf = [0; 16];
        assert_eq!(
            write_frame(&mut buf, message_id::CONFIGURE_UPDATE_RATE, &[0x01, 0x00]),
            Ok(&[0xa0, 0xa1, 0x00, 0x03, 0x0e, 0x01, 0x00, 0x0f, 0x0d, 0x0a][..])
        );
        assert_eq!(
            write_frame(&mut buf, message_id::ACK, &[0x0e]),
            Ok(&ACK_UPDATE_RATE[..])
        );
    }

    #[test]
    fn test_write_frame_errors() {
        let mut buf = [0; 8];
        assert_eq!(
            write_frame(&mut buf, message_id::CONFIGURE_UPDATE_RATE, &[0x01, 0x00]),
            Err(Error::BufferTooSmall(10))
        );
        let body = [0; 0x10000];
        assert_eq!(
            write_frame(&mut buf, message_id::CONFIGURE_NMEA, &body),
            Err(Error::PayloadTooLarge(0x10001))
        );
    }

    #[test]
    fn test_empty() {
        let mut stream = FrameStream::<16>::new();
        assert_eq!(stream.buf_filled().len(), 0);
        assert_eq!(stream.buf_unused_mut().len(), 16);
        assert_eq!(stream.pop(), None);
    }

    #[test]
    fn test_replies_between_sentences() {
        let mut stream = FrameStream::<64>::new();
        feed(&mut stream, b"$GPTXT,01*67\r\n");
        feed(&mut stream, &ACK_UPDATE_RATE);
        feed(&mut stream, b"$GP");
        feed(&mut stream, &NACK_NMEA);

        let frame = stream.pop().unwrap();
        assert_eq!(
            frame,
            Frame {
                id: message_id::ACK,
                body: &[0x0e]
            }
        );
        assert_eq!(frame.reply(), Some(Reply::Ack(0x0e)));

        let frame = stream.pop().unwrap();
        assert_eq!(frame.reply(), Some(Reply::Nack(0x08)));

        assert_eq!(stream.pop(), None);
        assert_eq!(stream.buf_filled(), b"");
    }

    #[test]
    fn test_interrupted() {
        let mut stream = FrameStream::<32>::new();
        feed(&mut stream, &ACK_UPDATE_RATE[..5]);
        assert_eq!(stream.pop(), None);
        assert_eq!(stream.buf_filled(), &ACK_UPDATE_RATE[..5]);

        for &b in &ACK_UPDATE_RATE[5..] {
            stream.push(b);
        }
        assert_eq!(stream.pop().and_then(|f| f.reply()), Some(Reply::Ack(0x0e)));
        assert_eq!(stream.buf_filled(), b"");
    }

    #[test]
    fn test_bad_checksum_is_dropped() {
        let mut stream = FrameStream::<32>::new();
        let mut corrupt = ACK_UPDATE_RATE;
        corrupt[6] ^= 0xff;
        feed(&mut stream, &corrupt);
        assert_eq!(stream.pop(), None);
        assert_eq!(stream.buf_filled(), b"");

        feed(&mut stream, &NACK_NMEA);
        assert_eq!(stream.pop().and_then(|f| f.reply()), Some(Reply::Nack(0x08)));
    }

    #[test]
    fn test_oversized_length_is_skipped() {
        let mut stream = FrameStream::<16>::new();
        feed(&mut stream, &[0xa0, 0xa1, 0x10, 0x00]);
        feed(&mut stream, &ACK_UPDATE_RATE);
        assert_eq!(stream.pop().and_then(|f| f.reply()), Some(Reply::Ack(0x0e)));
    }

    #[test]
    fn test_push_keeps_room() {
        let mut stream = FrameStream::<16>::new();
        for &b in b"$GPGGA,123519,4807.038,N" {
            stream.push(b);
            // text is discarded as soon as it is looked at
            assert_eq!(stream.pop(), None);
        }
        for &b in &ACK_UPDATE_RATE {
            stream.push(b);
        }
        assert_eq!(stream.pop().and_then(|f| f.reply()), Some(Reply::Ack(0x0e)));
    }

    #[test]
    fn test_consume() {
        let mut stream = FrameStream::<16>::new();
        feed(&mut stream, b"abcdef\r\n");
        stream.consume(3);
        assert_eq!(stream.buf_filled(), b"def\r\n");
        stream.consume(1234);
        assert_eq!(stream.buf_filled(), b"");
        assert_eq!(stream.buf_unused_mut().len(), 8);
    }
}
