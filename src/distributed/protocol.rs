//! Coordinator/worker protocol
//!
//! This module defines the messages exchanged between the coordinator and its
//! workers and their wire framing.
//!
//! # Message Flow
//!
//! ```text
//! Coordinator                         Worker
//!     |                                  |
//!     |-------- HELLO(version, id) ----->|
//!     |<------- HELLO(version, node) ----|
//!     |                                  |
//!     |-------- TASK(index, path) ------>|   priming: one message per worker
//!     |<------- READY(id) ---------------|
//!     |-------- TASK(index, path) ------>|   ...one task outstanding at a time
//!     |<------- READY(id) ---------------|
//!     |                                  |
//!     |-------- TERMINATE -------------->|
//!     |<------- HIST_COUNT(n) -----------|   data channel
//!     |<------- HIST_WORD(w1) -----------|
//!     |<------- HIST_FREQ(f1) -----------|
//!     |          ... n pairs ...         |
//! ```
//!
//! Messages are distinguished by an integer [`Label`], never by the shape of
//! their payload. Each label belongs to one logical [`Channel`]: task, ready,
//! terminate, abort and handshake traffic is control; histogram transfer is
//! data.
//!
//! # Message Framing
//!
//! ```text
//! [4 bytes: frame length N (little-endian u32)][1 byte: label][N-1 bytes: MessagePack body]
//! ```
//!
//! Bodies are variable length, so words and paths are not padded to a fixed
//! width. Frames larger than [`MAX_FRAME_LEN`] are rejected.

use crate::error::{CountResult, WordCountError};
use crate::stats::histogram::WordToken;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Protocol version
///
/// Increment this when making breaking changes to the protocol.
/// Coordinator and workers must have matching protocol versions.
pub const PROTOCOL_VERSION: u32 = 1;

/// Largest accepted frame (label byte plus body)
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Stable identity of one worker for the life of a run
///
/// Assigned by the coordinator during the handshake, independent of how the
/// transport numbers its connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(usize);

impl WorkerId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// Message label carried in the frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Label {
    Task = 0,
    Ready = 1,
    Terminate = 2,
    HistCount = 3,
    HistWord = 4,
    HistFreq = 5,
    Abort = 6,
    Hello = 7,
}

impl Label {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Label::Task,
            1 => Label::Ready,
            2 => Label::Terminate,
            3 => Label::HistCount,
            4 => Label::HistWord,
            5 => Label::HistFreq,
            6 => Label::Abort,
            7 => Label::Hello,
            _ => return None,
        })
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Logical channel this label travels on
    pub fn channel(self) -> Channel {
        match self {
            Label::HistCount | Label::HistWord | Label::HistFreq => Channel::Data,
            Label::Task | Label::Ready | Label::Terminate | Label::Abort | Label::Hello => {
                Channel::Control
            }
        }
    }
}

/// Logical channel of a participant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Task assignment, ready-signals, termination
    Control,
    /// Histogram payloads
    Data,
}

/// Handshake message, sent once in each direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloMessage {
    /// Protocol version (must match)
    pub protocol_version: u32,

    /// Identity the coordinator assigned to this worker
    pub worker_id: WorkerId,

    /// Host name of the sender
    pub node_id: String,
}

/// Task assignment (Coordinator → Worker)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMessage {
    /// Position of the file in the task list
    pub task_index: usize,

    /// File to count
    pub path: PathBuf,
}

/// Ready-signal (Worker → Coordinator): idle, assign more work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyMessage {
    pub worker_id: WorkerId,
}

/// Fatal worker error (Worker → Coordinator)
///
/// The coordinator aborts the run when it receives one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbortMessage {
    /// Sender identity, if the handshake got that far
    pub worker_id: Option<WorkerId>,

    /// Error description
    pub reason: String,
}

/// Protocol message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Handshake (both directions)
    Hello(HelloMessage),

    /// Count one file (Coordinator → Worker)
    Task(TaskMessage),

    /// Task finished, worker idle (Worker → Coordinator)
    Ready(ReadyMessage),

    /// No more tasks: send the histogram and exit (Coordinator → Worker)
    Terminate,

    /// Number of histogram entries that follow (Worker → Coordinator)
    HistCount(u64),

    /// Word of the next histogram entry (Worker → Coordinator)
    HistWord(WordToken),

    /// Frequency of the word sent just before (Worker → Coordinator)
    HistFreq(u64),

    /// Fatal error, the run must stop (Worker → Coordinator)
    Abort(AbortMessage),
}

impl Message {
    pub fn label(&self) -> Label {
        match self {
            Message::Hello(_) => Label::Hello,
            Message::Task(_) => Label::Task,
            Message::Ready(_) => Label::Ready,
            Message::Terminate => Label::Terminate,
            Message::HistCount(_) => Label::HistCount,
            Message::HistWord(_) => Label::HistWord,
            Message::HistFreq(_) => Label::HistFreq,
            Message::Abort(_) => Label::Abort,
        }
    }

    pub fn channel(&self) -> Channel {
        self.label().channel()
    }

    fn encode_body(&self) -> CountResult<Vec<u8>> {
        let label = self.label();
        let encoded = match self {
            Message::Hello(m) => rmp_serde::to_vec(m),
            Message::Task(m) => rmp_serde::to_vec(m),
            Message::Ready(m) => rmp_serde::to_vec(m),
            Message::Terminate => return Ok(Vec::new()),
            Message::HistCount(n) => rmp_serde::to_vec(n),
            Message::HistWord(w) => rmp_serde::to_vec(w),
            Message::HistFreq(f) => rmp_serde::to_vec(f),
            Message::Abort(m) => rmp_serde::to_vec(m),
        };
        encoded.map_err(|e| WordCountError::Codec {
            label,
            detail: e.to_string(),
        })
    }

    fn decode_body(label: Label, body: &[u8]) -> CountResult<Self> {
        fn decode<'a, T: Deserialize<'a>>(label: Label, body: &'a [u8]) -> CountResult<T> {
            rmp_serde::from_slice(body).map_err(|e| WordCountError::Codec {
                label,
                detail: e.to_string(),
            })
        }

        Ok(match label {
            Label::Hello => Message::Hello(decode(label, body)?),
            Label::Task => Message::Task(decode(label, body)?),
            Label::Ready => Message::Ready(decode(label, body)?),
            Label::Terminate => Message::Terminate,
            Label::HistCount => Message::HistCount(decode(label, body)?),
            Label::HistWord => Message::HistWord(decode(label, body)?),
            Label::HistFreq => Message::HistFreq(decode(label, body)?),
            Label::Abort => Message::Abort(decode(label, body)?),
        })
    }
}

/// Serialize a message to a complete frame
pub fn serialize_message(msg: &Message) -> CountResult<Vec<u8>> {
    let body = msg.encode_body()?;

    let frame_len = 1 + body.len();
    if frame_len > MAX_FRAME_LEN {
        return Err(WordCountError::Codec {
            label: msg.label(),
            detail: format!("frame too large: {} bytes (max {})", frame_len, MAX_FRAME_LEN),
        });
    }

    let mut framed = Vec::with_capacity(4 + frame_len);
    framed.extend_from_slice(&(frame_len as u32).to_le_bytes());
    framed.push(msg.label().as_u8());
    framed.extend_from_slice(&body);

    Ok(framed)
}

/// Deserialize a message from a buffer holding at least one frame
///
/// Returns (message, bytes_consumed) where bytes_consumed includes the length
/// prefix.
pub fn deserialize_message(buf: &[u8]) -> CountResult<(Message, usize)> {
    if buf.len() < 4 {
        return Err(WordCountError::protocol(
            "frame",
            format!("buffer too small for frame length (need 4 bytes, got {})", buf.len()),
        ));
    }

    let frame_len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    check_frame_len(frame_len)?;

    if buf.len() < 4 + frame_len {
        return Err(WordCountError::protocol(
            "frame",
            format!("incomplete frame (need {} bytes, got {})", 4 + frame_len, buf.len()),
        ));
    }

    let msg = decode_frame(&buf[4..4 + frame_len])?;
    Ok((msg, 4 + frame_len))
}

fn check_frame_len(frame_len: usize) -> CountResult<()> {
    if frame_len == 0 {
        return Err(WordCountError::protocol("frame", "empty frame without label"));
    }
    if frame_len > MAX_FRAME_LEN {
        return Err(WordCountError::protocol(
            "frame",
            format!("frame too large: {} bytes (max {})", frame_len, MAX_FRAME_LEN),
        ));
    }
    Ok(())
}

fn decode_frame(frame: &[u8]) -> CountResult<Message> {
    let label = Label::from_u8(frame[0])
        .ok_or_else(|| WordCountError::protocol("frame", format!("unknown label {}", frame[0])))?;
    Message::decode_body(label, &frame[1..])
}

/// Read the next message, or `None` if the peer closed the stream cleanly
///
/// A stream that ends inside a frame is a transport error.
pub async fn try_read_message<R>(reader: &mut R) -> CountResult<Option<Message>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        let n = reader
            .read(&mut len_buf[filled..])
            .await
            .map_err(|e| WordCountError::transport("Failed to read frame length", e))?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(WordCountError::transport(
                "Stream closed inside frame length",
                std::io::ErrorKind::UnexpectedEof.into(),
            ));
        }
        filled += n;
    }

    let frame_len = u32::from_le_bytes(len_buf) as usize;
    check_frame_len(frame_len)?;

    let mut frame = vec![0u8; frame_len];
    reader
        .read_exact(&mut frame)
        .await
        .map_err(|e| WordCountError::transport("Failed to read frame body", e))?;

    decode_frame(&frame).map(Some)
}

/// Read a complete message from a stream
pub async fn read_message<R>(reader: &mut R) -> CountResult<Message>
where
    R: AsyncRead + Unpin,
{
    try_read_message(reader).await?.ok_or_else(|| {
        WordCountError::transport(
            "Peer closed the connection",
            std::io::ErrorKind::UnexpectedEof.into(),
        )
    })
}

/// Write a message to a stream and flush it
pub async fn write_message<W>(writer: &mut W, msg: &Message) -> CountResult<()>
where
    W: AsyncWrite + Unpin,
{
    let framed = serialize_message(msg)?;

    writer
        .write_all(&framed)
        .await
        .map_err(|e| WordCountError::transport(format!("Failed to write {:?} message", msg.label()), e))?;

    writer
        .flush()
        .await
        .map_err(|e| WordCountError::transport("Failed to flush stream", e))?;

    Ok(())
}

/// Frame bytes buffered before a batched write hits the stream
const BATCH_BYTES: usize = 64 * 1024;

/// Write a sequence of messages as consecutive frames, then flush once
///
/// Each message keeps its own frame; only the socket writes are batched.
pub async fn write_messages<W, I>(writer: &mut W, messages: I) -> CountResult<()>
where
    W: AsyncWrite + Unpin,
    I: IntoIterator<Item = Message>,
{
    let mut batch = Vec::with_capacity(BATCH_BYTES);
    for msg in messages {
        batch.extend_from_slice(&serialize_message(&msg)?);
        if batch.len() >= BATCH_BYTES {
            writer
                .write_all(&batch)
                .await
                .map_err(|e| WordCountError::transport("Failed to write message batch", e))?;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        writer
            .write_all(&batch)
            .await
            .map_err(|e| WordCountError::transport("Failed to write message batch", e))?;
    }

    writer
        .flush()
        .await
        .map_err(|e| WordCountError::transport("Failed to flush stream", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(msg: &Message) -> Message {
        let bytes = serialize_message(msg).unwrap();
        let (decoded, consumed) = deserialize_message(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        decoded
    }

    #[test]
    fn test_serialize_deserialize_task() {
        let msg = Message::Task(TaskMessage {
            task_index: 7,
            path: PathBuf::from("/data/books/moby.txt"),
        });
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn test_serialize_deserialize_histogram_entry() {
        let word = WordToken::fold("Whale").unwrap();
        assert_eq!(round_trip(&Message::HistWord(word.clone())), Message::HistWord(word));
        assert_eq!(round_trip(&Message::HistFreq(42)), Message::HistFreq(42));
    }

    #[test]
    fn test_label_byte_follows_length() {
        let bytes = serialize_message(&Message::Terminate).unwrap();
        assert_eq!(bytes.len(), 5);
        assert_eq!(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]), 1);
        assert_eq!(bytes[4], Label::Terminate.as_u8());
    }

    #[test]
    fn test_label_values_are_stable() {
        assert_eq!(Label::Task.as_u8(), 0);
        assert_eq!(Label::Ready.as_u8(), 1);
        assert_eq!(Label::Terminate.as_u8(), 2);
        assert_eq!(Label::HistCount.as_u8(), 3);
        assert_eq!(Label::HistWord.as_u8(), 4);
        assert_eq!(Label::HistFreq.as_u8(), 5);
        for value in 0..=7u8 {
            assert_eq!(Label::from_u8(value).unwrap().as_u8(), value);
        }
        assert!(Label::from_u8(8).is_none());
    }

    #[test]
    fn test_channels() {
        assert_eq!(Message::Terminate.channel(), Channel::Control);
        assert_eq!(
            Message::Ready(ReadyMessage { worker_id: WorkerId::new(0) }).channel(),
            Channel::Control
        );
        assert_eq!(Message::HistCount(0).channel(), Channel::Data);
        assert_eq!(Message::HistFreq(1).channel(), Channel::Data);
    }

    #[test]
    fn test_unknown_label_is_protocol_violation() {
        let bytes = [1u8, 0, 0, 0, 99];
        let err = deserialize_message(&bytes).unwrap_err();
        assert!(matches!(err, WordCountError::ProtocolViolation { .. }));
    }

    #[test]
    fn test_body_must_match_label() {
        // A HistFreq body framed under the HistWord label must not decode.
        let mut bytes = serialize_message(&Message::HistFreq(3)).unwrap();
        bytes[4] = Label::HistWord.as_u8();
        let err = deserialize_message(&bytes).unwrap_err();
        assert!(matches!(err, WordCountError::Codec { label: Label::HistWord, .. }));
    }

    #[test]
    fn test_non_canonical_word_rejected() {
        let body = rmp_serde::to_vec(&"Not A Word".to_string()).unwrap();
        let mut bytes = ((1 + body.len()) as u32).to_le_bytes().to_vec();
        bytes.push(Label::HistWord.as_u8());
        bytes.extend_from_slice(&body);
        assert!(deserialize_message(&bytes).is_err());
    }

    #[test]
    fn test_oversized_and_incomplete_frames() {
        let too_big = ((MAX_FRAME_LEN + 1) as u32).to_le_bytes();
        assert!(deserialize_message(&too_big).is_err());

        let bytes = serialize_message(&Message::HistCount(12)).unwrap();
        assert!(deserialize_message(&bytes[..bytes.len() - 1]).is_err());
        assert!(deserialize_message(&bytes[..2]).is_err());
    }

    #[tokio::test]
    async fn test_stream_read_write_and_clean_eof() {
        let (mut a, mut b) = tokio::io::duplex(1024);

        let hello = Message::Hello(HelloMessage {
            protocol_version: PROTOCOL_VERSION,
            worker_id: WorkerId::new(4),
            node_id: "node-a".to_string(),
        });
        write_message(&mut a, &hello).await.unwrap();
        write_message(&mut a, &Message::HistCount(0)).await.unwrap();
        drop(a);

        assert_eq!(read_message(&mut b).await.unwrap(), hello);
        assert_eq!(try_read_message(&mut b).await.unwrap(), Some(Message::HistCount(0)));
        assert_eq!(try_read_message(&mut b).await.unwrap(), None);
        assert!(matches!(
            read_message(&mut b).await.unwrap_err(),
            WordCountError::Transport { .. }
        ));
    }

    #[tokio::test]
    async fn test_truncated_stream_is_transport_error() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        let bytes = serialize_message(&Message::HistFreq(9)).unwrap();
        a.write_all(&bytes[..bytes.len() - 1]).await.unwrap();
        drop(a);

        let err = try_read_message(&mut b).await.unwrap_err();
        assert!(matches!(err, WordCountError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_batched_frames_arrive_individually() {
        let (mut a, mut b) = tokio::io::duplex(4096);
        let total = 20_000u64;

        let writer = tokio::spawn(async move {
            write_messages(&mut a, (0..total).map(Message::HistFreq)).await.unwrap();
        });

        for expected in 0..total {
            assert_eq!(read_message(&mut b).await.unwrap(), Message::HistFreq(expected));
        }
        writer.await.unwrap();
        assert_eq!(try_read_message(&mut b).await.unwrap(), None);
    }
}
