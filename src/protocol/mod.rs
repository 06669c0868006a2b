//! Wire protocol between a worker and the primary.
//!
//! Frames are newline-delimited JSON over the worker's stdio pipe. Every
//! [`CommandFrame`] a worker sends is answered by exactly one
//! [`ReplyFrame`] carrying the same `seq`, on the same channel. Pairing is
//! by `seq` alone; nothing about the protocol depends on reply ordering,
//! so a worker may have several commands in flight at once.
//!
//! Request format: `{"seq": 3, "command": {"op": "get", "id": "..."}}`
//! Reply format: `{"seq": 3, "reply": {"result": "user", "user": ...}}`

use std::io;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use uuid::Uuid;

use crate::domain::{CreateUser, UpdateUser, User};

/// A store operation requested by a worker.
///
/// A closed enum rather than a command-name string: the primary's router
/// matches it exhaustively, so adding an operation without handling it is
/// a compile error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    List,
    Get { id: Uuid },
    Create { user: CreateUser },
    Update { id: Uuid, user: UpdateUser },
    Delete { id: Uuid },
}

/// The primary's answer to a single [`Command`].
///
/// Unknown ids are encoded as `User { user: None }`, never as `Error`:
/// errors never cross the channel as anything but data, and `Error` is
/// reserved for faults the primary could not attribute to the request
/// itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CommandReply {
    Users { users: Vec<User> },
    User { user: Option<User> },
    Deleted { deleted: bool },
    Error { code: String, message: String },
}

/// Envelope for a worker-to-primary command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandFrame {
    pub seq: u64,
    pub command: Command,
}

/// Envelope for a primary-to-worker reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyFrame {
    pub seq: u64,
    pub reply: CommandReply,
}

/// Failures of the worker-primary channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The pipe closed, or an earlier failure already marked it broken.
    #[error("channel closed")]
    Closed,

    /// No reply arrived in time; the channel can no longer be trusted.
    #[error("timed out waiting for a reply")]
    Timeout,

    #[error("channel io error: {0}")]
    Io(#[from] io::Error),

    /// The primary answered with its error payload.
    #[error("primary reported {code}: {message}")]
    Remote { code: String, message: String },
}

/// Reads the next frame from the channel. Returns `Ok(None)` on EOF.
pub async fn read_frame<R, T>(reader: &mut R) -> io::Result<Option<T>>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = String::new();
    loop {
        line.clear();
        let bytes = reader.read_line(&mut line).await?;
        if bytes == 0 {
            return Ok(None);
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let parsed = serde_json::from_str(trimmed)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        return Ok(Some(parsed));
    }
}

/// Writes one frame followed by the newline delimiter and flushes, so the
/// peer never waits on a buffered frame.
pub async fn write_frame<W, T>(writer: &mut W, frame: &T) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut encoded = serde_json::to_vec(frame)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    encoded.push(b'\n');
    writer.write_all(&encoded).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn command_frame_round_trip() {
        let (mut writer, reader) = tokio::io::duplex(1024);
        let mut reader = tokio::io::BufReader::new(reader);
        let frame = CommandFrame {
            seq: 7,
            command: Command::Get { id: Uuid::new_v4() },
        };

        write_frame(&mut writer, &frame).await.expect("write frame");
        let parsed: CommandFrame = read_frame(&mut reader)
            .await
            .expect("read frame")
            .expect("expected a frame");

        assert_eq!(frame, parsed);
    }

    #[tokio::test]
    async fn reply_frame_round_trip() {
        let (mut writer, reader) = tokio::io::duplex(1024);
        let mut reader = tokio::io::BufReader::new(reader);
        let frame = ReplyFrame {
            seq: 3,
            reply: CommandReply::User { user: None },
        };

        write_frame(&mut writer, &frame).await.expect("write frame");
        let parsed: ReplyFrame = read_frame(&mut reader)
            .await
            .expect("read frame")
            .expect("expected a frame");

        assert_eq!(frame, parsed);
    }

    #[tokio::test]
    async fn blank_lines_are_skipped_and_eof_ends_the_stream() {
        let (mut writer, reader) = tokio::io::duplex(1024);
        let mut reader = tokio::io::BufReader::new(reader);

        writer.write_all(b"\n").await.expect("write blank");
        let frame = CommandFrame {
            seq: 1,
            command: Command::List,
        };
        write_frame(&mut writer, &frame).await.expect("write frame");
        drop(writer);

        let parsed: Option<CommandFrame> = read_frame(&mut reader).await.expect("read frame");
        assert_eq!(parsed, Some(frame));
        let eof: Option<CommandFrame> = read_frame(&mut reader).await.expect("read eof");
        assert!(eof.is_none());
    }

    #[test]
    fn commands_are_tagged_by_operation() {
        let json = serde_json::to_string(&Command::List).expect("serialize");
        assert!(json.contains("\"op\":\"list\""));

        let json = serde_json::to_string(&ReplyFrame {
            seq: 9,
            reply: CommandReply::Deleted { deleted: true },
        })
        .expect("serialize");
        assert!(json.contains("\"seq\":9"));
        assert!(json.contains("\"result\":\"deleted\""));
    }

    #[test]
    fn garbage_is_an_error_not_a_panic() {
        let err = serde_json::from_str::<CommandFrame>("{\"seq\":1}").unwrap_err();
        assert!(err.to_string().contains("command"));
    }
}
