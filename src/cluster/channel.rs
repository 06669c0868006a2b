//! Worker-side channel to the primary.
//!
//! A [`ChannelClient`] wraps the worker's half of the stdio pipe. Commands
//! are written under a mutex; a background reader task resolves each reply
//! against the pending entry registered under its `seq`, so replies pair
//! correctly even when several HTTP requests have commands in flight at
//! once. Once the pipe breaks (EOF, bad data, or a reply that never
//! arrives), every pending and future call fails with
//! [`ChannelError::Closed`] and the closure is signalled so the worker can
//! stop serving.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::{oneshot, Mutex, Notify};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{CreateUser, UpdateUser, User};
use crate::protocol::{
    read_frame, write_frame, ChannelError, Command, CommandFrame, CommandReply, ReplyFrame,
};
use crate::store::{StoreError, UserStore};

/// How long a worker waits for a reply before declaring the channel broken.
const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

struct ChannelInner<W> {
    writer: Mutex<W>,
    pending: StdMutex<HashMap<u64, oneshot::Sender<CommandReply>>>,
    next_seq: AtomicU64,
    closed: AtomicBool,
    on_close: Notify,
}

impl<W> ChannelInner<W> {
    /// Marks the channel broken exactly once: drops every pending reply
    /// slot (failing their waiters) and wakes whoever watches for closure.
    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.pending.lock().expect("pending lock").clear();
            self.on_close.notify_one();
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// The worker's store: forwards every operation to the primary over the
/// process's private channel.
pub struct ChannelClient<W> {
    inner: Arc<ChannelInner<W>>,
}

impl<W> Clone for ChannelClient<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W> ChannelClient<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Wraps the transport and spawns the reply reader task.
    pub fn connect<R>(reader: R, writer: W) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let inner = Arc::new(ChannelInner {
            writer: Mutex::new(writer),
            pending: StdMutex::new(HashMap::new()),
            next_seq: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            on_close: Notify::new(),
        });
        tokio::spawn(read_replies(reader, Arc::clone(&inner)));
        Self { inner }
    }

    /// Resolves once the channel has broken.
    pub async fn closed(&self) {
        if self.inner.is_closed() {
            return;
        }
        self.inner.on_close.notified().await;
    }

    /// Sends one command and waits for its reply.
    async fn send(&self, command: Command) -> Result<CommandReply, ChannelError> {
        if self.inner.is_closed() {
            return Err(ChannelError::Closed);
        }

        let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
        let (respond_to, response) = oneshot::channel();
        self.inner
            .pending
            .lock()
            .expect("pending lock")
            .insert(seq, respond_to);

        let frame = CommandFrame { seq, command };
        {
            let mut writer = self.inner.writer.lock().await;
            if let Err(err) = write_frame(&mut *writer, &frame).await {
                self.inner.pending.lock().expect("pending lock").remove(&seq);
                self.inner.close();
                return Err(ChannelError::Io(err));
            }
        }

        match tokio::time::timeout(REPLY_TIMEOUT, response).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(ChannelError::Closed),
            Err(_) => {
                // A reply that never comes means request/reply pairing can
                // no longer be trusted on this pipe.
                self.inner.pending.lock().expect("pending lock").remove(&seq);
                self.inner.close();
                Err(ChannelError::Timeout)
            }
        }
    }
}

async fn read_replies<R, W>(mut reader: R, inner: Arc<ChannelInner<W>>)
where
    R: AsyncBufRead + Unpin,
{
    loop {
        match read_frame::<_, ReplyFrame>(&mut reader).await {
            Ok(Some(frame)) => {
                let respond_to = inner
                    .pending
                    .lock()
                    .expect("pending lock")
                    .remove(&frame.seq);
                match respond_to {
                    Some(tx) => {
                        let _ = tx.send(frame.reply);
                    }
                    None => {
                        // A reply with no outstanding command is a protocol
                        // error; the pipe is desynced.
                        warn!(seq = frame.seq, "reply without a pending command");
                        break;
                    }
                }
            }
            Ok(None) => {
                debug!("primary closed the channel");
                break;
            }
            Err(err) => {
                warn!(error = %err, "channel read failed");
                break;
            }
        }
    }
    inner.close();
}

fn unexpected(reply: CommandReply) -> ChannelError {
    match reply {
        CommandReply::Error { code, message } => ChannelError::Remote { code, message },
        other => ChannelError::Remote {
            code: "protocol".to_string(),
            message: format!("unexpected reply: {other:?}"),
        },
    }
}

#[async_trait]
impl<W> UserStore for ChannelClient<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn list(&self) -> Result<Vec<User>, StoreError> {
        match self.send(Command::List).await? {
            CommandReply::Users { users } => Ok(users),
            reply => Err(unexpected(reply).into()),
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        match self.send(Command::Get { id }).await? {
            CommandReply::User { user } => Ok(user),
            reply => Err(unexpected(reply).into()),
        }
    }

    async fn create(&self, user: CreateUser) -> Result<User, StoreError> {
        match self.send(Command::Create { user }).await? {
            CommandReply::User { user: Some(user) } => Ok(user),
            reply => Err(unexpected(reply).into()),
        }
    }

    async fn update(&self, id: Uuid, user: UpdateUser) -> Result<Option<User>, StoreError> {
        match self.send(Command::Update { id, user }).await? {
            CommandReply::User { user } => Ok(user),
            reply => Err(unexpected(reply).into()),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        match self.send(Command::Delete { id }).await? {
            CommandReply::Deleted { deleted } => Ok(deleted),
            reply => Err(unexpected(reply).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    fn connect_over_duplex() -> (
        ChannelClient<tokio::io::WriteHalf<tokio::io::DuplexStream>>,
        BufReader<tokio::io::ReadHalf<tokio::io::DuplexStream>>,
        tokio::io::WriteHalf<tokio::io::DuplexStream>,
    ) {
        let (client_io, server_io) = tokio::io::duplex(4096);
        let (client_read, client_write) = tokio::io::split(client_io);
        let client = ChannelClient::connect(BufReader::new(client_read), client_write);
        let (server_read, server_write) = tokio::io::split(server_io);
        (client, BufReader::new(server_read), server_write)
    }

    #[tokio::test]
    async fn replies_pair_by_seq_even_when_answered_out_of_order() {
        let (client, mut server_read, mut server_write) = connect_over_duplex();

        let server = tokio::spawn(async move {
            let first: CommandFrame = read_frame(&mut server_read)
                .await
                .expect("read")
                .expect("frame");
            let second: CommandFrame = read_frame(&mut server_read)
                .await
                .expect("read")
                .expect("frame");

            // Answer both, later arrival first; pairing must still hold.
            for frame in [second, first] {
                let reply = match frame.command {
                    Command::List => CommandReply::Users { users: Vec::new() },
                    Command::Delete { .. } => CommandReply::Deleted { deleted: false },
                    other => panic!("unexpected command {other:?}"),
                };
                write_frame(
                    &mut server_write,
                    &ReplyFrame {
                        seq: frame.seq,
                        reply,
                    },
                )
                .await
                .expect("write reply");
            }
        });

        let (listed, deleted) = tokio::join!(client.list(), client.delete(Uuid::new_v4()));
        assert_eq!(listed.expect("list reply"), Vec::new());
        assert!(!deleted.expect("delete reply"));
        server.await.expect("server task");
    }

    #[tokio::test]
    async fn broken_pipe_fails_pending_and_future_calls() {
        let (client, server_read, server_write) = connect_over_duplex();
        drop(server_read);
        drop(server_write);

        client.closed().await;

        let err = client.list().await.expect_err("channel is broken");
        assert!(matches!(
            err,
            StoreError::Channel(ChannelError::Closed) | StoreError::Channel(ChannelError::Io(_))
        ));
    }

    #[tokio::test]
    async fn remote_error_surfaces_as_store_error() {
        let (client, mut server_read, mut server_write) = connect_over_duplex();

        tokio::spawn(async move {
            let frame: CommandFrame = read_frame(&mut server_read)
                .await
                .expect("read")
                .expect("frame");
            write_frame(
                &mut server_write,
                &ReplyFrame {
                    seq: frame.seq,
                    reply: CommandReply::Error {
                        code: "store_unavailable".to_string(),
                        message: "store closed".to_string(),
                    },
                },
            )
            .await
            .expect("write reply");
        });

        let err = client.list().await.expect_err("remote error");
        match err {
            StoreError::Channel(ChannelError::Remote { code, .. }) => {
                assert_eq!(code, "store_unavailable");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
