//! The primary process: spawns the worker pool, routes their commands to
//! the canonical store, and fronts them with the dispatcher.
//!
//! Workers are re-executions of the current binary with the hidden
//! `worker` subcommand. Each child's stdin/stdout pair is its private
//! channel; stderr is inherited so worker logs land on the primary's
//! terminal. The registry of workers is fixed at startup for the lifetime
//! of the process.

use std::io;
use std::process::Stdio;

use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::process::{Child, Command as WorkerCommand};
use tracing::{error, info, warn};

use crate::dispatch;
use crate::protocol::{read_frame, write_frame, Command, CommandFrame, CommandReply, ReplyFrame};
use crate::store::{StoreActor, StoreClient, UserStore};

/// One spawned worker: its slot in the round-robin order, the port its
/// listener serves, and the process handle keeping it alive.
pub struct WorkerHandle {
    pub id: usize,
    pub port: u16,
    child: Child,
}

/// Runs the primary: store actor, worker pool, per-channel routers, and
/// the public dispatcher on `base_port`. Returns when the dispatcher fails
/// or the process receives ctrl-c, killing the workers either way.
pub async fn run(base_port: u16, worker_count: usize) -> io::Result<()> {
    let (actor, store) = StoreActor::new(64);
    tokio::spawn(actor.run());

    let mut workers = spawn_workers(base_port, worker_count, &store)?;
    let ports: Vec<u16> = workers.iter().map(|worker| worker.port).collect();
    info!(count = workers.len(), ?ports, "cluster ready");

    let result = tokio::select! {
        result = dispatch::serve(base_port, ports) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            Ok(())
        }
    };

    for worker in &mut workers {
        if let Err(err) = worker.child.start_kill() {
            warn!(worker = worker.id, error = %err, "failed to kill worker");
        }
    }

    result
}

/// Spawns the fixed worker pool. Worker `i` listens on `base_port + i + 1`.
fn spawn_workers(
    base_port: u16,
    worker_count: usize,
    store: &StoreClient,
) -> io::Result<Vec<WorkerHandle>> {
    let exe = std::env::current_exe()?;
    let mut workers = Vec::with_capacity(worker_count);

    for id in 0..worker_count {
        let port = base_port + 1 + id as u16;
        let mut child = WorkerCommand::new(&exe)
            .arg("worker")
            .arg("--port")
            .arg(port.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take().expect("worker stdin is piped");
        let stdout = child.stdout.take().expect("worker stdout is piped");
        tokio::spawn(route_channel(
            id,
            BufReader::new(stdout),
            stdin,
            store.clone(),
        ));

        info!(worker = id, port, "spawned worker");
        workers.push(WorkerHandle { id, port, child });
    }

    Ok(workers)
}

/// Services one worker channel: every command read gets exactly one reply,
/// written back on the channel it arrived on, in arrival order.
///
/// Commands from different channels are still applied to the store in a
/// single global order, since all routers share the store actor's one queue.
async fn route_channel<R, W>(worker: usize, mut reader: R, mut writer: W, store: StoreClient)
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let frame: CommandFrame = match read_frame(&mut reader).await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!(worker, "worker channel closed");
                return;
            }
            Err(err) => {
                warn!(worker, error = %err, "worker channel read failed");
                return;
            }
        };

        let reply = apply(&store, frame.command).await;
        let frame = ReplyFrame {
            seq: frame.seq,
            reply,
        };
        if let Err(err) = write_frame(&mut writer, &frame).await {
            warn!(worker, error = %err, "worker channel write failed");
            return;
        }
    }
}

/// Applies one command to the canonical store.
///
/// Faults never propagate out of the router: they are logged here and
/// encoded into the reply for the worker to translate into an HTTP status.
async fn apply(store: &StoreClient, command: Command) -> CommandReply {
    let result = match command {
        Command::List => store
            .list()
            .await
            .map(|users| CommandReply::Users { users }),
        Command::Get { id } => store.get(id).await.map(|user| CommandReply::User { user }),
        Command::Create { user } => store
            .create(user)
            .await
            .map(|user| CommandReply::User { user: Some(user) }),
        Command::Update { id, user } => store
            .update(id, user)
            .await
            .map(|user| CommandReply::User { user }),
        Command::Delete { id } => store
            .delete(id)
            .await
            .map(|deleted| CommandReply::Deleted { deleted }),
    };

    result.unwrap_or_else(|err| {
        error!(error = %err, "store call failed");
        CommandReply::Error {
            code: "store_unavailable".to_string(),
            message: err.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CreateUser;

    #[tokio::test]
    async fn router_answers_on_the_originating_channel_with_matching_seq() {
        let (actor, store) = StoreActor::new(8);
        tokio::spawn(actor.run());

        let (worker_io, primary_io) = tokio::io::duplex(4096);
        let (primary_read, primary_write) = tokio::io::split(primary_io);
        tokio::spawn(route_channel(
            0,
            BufReader::new(primary_read),
            primary_write,
            store.clone(),
        ));

        let (worker_read, mut worker_write) = tokio::io::split(worker_io);
        let mut worker_read = BufReader::new(worker_read);

        let create = CommandFrame {
            seq: 41,
            command: Command::Create {
                user: CreateUser {
                    username: "ana".to_string(),
                    age: 30,
                    hobbies: vec!["chess".to_string()],
                },
            },
        };
        write_frame(&mut worker_write, &create).await.expect("write");
        let reply: ReplyFrame = read_frame(&mut worker_read)
            .await
            .expect("read")
            .expect("reply");
        assert_eq!(reply.seq, 41);
        let created = match reply.reply {
            CommandReply::User { user: Some(user) } => user,
            other => panic!("unexpected reply {other:?}"),
        };
        assert_eq!(created.username, "ana");

        // The mutation is visible through the in-process client too: both
        // paths reach the same store.
        let listed = store.list().await.expect("list");
        assert_eq!(listed, vec![created]);
    }
}
