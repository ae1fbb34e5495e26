use std::io;
use std::sync::Arc;
use std::time::Instant;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};

use crate::command::{parse_command, Command};
use crate::engine::{Engine, EngineError};
use crate::limits::MAX_LINE_LEN;
use crate::observability;

/// Serve one client: one command per line in, one JSON object per line out.
///
/// Every reply is either `{"ok":true,"data":...}` or
/// `{"ok":false,"error":"..."}`. Returns when the client hangs up.
pub async fn process_connection(socket: TcpStream, engine: Arc<Engine>) -> io::Result<()> {
    let mut framed = Framed::new(socket, LinesCodec::new_with_max_length(MAX_LINE_LEN));

    while let Some(frame) = framed.next().await {
        let reply = match frame {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                handle_line(&engine, &line).await
            }
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                metrics::counter!(observability::COMMANDS_TOTAL, "command" => "invalid", "status" => "error")
                    .increment(1);
                failure(format!("line longer than {MAX_LINE_LEN} bytes"))
            }
            Err(LinesCodecError::Io(e)) => return Err(e),
        };
        framed.send(reply.to_string()).await.map_err(codec_err)?;
    }
    Ok(())
}

async fn handle_line(engine: &Engine, line: &str) -> Value {
    let cmd = match parse_command(line) {
        Ok(cmd) => cmd,
        Err(e) => {
            metrics::counter!(observability::COMMANDS_TOTAL, "command" => "invalid", "status" => "error")
                .increment(1);
            return failure(e.to_string());
        }
    };

    let label = observability::command_label(&cmd);
    let started = Instant::now();
    let result = execute_command(engine, cmd).await;
    metrics::histogram!(observability::COMMAND_DURATION_SECONDS, "command" => label)
        .record(started.elapsed().as_secs_f64());

    match result {
        Ok(data) => {
            metrics::counter!(observability::COMMANDS_TOTAL, "command" => label, "status" => "ok")
                .increment(1);
            json!({ "ok": true, "data": data })
        }
        Err(e) => {
            metrics::counter!(observability::COMMANDS_TOTAL, "command" => label, "status" => "error")
                .increment(1);
            tracing::debug!("{label} failed: {e}");
            failure(e.to_string())
        }
    }
}

async fn execute_command(engine: &Engine, cmd: Command) -> Result<Value, EngineError> {
    match cmd {
        Command::Ping => Ok(json!("PONG")),
        Command::Status => Ok(json!(engine.status().await)),
        Command::ListClubs => Ok(json!(engine.clubs().await)),
        Command::AddClub { name, credit } => {
            engine.register_club(&name, credit).await?;
            Ok(json!({ "club": name, "credit": credit }))
        }
        Command::RemoveClub { name } => {
            engine.remove_club(&name).await?;
            Ok(json!({ "removed": name }))
        }
        Command::ListRooms => Ok(json!(engine.rooms().await)),
        Command::AddRoom { name } => {
            engine.register_room(&name).await?;
            Ok(json!({ "room": name }))
        }
        Command::RemoveRoom { name } => {
            engine.remove_room(&name).await?;
            Ok(json!({ "removed": name }))
        }
        Command::SetRoomOpen { room, days, open } => {
            engine.set_room_open(&room, &days, open).await?;
            Ok(json!({ "room": room, "days": days, "open": open }))
        }
        Command::Submit { club, selections } => {
            let id = engine.submit_reservation(&club, selections).await?;
            Ok(json!({ "id": id.to_string() }))
        }
        Command::Pending => Ok(json!(engine.pending_reservations().await)),
        Command::Run => Ok(json!(engine.run_lottery().await?)),
        Command::History { limit } => Ok(json!(engine.history(limit).await)),
    }
}

fn failure(message: String) -> Value {
    json!({ "ok": false, "error": message })
}

fn codec_err(e: LinesCodecError) -> io::Error {
    match e {
        LinesCodecError::Io(e) => e,
        other => io::Error::other(other.to_string()),
    }
}
