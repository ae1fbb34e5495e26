use std::net::SocketAddr;

use crate::command::Command;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total commands executed. Labels: command, status.
pub const COMMANDS_TOTAL: &str = "roomdraw_commands_total";

/// Histogram: command latency in seconds. Labels: command.
pub const COMMAND_DURATION_SECONDS: &str = "roomdraw_command_duration_seconds";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: active TCP connections.
pub const CONNECTIONS_ACTIVE: &str = "roomdraw_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "roomdraw_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "roomdraw_connections_rejected_total";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "roomdraw_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "roomdraw_wal_flush_batch_size";

// ── Lottery ─────────────────────────────────────────────────────

/// Counter: lottery triggers. Labels: outcome (committed, degraded, rejected, busy).
pub const LOTTERY_RUNS_TOTAL: &str = "roomdraw_lottery_runs_total";

/// Histogram: wall time of one run, commit included.
pub const LOTTERY_RUN_DURATION_SECONDS: &str = "roomdraw_lottery_run_duration_seconds";

/// Counter: rooms handed out by committed runs. Labels: via (preference, leftover).
pub const ROOMS_ASSIGNED_TOTAL: &str = "roomdraw_rooms_assigned_total";

/// Counter: slots that ended a committed run with no room.
pub const SLOTS_UNMATCHED_TOTAL: &str = "roomdraw_slots_unmatched_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    match metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
    {
        Ok(()) => tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics"),
        Err(e) => tracing::error!("failed to install Prometheus exporter: {e}"),
    }
}

/// Map a Command variant to a short label for metrics.
pub fn command_label(cmd: &Command) -> &'static str {
    match cmd {
        Command::Ping => "ping",
        Command::Status => "status",
        Command::ListClubs => "list_clubs",
        Command::AddClub { .. } => "add_club",
        Command::RemoveClub { .. } => "remove_club",
        Command::ListRooms => "list_rooms",
        Command::AddRoom { .. } => "add_room",
        Command::RemoveRoom { .. } => "remove_room",
        Command::SetRoomOpen { .. } => "set_room_open",
        Command::Submit { .. } => "submit",
        Command::Pending => "pending",
        Command::Run => "run",
        Command::History { .. } => "history",
    }
}
