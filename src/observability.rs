use std::net::SocketAddr;

use crate::sql::Command;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total queries executed. Labels: command, status.
pub const QUERIES_TOTAL: &str = "roomd_queries_total";

/// Histogram: query latency in seconds. Labels: command.
pub const QUERY_DURATION_SECONDS: &str = "roomd_query_duration_seconds";

/// Counter: booking attempts. Labels: outcome (created, conflict, busy, invalid).
pub const BOOKINGS_TOTAL: &str = "roomd_bookings_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Histogram: time spent waiting for a room's write lock, in seconds.
pub const LOCK_WAIT_SECONDS: &str = "roomd_lock_wait_seconds";

/// Gauge: rooms with at least one booking attempt since start or last reset.
pub const ROOMS_ACTIVE: &str = "roomd_rooms_active";

/// Gauge: active TCP connections.
pub const CONNECTIONS_ACTIVE: &str = "roomd_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "roomd_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "roomd_connections_rejected_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map a Command variant to a short label for metrics.
pub fn command_label(cmd: &Command) -> &'static str {
    match cmd {
        Command::BookRoom { .. } => "book_room",
        Command::SelectReservations { room_id: Some(_) } => "select_reservations",
        Command::SelectReservations { room_id: None } => "select_all_reservations",
        Command::SelectAvailableRoom { .. } => "select_available_room",
        Command::Reset => "reset",
    }
}
