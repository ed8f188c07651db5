//! Prometheus metrics for the inventory ledger, exposed in text format at `/metrics`.

use crate::entities::stock_movement::MovementType;
use crate::errors::ServiceError;
use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
};
use lazy_static::lazy_static;
use prometheus::{
    core::Collector, Counter, Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use std::time::Duration;
use tracing::warn;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    static ref MOVEMENTS_RECORDED: IntCounterVec = register(
        IntCounterVec::new(
            Opts::new(
                "inventory_movements_recorded_total",
                "Ledger entries written, by movement type"
            ),
            &["movement_type"]
        )
        .expect("metric can be created")
    );
    static ref WORKFLOWS_COMPLETED: IntCounterVec = register(
        IntCounterVec::new(
            Opts::new(
                "inventory_workflows_completed_total",
                "Committed inventory workflows"
            ),
            &["workflow"]
        )
        .expect("metric can be created")
    );
    static ref WORKFLOW_FAILURES: IntCounterVec = register(
        IntCounterVec::new(
            Opts::new(
                "inventory_workflow_failures_total",
                "Rejected or rolled back inventory workflows"
            ),
            &["workflow", "error_type"]
        )
        .expect("metric can be created")
    );
    static ref WORKFLOW_DURATION: HistogramVec = register(
        HistogramVec::new(
            HistogramOpts::new(
                "inventory_workflow_duration_seconds",
                "Wall time of inventory workflows"
            ),
            &["workflow"]
        )
        .expect("metric can be created")
    );
    static ref UNITS_TRANSFERRED: Counter = register(
        Counter::new(
            "inventory_units_transferred_total",
            "Units moved between locations"
        )
        .expect("metric can be created")
    );
}

fn register<C>(collector: C) -> C
where
    C: Collector + Clone + 'static,
{
    if let Err(e) = REGISTRY.register(Box::new(collector.clone())) {
        warn!(error = %e, "Failed to register metric");
    }
    collector
}

pub fn record_movement(movement_type: MovementType) {
    MOVEMENTS_RECORDED
        .with_label_values(&[movement_type.as_str()])
        .inc();
}

pub fn record_transfer_volume(quantity: Decimal) {
    UNITS_TRANSFERRED.inc_by(quantity.abs().to_f64().unwrap_or_default());
}

/// Counts the outcome of one workflow invocation and observes its duration.
pub fn record_workflow<T>(workflow: &str, elapsed: Duration, result: &Result<T, ServiceError>) {
    WORKFLOW_DURATION
        .with_label_values(&[workflow])
        .observe(elapsed.as_secs_f64());
    match result {
        Ok(_) => WORKFLOWS_COMPLETED.with_label_values(&[workflow]).inc(),
        Err(e) => WORKFLOW_FAILURES
            .with_label_values(&[workflow, e.code()])
            .inc(),
    }
}

/// Renders all registered metrics.
pub fn render() -> Result<String, ServiceError> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| ServiceError::InternalError(format!("metrics encoding failed: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| ServiceError::InternalError(format!("metrics are not UTF-8: {}", e)))
}

/// `GET /metrics`
pub async fn metrics_handler() -> Result<impl IntoResponse, ServiceError> {
    let body = render()?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
        body,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_output_contains_recorded_series() {
        record_movement(MovementType::Receipt);
        record_workflow::<()>(
            "transfer",
            Duration::from_millis(3),
            &Err(ServiceError::InvalidOperation("nope".into())),
        );
        record_transfer_volume(Decimal::new(25, 1));

        let text = render().unwrap();
        assert!(text.contains("inventory_movements_recorded_total{movement_type=\"RECEIPT\"}"));
        assert!(text.contains("error_type=\"invalid_operation\""));
        assert!(text.contains("inventory_units_transferred_total"));
    }
}
