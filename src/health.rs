//! # Health Monitoring
//!
//! `GET /health` (also under `/api`) reports liveness with connection, room and cache counters;
//! `GET /api/v1/metrics` adds request metrics and process memory.

use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let config = &state.config;
    let router = &state.router;
    let cache = state.orchestrator.cache();

    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "DashkaChat",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime": state.get_uptime_seconds(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "realtime": {
            "connections": router.registry().len(),
            "rooms": router.rooms().room_count()
        },
        "cache": {
            "size": cache.size(),
            "capacity": cache.capacity(),
            "ttl_secs": config.cache.ttl_secs
        },
        "providers": {
            "configured": config.providers_configured(),
            "translation_model": config.providers.translation_model,
            "transcription_model": config.providers.transcription_model,
            "tts_model": config.providers.tts_model
        },
        "metrics": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count
        },
        "memory": get_memory_info()
    }))
}

pub async fn detailed_metrics(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let uptime_seconds = state.get_uptime_seconds();

    let mut endpoint_stats = Vec::new();
    for (endpoint, metric) in metrics.endpoint_metrics.iter() {
        endpoint_stats.push(json!({
            "endpoint": endpoint,
            "request_count": metric.request_count,
            "error_count": metric.error_count,
            "error_rate": metric.error_rate(),
            "average_duration_ms": metric.average_duration_ms(),
            "total_duration_ms": metric.total_duration_ms
        }));
    }

    HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "overall": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "error_rate": if metrics.request_count > 0 {
                metrics.error_count as f64 / metrics.request_count as f64
            } else {
                0.0
            },
            "requests_per_second": if uptime_seconds > 0 {
                metrics.request_count as f64 / uptime_seconds as f64
            } else {
                0.0
            }
        },
        "realtime": {
            "connections": state.router.registry().len(),
            "rooms": state.router.rooms().room_count()
        },
        "translation_cache_size": state.orchestrator.cache().size(),
        "endpoints": endpoint_stats
    }))
}

/// Resident and virtual memory of this process, where the platform exposes them.
fn get_memory_info() -> serde_json::Value {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            let field_bytes = |name: &str| {
                status
                    .lines()
                    .find(|line| line.starts_with(name))
                    .and_then(|line| line.split_whitespace().nth(1))
                    .and_then(|kb| kb.parse::<u64>().ok())
                    .map_or(0, |kb| kb * 1024)
            };

            return json!({
                "resident_memory_bytes": field_bytes("VmRSS:"),
                "virtual_memory_bytes": field_bytes("VmSize:"),
                "available": true
            });
        }
    }

    json!({
        "resident_memory_bytes": 0,
        "virtual_memory_bytes": 0,
        "available": false
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::{state_with, FakeSetup};
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_health_reports_service_counts() {
        let (state, _dir) = state_with(FakeSetup::default());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/health", web::get().to(health_check)),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "healthy");
        assert_eq!(body["realtime"]["connections"], 0);
        assert_eq!(body["cache"]["capacity"], 1000);
        assert_eq!(body["providers"]["configured"], false);
    }
}
