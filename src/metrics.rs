use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("api_requests_total", "Total number of requests").unwrap();
    pub static ref REQUESTS_ADMITTED: Counter =
        register_counter!("api_requests_admitted_total", "Requests let through by the rate limiter").unwrap();
    pub static ref REQUESTS_REJECTED: Counter =
        register_counter!("api_requests_rejected_total", "Requests rejected with 429").unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "api_request_latency_seconds",
        "Request latency in seconds"
    )
    .unwrap();
    pub static ref TRACKED_CLIENTS: Gauge =
        register_gauge!("api_tracked_clients", "Clients currently held by the rate limiter").unwrap();
    pub static ref EVICTED_CLIENTS: Counter =
        register_counter!("api_evicted_clients_total", "Idle clients removed by the sweeper").unwrap();
}
