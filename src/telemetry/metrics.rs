use once_cell::sync::Lazy;
use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
};

pub static METER: Lazy<Meter> = Lazy::new(|| global::meter("classifieds-api"));

pub static HTTP_REQUESTS_TOTAL: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("http.server.requests")
        .with_description("Total HTTP requests served")
        .build()
});

pub static HTTP_REQUEST_DURATION: Lazy<Histogram<f64>> = Lazy::new(|| {
    METER
        .f64_histogram("http.server.duration")
        .with_description("HTTP request latency")
        .with_unit("ms")
        .build()
});

pub static ADVERTISEMENTS_CREATED: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("advertisements.created")
        .with_description("Total advertisements created")
        .build()
});

pub static ADVERTISEMENTS_UPDATED: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("advertisements.updated")
        .with_description("Total advertisements updated")
        .build()
});

pub static ADVERTISEMENTS_DELETED: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("advertisements.deleted")
        .with_description("Total advertisements deleted")
        .build()
});

pub static FAVORITES_ADDED: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("favorites.added")
        .with_description("Total favorites added")
        .build()
});

pub static FAVORITES_REMOVED: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("favorites.removed")
        .with_description("Total favorites removed")
        .build()
});

pub static USERS_REGISTERED: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("users.registered")
        .with_description("Total users registered")
        .build()
});

pub static REQUESTS_THROTTLED: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("requests.throttled")
        .with_description("Requests rejected for exceeding their budget")
        .build()
});
