use shared::metrics_defs::{EventDef, MetricDef, MetricType};

// Event and metric names are unprefixed; the exporter installed by the
// binary contributes the `crm_gateway` namespace.

pub const TOKEN_EXCHANGE_SUCCESS: EventDef = EventDef {
    name: "token_exchange.success",
    weight: 10,
    description: "Token exchange returned HTTP 200",
};

pub const TOKEN_EXCHANGE_ERROR: EventDef = EventDef {
    name: "token_exchange.error",
    weight: 30,
    description: "Token exchange failed or returned a non-200 status",
};

pub const INITIALIZATION_SKIPPED: EventDef = EventDef {
    name: "initialization.skipped",
    weight: 10,
    description: "Initialization skipped: authoring context or no_init flag",
};

pub const INITIALIZATION_NO_TOKEN: EventDef = EventDef {
    name: "initialization.no_token_generated",
    weight: 10,
    description: "Initialization aborted because no token was generated. Tagged with backend.",
};

pub const INITIALIZATION_SUCCESS: EventDef = EventDef {
    name: "initialization.success",
    weight: 10,
    description: "Backend adapter constructed and ready to dispatch. Tagged with backend.",
};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Handler request duration in seconds. Tagged with handler, status.",
};

pub const ALL_EVENTS: &[EventDef] = &[
    TOKEN_EXCHANGE_SUCCESS,
    TOKEN_EXCHANGE_ERROR,
    INITIALIZATION_SKIPPED,
    INITIALIZATION_NO_TOKEN,
    INITIALIZATION_SUCCESS,
];

pub const ALL_METRICS: &[MetricDef] = &[REQUEST_DURATION];
