use opentelemetry::metrics::Meter;
use opentelemetry::{InstrumentationScope, global};
use std::sync::LazyLock;

static METER: LazyLock<Meter> = LazyLock::new(|| {
    let scope = InstrumentationScope::builder(env!("CARGO_PKG_NAME"))
        .with_version(env!("CARGO_PKG_VERSION"))
        .build();
    global::meter_with_scope(scope)
});

pub(crate) mod cache_lookups {
    use crate::metrics::METER;
    use opentelemetry::KeyValue;
    use opentelemetry::metrics::Counter;
    use std::sync::LazyLock;

    static INSTRUMENT: LazyLock<Counter<u64>> = LazyLock::new(|| {
        METER
            .u64_counter("catalog_cache_lookups")
            .with_description("The number of catalog cache lookups")
            .build()
    });

    pub(crate) fn hit() {
        INSTRUMENT.add(1, &[KeyValue::new("result", "hit")])
    }

    pub(crate) fn miss() {
        INSTRUMENT.add(1, &[KeyValue::new("result", "miss")])
    }
}

pub(crate) mod resolutions {
    use crate::metrics::METER;
    use opentelemetry::KeyValue;
    use opentelemetry::metrics::Counter;
    use std::sync::LazyLock;

    static INSTRUMENT: LazyLock<Counter<u64>> = LazyLock::new(|| {
        METER
            .u64_counter("catalog_resolutions")
            .with_description("The number of catalog resolutions")
            .build()
    });

    pub(crate) fn inc(domain: &str, result: &'static str) {
        INSTRUMENT.add(
            1,
            &[
                KeyValue::new("domain", domain.to_string()),
                KeyValue::new("result", result),
            ],
        )
    }
}
