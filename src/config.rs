//! Sink-wide defaults a driver loads once at startup, not state the sink
//! itself persists.

use serde_derive::{Deserialize, Serialize};

use sink_proto::time::Microseconds;

/// Tunables a driver supplies when constructing a [`crate::Sink`].
///
/// These are not part of the sink's runtime state (nothing here changes once
/// the sink is built); they're knobs a driver would otherwise hardcode,
/// pulled out so they can be loaded from a `sinkd.toml` alongside the rest of
/// a driver's own configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SinkDefaults {
    /// Lower bound accepted when negotiating requested latency.
    pub min_latency_usec: u64,
    /// Upper bound accepted when negotiating requested latency.
    pub max_latency_usec: u64,
    /// Length, in bytes, used for a render call when the driver doesn't
    /// specify one explicitly.
    pub default_render_bytes: usize,
    /// Maximum rewindable bytes, absent any driver override.
    pub default_max_rewind_bytes: usize,
    /// Hard cap on the number of inputs mixed into a single render call.
    pub max_mixed_inputs: usize,
}

impl SinkDefaults {
    pub fn min_latency(&self) -> Microseconds {
        Microseconds(self.min_latency_usec)
    }

    pub fn max_latency(&self) -> Microseconds {
        Microseconds(self.max_latency_usec)
    }

    /// Parses defaults out of a TOML document, e.g. the `[sink]` table of a
    /// driver's own config file.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}

impl Default for SinkDefaults {
    fn default() -> Self {
        SinkDefaults {
            min_latency_usec: 1_000,
            max_latency_usec: 2_000_000,
            default_render_bytes: 4096,
            default_max_rewind_bytes: 0,
            max_mixed_inputs: 32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let d = SinkDefaults::default();
        assert!(d.min_latency_usec < d.max_latency_usec);
        assert_eq!(d.max_mixed_inputs, 32);
    }

    #[test]
    fn parses_partial_toml_over_defaults() {
        let d = SinkDefaults::from_toml_str("max_mixed_inputs = 8\n").unwrap();
        assert_eq!(d.max_mixed_inputs, 8);
        assert_eq!(d.min_latency_usec, SinkDefaults::default().min_latency_usec);
    }
}
