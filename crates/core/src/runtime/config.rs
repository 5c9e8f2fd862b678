use serde::Deserialize;

use super::port::DEFAULT_QUEUE_CAPACITY;

/// Process-level tunables for the runtime core (spec §5 "Queues SHOULD be
/// bounded... the bound is a process-level config"). Grounded on the
/// teacher's `FlowEngineArgs::load`, which reads a named section out of a
/// shared `config::Config` rather than owning its own file format.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    /// Bound applied to every port's internal queue unless a node class
    /// overrides it for one of its own pins.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig { queue_capacity: DEFAULT_QUEUE_CAPACITY }
    }
}

impl RuntimeConfig {
    /// Loads the `runtime` section of a layered [`config::Config`], falling
    /// back to defaults when no config was supplied at all (mirrors the
    /// teacher's `FlowEngineArgs::load(Option<&config::Config>)`).
    pub fn load(cfg: Option<&config::Config>) -> crate::Result<Self> {
        match cfg {
            Some(cfg) => match cfg.get::<Self>("runtime") {
                Ok(parsed) => Ok(parsed),
                Err(config::ConfigError::NotFound(_)) => Ok(Self::default()),
                Err(e) => Err(crate::FlowError::BadArguments(format!("invalid runtime config: {}", e)).into()),
            },
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_port_default() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.queue_capacity, DEFAULT_QUEUE_CAPACITY);
    }

    #[test]
    fn loads_without_a_config_source() {
        let cfg = RuntimeConfig::load(None).unwrap();
        assert_eq!(cfg.queue_capacity, DEFAULT_QUEUE_CAPACITY);
    }
}
