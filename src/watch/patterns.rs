// src/watch/patterns.rs

use regex::Regex;
use tracing::warn;

use crate::engine::ChangeBatch;

/// Compiled trigger patterns deciding whether a change batch restarts the
/// supervised process.
///
/// Patterns are compiled once at startup and immutable afterwards. A pattern
/// that fails to compile is dropped with a warning rather than aborting
/// startup, so one bad flag doesn't take the whole watch session down.
#[derive(Debug, Default)]
pub struct TriggerSet {
    triggers: Vec<Regex>,
}

impl TriggerSet {
    /// Compile the caller-supplied pattern strings, keeping insertion order.
    pub fn compile(patterns: &[String]) -> Self {
        let mut triggers = Vec::with_capacity(patterns.len());

        for pattern in patterns {
            match Regex::new(pattern) {
                Ok(re) => triggers.push(re),
                Err(err) => {
                    warn!(
                        pattern = %pattern,
                        error = %err,
                        "invalid trigger pattern; ignoring"
                    );
                }
            }
        }

        Self { triggers }
    }

    /// Number of successfully compiled patterns.
    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Decide whether the batch should provoke a restart.
    ///
    /// With no compiled patterns every batch triggers (watch-everything
    /// default). Otherwise this is a logical OR: the first changed path that
    /// matches any pattern short-circuits to true. Pure function of the batch
    /// and the trigger set.
    pub fn should_trigger(&self, batch: &ChangeBatch) -> bool {
        if self.triggers.is_empty() {
            return true;
        }

        batch.paths().any(|path| {
            let candidate = path.to_string_lossy();
            self.triggers.iter().any(|re| re.is_match(&candidate))
        })
    }
}
