//! Runtime configuration.
//!
//! There is no config file: the base port comes from the command line,
//! then the `PORT` environment variable, then a default; the worker count
//! from the command line, then the machine's parallelism.

use std::num::NonZeroUsize;
use std::thread;

/// Port used when neither `--port` nor `PORT` is set.
pub const DEFAULT_PORT: u16 = 4000;

/// Resolves the base port for the public listener.
pub fn base_port(flag: Option<u16>) -> u16 {
    flag.or_else(port_from_env).unwrap_or(DEFAULT_PORT)
}

fn port_from_env() -> Option<u16> {
    std::env::var("PORT").ok()?.parse().ok()
}

/// Resolves how many workers to spawn: the `--workers` override, otherwise
/// one per available core minus the primary, never less than one.
pub fn worker_count(flag: Option<usize>) -> usize {
    match flag {
        Some(count) => count.max(1),
        None => thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(2)
            .saturating_sub(1)
            .max(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_wins_over_defaults() {
        assert_eq!(base_port(Some(8080)), 8080);
    }

    #[test]
    fn worker_count_never_drops_below_one() {
        assert_eq!(worker_count(Some(0)), 1);
        assert!(worker_count(None) >= 1);
    }
}
