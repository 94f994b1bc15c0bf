//! Global library settings.
//!
//! [`Settings`] holds the process-wide resource ceilings: the largest lattice
//! a tree constructor may allocate and the default iteration cap of the
//! bisection solver. It is a singleton accessed via a `std::sync::OnceLock`.
//!
//! The node ceiling is seeded from the `QLATTICE_MAX_NODES` environment
//! variable on first access; an unset or unparseable value falls back to
//! [`DEFAULT_MAX_LATTICE_NODES`]. Trees and pricers can override the ceiling
//! per call, which is what tests should do instead of mutating the global.

use std::sync::{Mutex, OnceLock};

/// Environment variable consulted for the initial node ceiling.
pub const MAX_NODES_ENV_VAR: &str = "QLATTICE_MAX_NODES";

/// Node ceiling used when the environment does not provide one.
pub const DEFAULT_MAX_LATTICE_NODES: usize = 10_000_000;

/// Iteration cap used by the bisection solver unless overridden.
pub const DEFAULT_MAX_BISECTION_ITERATIONS: u32 = 100;

#[derive(Debug, Clone, Copy)]
struct Limits {
    max_lattice_nodes: usize,
    max_bisection_iterations: u32,
}

/// Process-wide settings used by the qlattice library.
pub struct Settings {
    limits: Mutex<Limits>,
}

static INSTANCE: OnceLock<Settings> = OnceLock::new();

impl Settings {
    /// Return a reference to the global singleton.
    pub fn instance() -> &'static Settings {
        INSTANCE.get_or_init(|| Settings {
            limits: Mutex::new(Limits {
                max_lattice_nodes: max_nodes_from_env(),
                max_bisection_iterations: DEFAULT_MAX_BISECTION_ITERATIONS,
            }),
        })
    }

    /// Largest number of nodes a lattice may allocate.
    pub fn max_lattice_nodes(&self) -> usize {
        self.limits
            .lock()
            .expect("Settings mutex poisoned")
            .max_lattice_nodes
    }

    /// Replace the lattice node ceiling.
    pub fn set_max_lattice_nodes(&self, limit: usize) {
        self.limits
            .lock()
            .expect("Settings mutex poisoned")
            .max_lattice_nodes = limit;
    }

    /// Default iteration cap for bisection searches.
    pub fn max_bisection_iterations(&self) -> u32 {
        self.limits
            .lock()
            .expect("Settings mutex poisoned")
            .max_bisection_iterations
    }

    /// Replace the default bisection iteration cap.
    pub fn set_max_bisection_iterations(&self, iterations: u32) {
        self.limits
            .lock()
            .expect("Settings mutex poisoned")
            .max_bisection_iterations = iterations;
    }

    /// Restore both limits to their built-in defaults.
    pub fn reset(&self) {
        let mut limits = self.limits.lock().expect("Settings mutex poisoned");
        limits.max_lattice_nodes = DEFAULT_MAX_LATTICE_NODES;
        limits.max_bisection_iterations = DEFAULT_MAX_BISECTION_ITERATIONS;
    }
}

fn max_nodes_from_env() -> usize {
    match std::env::var(MAX_NODES_ENV_VAR) {
        Ok(raw) => parse_node_limit(&raw).unwrap_or_else(|| {
            tracing::warn!(
                value = %raw,
                "ignoring unparseable {MAX_NODES_ENV_VAR}, using default"
            );
            DEFAULT_MAX_LATTICE_NODES
        }),
        Err(_) => DEFAULT_MAX_LATTICE_NODES,
    }
}

/// Parse a node ceiling, accepting `_` digit separators. Zero is rejected.
fn parse_node_limit(raw: &str) -> Option<usize> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != '_').collect();
    cleaned.parse::<usize>().ok().filter(|n| *n > 0)
}
