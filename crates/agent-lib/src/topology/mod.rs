//! Host NUMA topology discovery from a sysfs mount
//!
//! All of the structures here are built once at startup from host data and
//! are read-only for the remainder of the process.

mod cpus;
mod distances;
mod numa;

pub use cpus::CpuTopology;
pub use distances::Distances;
pub use numa::NumaNodes;

use std::path::PathBuf;
use thiserror::Error;

/// Failures while building or querying the static host topology.
///
/// Construction failures are fatal at startup; `UnknownNode` is the only
/// variant surfaced during steady-state lookups.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("unknown NUMA node: {0}")]
    UnknownNode(usize),

    #[error("found {found} distance values, expected {expected}")]
    TokenCountMismatch { found: usize, expected: usize },

    #[error("invalid {what} token {token:?}")]
    InvalidToken { what: &'static str, token: String },

    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Parse a sysfs id-list string ("0-3,8,10-11") into the ids it denotes.
pub(crate) fn parse_id_list(what: &'static str, data: &str) -> Result<Vec<usize>, TopologyError> {
    let mut ids = Vec::new();
    let data = data.trim();
    if data.is_empty() {
        return Ok(ids);
    }
    for part in data.split(',') {
        match part.split_once('-') {
            Some((lo, hi)) => {
                let lo = parse_id(what, lo)?;
                let hi = parse_id(what, hi)?;
                if hi < lo {
                    return Err(TopologyError::InvalidToken {
                        what,
                        token: part.to_string(),
                    });
                }
                ids.extend(lo..=hi);
            }
            None => ids.push(parse_id(what, part)?),
        }
    }
    Ok(ids)
}

fn parse_id(what: &'static str, token: &str) -> Result<usize, TopologyError> {
    token.parse().map_err(|_| TopologyError::InvalidToken {
        what,
        token: token.to_string(),
    })
}

pub(crate) fn read_sysfs_file(path: PathBuf) -> Result<String, TopologyError> {
    std::fs::read_to_string(&path).map_err(|source| TopologyError::Io { path, source })
}
