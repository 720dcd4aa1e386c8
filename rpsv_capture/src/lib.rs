//! Crate regarding the extraction of RPSV/TCP timing metrics
//!
//! Server logs produced during protocol comparison runs are loosely
//! structured: a mix of `METRIC `-tagged JSON lines, three free-text
//! debug formats and plenty of noise, in whatever text encoding the
//! host shell happened to use. This crate recovers a canonical
//! [`event::MetricEvent`] stream from that material, plus the JSON
//! dev-stats snapshots that serve as an alternative metric source.

#![deny(clippy::all)]
#![deny(clippy::cargo)]
#![deny(clippy::perf)]
#![deny(clippy::suspicious)]
#![deny(clippy::complexity)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]

pub mod encoding;
pub mod event;
pub mod extract;
pub mod snapshot;
