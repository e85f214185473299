//! Segment acquisition engine
//!
//! The pipeline pulls segment descriptors through a shared queue into
//! a pool of download workers, then the joiner assembles the staged
//! files into the final artifact in sequence order.

mod decrypt;
mod join;
mod pipeline;
mod segment_worker;

pub(crate) use join::join_segments;
pub(crate) use pipeline::fetch_all;
