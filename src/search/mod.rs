//! The streaming search core: constants, the peer/publisher seams, the
//! per-widget manager, and the manager registry.
//!
//! Matching here is strictly boolean, not ranked - the `fzf`/`fzfcase`
//! leaf matcher is a small hand-rolled subsequence scorer, not a ranked
//! fuzzy index.

pub mod constants;
pub mod manager;
pub mod peer;
pub mod registry;
pub mod rpc;

pub use manager::{ManagerDiagnostics, SearchManager, Stats};
pub use peer::{MemoryPeer, Peer};
pub use registry::ManagerRegistry;
pub use rpc::{
    ChannelPublisher, ErrorSpan, GetMarkedRequest, GetMarkedResponse, Page, SearchRequest,
    SearchResponse, StreamPublisher, StreamUpdate, UpdateMarksRequest,
};
