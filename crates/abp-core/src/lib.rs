//! Filter-list matching engine core.
//!
//! # Architecture
//!
//! Rules are parsed into [`filter::Filter`] records and routed by
//! [`index::FilterIndex`] into the bucket layout described in the match
//! pipeline's design notes: a block/exception-side bloom pre-filter, a
//! host-anchored hash index, and a handful of linear-scan buckets for rules
//! that can't be reduced to either. [`matcher::Matcher`] walks that layout
//! per request. [`snapshot`] serializes/deserializes an index to a
//! section-directory binary format so it can be built offline and loaded
//! without re-parsing.
//!
//! # Modules
//!
//! - `hash`: Murmur3-based domain/token hashing and CRC-32 for snapshots
//! - `psl`: single-level parent-domain extraction
//! - `url`: allocation-free scheme/host extraction
//! - `bloom`: the block/exception/request bloom filters
//! - `hashindex`: the open-addressed hash table codecs used by `snapshot`
//! - `fingerprint`: 6-byte pattern fingerprint extraction
//! - `filter`: the parsed rule record and its match predicate
//! - `parser`: filter-list line parsing
//! - `suffixes`: host -> parent-domain-chain walking
//! - `cosmetic`: element-hiding selector indexes
//! - `tags`: the `$tag=` enable/disable registry
//! - `bad_fingerprint`: false-positive fingerprint diagnostics
//! - `index`: the central `FilterIndex`
//! - `matcher`: the per-request match pipeline
//! - `snapshot`: binary (de)serialization
//! - `error`: crate-wide error types
//! - `types`: shared type definitions

pub mod bad_fingerprint;
pub mod bloom;
pub mod cosmetic;
pub mod error;
pub mod filter;
pub mod fingerprint;
pub mod hash;
pub mod hashindex;
pub mod index;
pub mod matcher;
pub mod parser;
pub mod psl;
pub mod snapshot;
pub mod suffixes;
pub mod tags;
pub mod types;
pub mod url;

pub use error::{ParseError, SnapshotError};
pub use filter::Filter;
pub use hash::{hash64, hash_domain, hash_token, Hash64};
pub use index::FilterIndex;
pub use matcher::{is_third_party, Matcher};
pub use types::{FilterOption, FilterType, MatchDecision, RequestContext};
