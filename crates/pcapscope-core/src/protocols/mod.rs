//! Header decoding for the layers the frame decoder understands.
//!
//! The layering mirrors the rest of the crate:
//! - `layout`: ethertypes, protocol numbers and flag constants
//! - `ethernet`, `ipv4`, `transport`: one parser per layer
//! - `error`: explicit per-layer errors
//!
//! Parsers are pure and never panic on short input; each returns the decoded
//! header plus the bytes it encapsulates, so the caller decides how far to
//! descend.

pub(crate) mod error;
pub(crate) mod ethernet;
pub(crate) mod ipv4;
pub(crate) mod layout;
pub(crate) mod transport;
