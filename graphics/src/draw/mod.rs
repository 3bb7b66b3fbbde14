//! Draw operations and the fixed action/pass/bucket model.
//!
//! The scene layer records work as [`DrawOp`]s and files each into a
//! [`BucketKind`] of the current [`Action`]. An action owns one
//! [`PassConfig`] per [`PassKind`]; at execution time every enabled pass
//! draws the buckets it consumes, in insertion order:
//!
//! | Pass | Bucket |
//! |------|--------|
//! | Compute | Compute |
//! | ZPrepass | Opaque |
//! | Opaque | Opaque |
//! | Decal | Decal |
//! | Sky | Sky |
//! | Alpha | Alpha |
//! | Editor | Editor |
//! | Ui | Ui |

mod action;
mod bucket;
mod op;
mod pass;

pub use action::{Action, ActionKind, ActionState, PrimaryTargets};
pub use bucket::BucketKind;
pub use op::{DrawOp, DrawOpHandle};
pub use pass::{BlendMode, DepthTestMode, PassConfig, PassKind};

/// Texture and sampler slots per draw.
pub const MAX_TEXTURE_SLOTS: usize = 8;

/// Constant buffer slots per draw. Slot 0 holds the action's camera constants.
pub const MAX_CONSTANT_BUFFER_SLOTS: usize = 4;
