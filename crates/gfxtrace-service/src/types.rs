//! Values the service hands back for paths.

use rpclib_core::binary::{Decoder, Encoder, Field};
use rpclib_core::{binary_object, BinaryId, Result};

use crate::path::{AtomsPath, BlobPath};

binary_object! {
    /// A loaded trace.
    pub struct Capture("service.Capture") {
        pub name: String,
        pub atoms: AtomsPath,
        /// Ids of the graphics APIs used in the capture.
        pub apis: Vec<BinaryId>,
    }
}

binary_object! {
    /// A replay target.
    pub struct Device("service.Device") {
        pub name: String,
        pub model: String,
        pub os: String,
        pub pointer_size: u8,
        pub pointer_alignment: u8,
        pub max_memory_size: u64,
        pub requires_shader_patching: bool,
    }
}

binary_object! {
    /// Format and dimensions of a rendered image; the pixels live at `data`.
    pub struct ImageInfo("service.ImageInfo") {
        pub format: String,
        pub width: u32,
        pub height: u32,
        pub data: BlobPath,
    }
}

binary_object! {
    pub struct AtomTimer("service.AtomTimer") {
        pub atom_id: u64,
        pub nanoseconds: u64,
    }
}

binary_object! {
    pub struct AtomRangeTimer("service.AtomRangeTimer") {
        pub from_atom_id: u64,
        pub to_atom_id: u64,
        pub nanoseconds: u64,
    }
}

binary_object! {
    /// Replay timings at the granularities requested with [`TimingFlags`].
    pub struct TimingInfo("service.TimingInfo") {
        pub per_command: Vec<AtomTimer>,
        pub per_draw_call: Vec<AtomRangeTimer>,
        pub per_frame: Vec<AtomRangeTimer>,
    }
}

binary_object! {
    pub struct RenderSettings("service.RenderSettings") {
        pub max_width: u32,
        pub max_height: u32,
        pub wireframe: bool,
    }
}

impl Device {
    /// Human readable one-line summary.
    pub fn describe(&self) -> String {
        format!("{} ({}, {})", self.name, self.model, self.os)
    }
}

impl TimingInfo {
    pub fn is_empty(&self) -> bool {
        self.per_command.is_empty() && self.per_draw_call.is_empty() && self.per_frame.is_empty()
    }
}

/// Which timings `get_timing_info` should collect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TimingFlags(u32);

impl TimingFlags {
    pub const CPU: TimingFlags = TimingFlags(1 << 0);
    pub const GPU: TimingFlags = TimingFlags(1 << 1);
    pub const PER_COMMAND: TimingFlags = TimingFlags(1 << 2);
    pub const PER_DRAW_CALL: TimingFlags = TimingFlags(1 << 3);
    pub const PER_FRAME: TimingFlags = TimingFlags(1 << 4);

    pub const fn empty() -> Self {
        TimingFlags(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        TimingFlags(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: TimingFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for TimingFlags {
    type Output = TimingFlags;

    fn bitor(self, rhs: TimingFlags) -> TimingFlags {
        TimingFlags(self.0 | rhs.0)
    }
}

impl Field for TimingFlags {
    fn signature() -> String {
        "u32".to_string()
    }

    fn encode_field(&self, e: &mut Encoder<'_>) -> Result<()> {
        e.u32(self.0);
        Ok(())
    }

    fn decode_field(d: &mut Decoder<'_>) -> Result<Self> {
        Ok(TimingFlags(d.u32()?))
    }
}
