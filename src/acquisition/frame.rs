//! Sensor Frame Assembler
//!
//! The gas-sensor board streams single bytes over the serial link. A frame
//! is every byte up to a `$` terminator:
//!
//! ```text
//! <payload bytes ...>$<payload bytes ...>$
//! ```
//!
//! `0x00` and `0x86` appear between frames as line noise and are dropped.
//! All other bytes are decoded one-to-one into characters (bytes >= 0x80
//! map to the corresponding Latin-1 code point).

/// Byte that ends a frame.
pub const FRAME_TERMINATOR: u8 = b'$';

/// Bytes discarded as protocol noise.
pub const NOISE_BYTES: [u8; 2] = [0x00, 0x86];

/// Result of feeding one byte to the assembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameStep {
    /// Byte appended to the in-progress frame
    Pending,
    /// Noise byte dropped
    Noise,
    /// Terminator received; carries the completed payload
    Complete(String),
}

/// Reassembles delimited frames from a byte stream.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buffer: String,
    frames_completed: u64,
    noise_dropped: u64,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self {
            buffer: String::with_capacity(256),
            ..Self::default()
        }
    }

    /// Feed one byte.
    pub fn push(&mut self, byte: u8) -> FrameStep {
        if byte == FRAME_TERMINATOR {
            self.frames_completed += 1;
            return FrameStep::Complete(std::mem::take(&mut self.buffer));
        }
        if NOISE_BYTES.contains(&byte) {
            self.noise_dropped += 1;
            return FrameStep::Noise;
        }
        self.buffer.push(char::from(byte));
        FrameStep::Pending
    }

    /// Characters received since the last terminator.
    pub fn partial(&self) -> &str {
        &self.buffer
    }

    pub fn frames_completed(&self) -> u64 {
        self.frames_completed
    }

    pub fn noise_dropped(&self) -> u64 {
        self.noise_dropped
    }
}
