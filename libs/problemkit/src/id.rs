//! Problem identifier generation.

use std::fmt;
use std::io::Read;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::context::Context;

/// Identifier returned by the built-in generators when no randomness could be obtained.
pub const FALLBACK_UUID: &str = "00000000-0000-0000-0000-000000000000";

/// Produces printable unique identifiers for problems.
///
/// Implementations never fail: when generation is impossible they return a
/// fixed fallback value such as [`FALLBACK_UUID`].
pub trait IdGenerator: Send + Sync {
    fn generate_id(&self, ctx: &Context) -> String;
}

impl<F> IdGenerator for F
where
    F: Fn(&Context) -> String + Send + Sync,
{
    fn generate_id(&self, ctx: &Context) -> String {
        self(ctx)
    }
}

/// Random (v4) UUIDs from the operating system's randomness source.
#[derive(Debug, Clone, Copy, Default)]
pub struct V4IdGenerator;

impl IdGenerator for V4IdGenerator {
    fn generate_id(&self, _ctx: &Context) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Random (v4) UUIDs built from bytes read from `reader`.
pub struct ReaderIdGenerator {
    reader: Mutex<Box<dyn Read + Send>>,
}

impl ReaderIdGenerator {
    #[must_use]
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self {
            reader: Mutex::new(Box::new(reader)),
        }
    }
}

impl fmt::Debug for ReaderIdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderIdGenerator").finish_non_exhaustive()
    }
}

impl IdGenerator for ReaderIdGenerator {
    fn generate_id(&self, _ctx: &Context) -> String {
        let mut bytes = [0_u8; 16];
        match self.reader.lock().read_exact(&mut bytes) {
            Ok(()) => uuid::Builder::from_random_bytes(bytes)
                .into_uuid()
                .to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read problem identifier bytes, using fallback");
                FALLBACK_UUID.to_owned()
            }
        }
    }
}
