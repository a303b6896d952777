/// Per-statement list of caller-owned buffers handed to the engine.
///
/// Encoded text and blob parameters are bound with a static destructor, so
/// the engine borrows the bytes instead of copying them. The tracker owns
/// those bytes at stable heap addresses until the owning statement's next
/// reset or its finalization; nothing survives past that boundary.
#[derive(Debug, Default)]
pub(crate) struct TransientBuffers {
    buffers: Vec<Box<[u8]>>,
}

impl TransientBuffers {
    /// Take ownership of `bytes` and return the address/length pair to hand
    /// to the engine. The address stays valid until [`release_all`].
    ///
    /// [`release_all`]: TransientBuffers::release_all
    pub(crate) fn hold(&mut self, bytes: Vec<u8>) -> (*const u8, usize) {
        let boxed = bytes.into_boxed_slice();
        let ptr = boxed.as_ptr();
        let len = boxed.len();
        self.buffers.push(boxed);
        (ptr, len)
    }

    /// Release every tracked buffer. Callers must have cleared the engine's
    /// bindings first.
    pub(crate) fn release_all(&mut self) {
        self.buffers.clear();
    }

    /// Number of buffers currently handed to the engine.
    #[cfg(test)]
    pub(crate) fn outstanding(&self) -> usize {
        self.buffers.len()
    }
}
