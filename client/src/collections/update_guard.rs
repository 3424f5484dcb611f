use std::sync::atomic::{AtomicBool, Ordering};

/// Marks an owner as "in update" for as long as the guard lives.
///
/// Entering fails while another guard on the same flag is alive, which is
/// how change notifications caused by a propagation are recognised and
/// dropped instead of being processed recursively.
pub(crate) struct UpdateGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> UpdateGuard<'a> {
    pub(crate) fn enter(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
