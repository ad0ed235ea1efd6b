//! Memory protection for derivation secrets
//!
//! Two hardening measures for the short-lived buffers a derivation produces
//! (master key, key material):
//!
//! 1. **Core dump prevention**: `setrlimit(RLIMIT_CORE, 0)` so a crash in the
//!    middle of a derivation never writes key material to disk.
//!
//! 2. **Memory locking**: `mlock()` keeps a buffer out of swap for as long
//!    as it lives; [`LockedBuffer`] zeroizes it before unlocking.
//!
//! Both are best-effort. Containers and unprivileged users often cannot lock
//! pages, so failures are logged at `warn` and the derivation carries on.
//!
//! # Platform Support
//!
//! - Unix/macOS/Linux: full support via libc
//! - Other: no-ops that report `false`

use std::sync::atomic::{AtomicBool, Ordering};
use zeroize::Zeroize;

static CORE_DUMPS_DISABLED: AtomicBool = AtomicBool::new(false);

/// Disable core dumps for the current process.
///
/// Call once, early, from the binary. Returns `true` if core dumps are off
/// (including when a previous call already turned them off).
///
/// # Example
/// ```
/// passmill_core::memory::disable_core_dumps();
/// ```
pub fn disable_core_dumps() -> bool {
    disable_once(&CORE_DUMPS_DISABLED, platform_disable_core_dumps)
}

/// Run `attempt` unless `flag` is already set; the flag is only set once an
/// attempt succeeds, so a failed call can be retried.
fn disable_once(flag: &AtomicBool, attempt: impl FnOnce() -> bool) -> bool {
    if flag.load(Ordering::SeqCst) {
        return true;
    }
    let disabled = attempt();
    if disabled {
        flag.store(true, Ordering::SeqCst);
    }
    disabled
}

fn platform_disable_core_dumps() -> bool {
    #[cfg(unix)]
    {
        unix::disable_core_dumps_impl()
    }

    #[cfg(not(unix))]
    {
        log::warn!("Core dump prevention is not supported on this platform");
        false
    }
}

/// Lock a memory region so the OS cannot swap it out.
///
/// Returns `true` if the region was locked.
///
/// # Safety
///
/// `ptr` must point to a live allocation of at least `len` bytes, and the
/// region must be unlocked (see [`munlock`]) before that allocation is freed
/// or the process must exit.
pub unsafe fn mlock(ptr: *const u8, len: usize) -> bool {
    if len == 0 {
        return true;
    }

    #[cfg(unix)]
    {
        unix::mlock_impl(ptr, len)
    }

    #[cfg(not(unix))]
    {
        let _ = (ptr, len);
        false
    }
}

/// Unlock a region previously passed to [`mlock`].
///
/// # Safety
///
/// `ptr` and `len` must match a previous `mlock` call on a live allocation.
pub unsafe fn munlock(ptr: *const u8, len: usize) -> bool {
    if len == 0 {
        return true;
    }

    #[cfg(unix)]
    {
        unix::munlock_impl(ptr, len)
    }

    #[cfg(not(unix))]
    {
        let _ = (ptr, len);
        true
    }
}

/// Fixed-size heap buffer that is mlock'd on creation and zeroized, then
/// unlocked, on drop.
///
/// The KDF writes its raw output straight into one of these.
///
/// ```
/// use passmill_core::memory::LockedBuffer;
/// let mut buf = LockedBuffer::new(64);
/// buf.as_mut_slice()[..4].copy_from_slice(b"seed");
/// assert_eq!(buf.len(), 64);
/// ```
pub struct LockedBuffer {
    data: Vec<u8>,
    locked: bool,
}

impl LockedBuffer {
    /// Allocate `len` zero bytes and try to lock them.
    pub fn new(len: usize) -> Self {
        let data = vec![0u8; len];
        let locked = if data.is_empty() {
            true
        } else {
            // SAFETY: `data` is a live allocation of exactly `data.len()` bytes and
            // is unlocked in `Drop` before it is freed.
            unsafe { mlock(data.as_ptr(), data.len()) }
        };

        if !locked {
            log::warn!("Failed to mlock {} bytes, key material may be swappable", len);
        }

        Self { data, locked }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether `mlock` actually succeeded.
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl Drop for LockedBuffer {
    fn drop(&mut self) {
        // Zeroize before unlocking; `Vec::zeroize` keeps the allocation alive.
        self.data.as_mut_slice().zeroize();

        if self.locked && !self.data.is_empty() {
            // SAFETY: same pointer and length that were locked in `new`.
            unsafe {
                munlock(self.data.as_ptr(), self.data.len());
            }
        }
    }
}

#[cfg(unix)]
mod unix {
    pub fn disable_core_dumps_impl() -> bool {
        let rlim = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        // SAFETY: setrlimit reads a valid, fully initialised rlimit struct.
        let result = unsafe { libc::setrlimit(libc::RLIMIT_CORE, &rlim) };
        if result != 0 {
            log::warn!(
                "Failed to disable core dumps: {}",
                std::io::Error::last_os_error()
            );
            return false;
        }
        true
    }

    pub unsafe fn mlock_impl(ptr: *const u8, len: usize) -> bool {
        let result = libc::mlock(ptr as *const libc::c_void, len);
        if result != 0 {
            log::debug!(
                "mlock failed for {} bytes: {}",
                len,
                std::io::Error::last_os_error()
            );
            return false;
        }
        true
    }

    pub unsafe fn munlock_impl(ptr: *const u8, len: usize) -> bool {
        libc::munlock(ptr as *const libc::c_void, len) == 0
    }
}
