//! Per-thread allocation metering.
//!
//! [`MeteredAllocator`] wraps the system allocator and, on threads where the
//! ledger is armed, tracks live and peak heap bytes against a ceiling. Only
//! sandbox workers arm the ledger; every other thread pays one thread-local
//! read per allocation.
//!
//! Crossing the ceiling never makes an allocation fail (that would abort the
//! process). It trips the ledger instead, and the evaluator stops at its next
//! step with a memory-limit error. Builtins that know a result will be large
//! call [`ensure_headroom`] before allocating it.

use crate::runtime::error::{EvalError, EvalResult};
use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

pub struct MeteredAllocator;

struct Ledger {
    armed: Cell<bool>,
    limit: Cell<usize>,
    current: Cell<usize>,
    peak: Cell<usize>,
    tripped: Cell<bool>,
}

impl Ledger {
    const fn new() -> Self {
        Ledger {
            armed: Cell::new(false),
            limit: Cell::new(usize::MAX),
            current: Cell::new(0),
            peak: Cell::new(0),
            tripped: Cell::new(false),
        }
    }

    fn grow(&self, bytes: usize) {
        if !self.armed.get() {
            return;
        }
        let current = self.current.get().saturating_add(bytes);
        self.current.set(current);
        if current > self.peak.get() {
            self.peak.set(current);
        }
        if current > self.limit.get() {
            self.tripped.set(true);
        }
    }

    fn shrink(&self, bytes: usize) {
        if self.armed.get() {
            self.current.set(self.current.get().saturating_sub(bytes));
        }
    }
}

thread_local! {
    // Const-initialised and free of destructors, so touching it from inside
    // the allocator never allocates.
    static LEDGER: Ledger = const { Ledger::new() };
}

fn with_ledger(f: impl FnOnce(&Ledger)) {
    let _ = LEDGER.try_with(f);
}

unsafe impl GlobalAlloc for MeteredAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc(layout);
        if !ptr.is_null() {
            with_ledger(|l| l.grow(layout.size()));
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc_zeroed(layout);
        if !ptr.is_null() {
            with_ledger(|l| l.grow(layout.size()));
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout);
        with_ledger(|l| l.shrink(layout.size()));
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = System.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            let old_size = layout.size();
            with_ledger(|l| {
                if new_size >= old_size {
                    l.grow(new_size - old_size)
                } else {
                    l.shrink(old_size - new_size)
                }
            });
        }
        new_ptr
    }
}

/// What the ledger saw while it was armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerReport {
    pub peak_bytes: usize,
    pub tripped: bool,
}

/// Whether allocations are actually routed through [`MeteredAllocator`].
pub fn is_metering() -> bool {
    cfg!(feature = "metered-allocator")
}

/// Starts metering the current thread against `limit` bytes.
pub fn arm(limit: usize) {
    with_ledger(|l| {
        l.current.set(0);
        l.peak.set(0);
        l.tripped.set(false);
        l.limit.set(limit);
        l.armed.set(true);
    });
}

/// Stops metering the current thread and reports what was seen.
pub fn disarm() -> LedgerReport {
    let mut report = LedgerReport {
        peak_bytes: 0,
        tripped: false,
    };
    with_ledger(|l| {
        l.armed.set(false);
        report = LedgerReport {
            peak_bytes: l.peak.get(),
            tripped: l.tripped.get(),
        };
    });
    report
}

pub fn tripped() -> bool {
    let mut tripped = false;
    with_ledger(|l| tripped = l.armed.get() && l.tripped.get());
    tripped
}

/// Fails with a memory-limit error, and trips the ledger, when `bytes` more
/// would not fit under the ceiling. A no-op on threads that are not armed.
pub fn ensure_headroom(bytes: usize) -> EvalResult<()> {
    let mut fits = true;
    with_ledger(|l| {
        if l.armed.get() && l.current.get().saturating_add(bytes) > l.limit.get() {
            l.tripped.set(true);
            fits = false;
        }
    });
    if fits {
        Ok(())
    } else {
        Err(EvalError::MemoryLimit)
    }
}
