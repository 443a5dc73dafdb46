//! Boot counter in RTC retention memory.
//!
//! Deep sleep powers down main RAM but keeps the small RTC slow-memory
//! region alive, so a value placed there survives sleep/wake cycles — and is
//! zeroed again on full power loss. Exactly one value lives there: the boot
//! counter, incremented once per boot and used only for diagnostics (the
//! wake-cause decode gates on the hardware-reported wake reason, never on
//! this counter).
//!
//! On the host the counter is a plain process-lifetime atomic, which models
//! the same reset-on-power-loss semantics for tests.

#[cfg(target_os = "espidf")]
#[unsafe(link_section = ".rtc.data")]
static mut BOOT_COUNT: u32 = 0;

#[cfg(not(target_os = "espidf"))]
static BOOT_COUNT: core::sync::atomic::AtomicU32 = core::sync::atomic::AtomicU32::new(0);

/// Increment the boot counter and return the post-increment value.
/// Call exactly once per boot, before the poll loop starts.
#[cfg(target_os = "espidf")]
pub fn increment_boot_count() -> u32 {
    // SAFETY: called once from the single main task before any other
    // activity; nothing else references the RTC counter.
    unsafe {
        let counter = core::ptr::addr_of_mut!(BOOT_COUNT);
        let next = counter.read_volatile().wrapping_add(1);
        counter.write_volatile(next);
        next
    }
}

/// Increment the boot counter and return the post-increment value.
#[cfg(not(target_os = "espidf"))]
pub fn increment_boot_count() -> u32 {
    BOOT_COUNT.fetch_add(1, core::sync::atomic::Ordering::SeqCst) + 1
}

/// The boot counter as of the last increment (0 = fresh power-on).
#[cfg(target_os = "espidf")]
pub fn boot_count() -> u32 {
    // SAFETY: read-only access from the single main task.
    unsafe { core::ptr::addr_of!(BOOT_COUNT).read_volatile() }
}

/// The boot counter as of the last increment (0 = fresh power-on).
#[cfg(not(target_os = "espidf"))]
pub fn boot_count() -> u32 {
    BOOT_COUNT.load(core::sync::atomic::Ordering::SeqCst)
}
