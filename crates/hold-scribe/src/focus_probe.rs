//! Focused-element probes for other applications.
//!
//! Platforms without a probe report no focus, which makes every insertion
//! end as `target_mismatch`.

use hold_scribe_core::focus::{FocusProbe, FocusSnapshot};

/// Probe for the element that has keyboard focus system-wide.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFocus;

impl FocusProbe for SystemFocus {
    fn current(&self) -> Option<FocusSnapshot> {
        platform::focused()
    }
}

#[cfg(target_os = "macos")]
mod platform {
    use std::ffi::c_void;

    use core_foundation::{
        base::TCFType,
        string::{CFString, CFStringRef},
    };
    use hold_scribe_core::focus::{CursorRange, ExternalTargetId, FocusSnapshot, TargetIdentity};

    type CFTypeRef = *const c_void;
    type AXError = i32;

    const AX_SUCCESS: AXError = 0;
    const AX_VALUE_CF_RANGE: u32 = 4;

    #[repr(C)]
    struct CFRange {
        location: isize,
        length: isize,
    }

    #[link(name = "ApplicationServices", kind = "framework")]
    unsafe extern "C" {
        fn AXUIElementCreateSystemWide() -> CFTypeRef;
        fn AXUIElementCopyAttributeValue(
            element: CFTypeRef,
            attribute: CFStringRef,
            value: *mut CFTypeRef,
        ) -> AXError;
        fn AXUIElementGetPid(element: CFTypeRef, pid: *mut i32) -> AXError;
        fn AXValueGetValue(value: CFTypeRef, value_type: u32, out: *mut c_void) -> bool;
    }

    #[link(name = "CoreFoundation", kind = "framework")]
    unsafe extern "C" {
        fn CFHash(cf: CFTypeRef) -> usize;
        fn CFRelease(cf: CFTypeRef);
    }

    /// Copy `attribute` of `element`; the caller releases the result.
    fn copy_attribute(element: CFTypeRef, attribute: &'static str) -> Option<CFTypeRef> {
        let name = CFString::from_static_string(attribute);
        let mut value: CFTypeRef = std::ptr::null();
        // SAFETY: `element` is a live AX element and `value` is a valid out pointer.
        let err = unsafe { AXUIElementCopyAttributeValue(element, name.as_concrete_TypeRef(), &mut value) };
        (err == AX_SUCCESS && !value.is_null()).then_some(value)
    }

    fn selected_range(element: CFTypeRef) -> Option<CursorRange> {
        let value = copy_attribute(element, "AXSelectedTextRange")?;
        let mut range = CFRange {
            location: 0,
            length: 0,
        };
        // SAFETY: `value` is an AXValue we own; `range` matches kAXValueCFRangeType.
        let ok = unsafe {
            let ok = AXValueGetValue(value, AX_VALUE_CF_RANGE, (&mut range as *mut CFRange).cast());
            CFRelease(value);
            ok
        };
        if !ok || range.location < 0 {
            return None;
        }
        let start = range.location as usize;
        Some(CursorRange {
            start,
            end: start + range.length.max(0) as usize,
        })
    }

    pub(super) fn focused() -> Option<FocusSnapshot> {
        // SAFETY: the system-wide element is created and released here.
        let system = unsafe { AXUIElementCreateSystemWide() };
        if system.is_null() {
            return None;
        }
        let element = copy_attribute(system, "AXFocusedUIElement");
        // SAFETY: `system` came from a Create call.
        unsafe { CFRelease(system) };
        let element = element?;

        let mut pid = 0;
        // SAFETY: `element` is a live AX element owned by us until released below.
        let (pid_ok, hash) = unsafe {
            (
                AXUIElementGetPid(element, &mut pid) == AX_SUCCESS,
                CFHash(element),
            )
        };
        let cursor = selected_range(element);
        // SAFETY: `element` came from a Copy call.
        unsafe { CFRelease(element) };

        if !pid_ok {
            return None;
        }
        Some(FocusSnapshot::new(
            TargetIdentity::External(ExternalTargetId {
                process_id: pid as u32,
                element: hash as u64,
            }),
            cursor,
        ))
    }
}

#[cfg(target_os = "windows")]
mod platform {
    use hold_scribe_core::focus::{ExternalTargetId, FocusSnapshot, TargetIdentity};
    use windows_sys::Win32::UI::WindowsAndMessaging::{
        GUITHREADINFO, GetForegroundWindow, GetGUIThreadInfo, GetWindowThreadProcessId,
    };

    pub(super) fn focused() -> Option<FocusSnapshot> {
        // SAFETY: read-only Win32 queries; `info` is sized before the call.
        unsafe {
            let foreground = GetForegroundWindow();
            if foreground == 0 {
                return None;
            }

            let mut process_id = 0u32;
            let thread_id = GetWindowThreadProcessId(foreground, &mut process_id);
            if thread_id == 0 {
                return None;
            }

            let mut info: GUITHREADINFO = std::mem::zeroed();
            info.cbSize = std::mem::size_of::<GUITHREADINFO>() as u32;
            if GetGUIThreadInfo(thread_id, &mut info) == 0 {
                return None;
            }

            let focus = if info.hwndFocus != 0 {
                info.hwndFocus
            } else {
                foreground
            };
            Some(FocusSnapshot::new(
                TargetIdentity::External(ExternalTargetId {
                    process_id,
                    element: focus as u64,
                }),
                None,
            ))
        }
    }
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
mod platform {
    use hold_scribe_core::focus::FocusSnapshot;

    pub(super) fn focused() -> Option<FocusSnapshot> {
        None
    }
}
