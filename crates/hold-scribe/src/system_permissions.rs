//! OS authorization probes.
//!
//! Accessibility comes from the AX trust API on macOS and from whether a
//! synthetic-input handle can be opened elsewhere. Microphone consent is
//! read from `AVCaptureDevice` on macOS. Other platforms have no consent
//! API the process can query, so the microphone reports `Authorized` and a
//! missing or blocked device surfaces when the recorder opens it.

use std::{
    panic::Location,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use error_location::ErrorLocation;
use hold_scribe_core::{
    CoreResult, DictationError,
    permissions::{AuthStatus, Capability, PermissionProvider},
};
use tracing::{debug, info};

/// How long to wait for the user to answer the microphone consent dialog.
const MICROPHONE_PROMPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Permission provider backed by the running OS.
#[derive(Default)]
pub struct SystemPermissions {
    accessibility_prompted: AtomicBool,
}

impl SystemPermissions {
    fn accessibility_status(&self) -> AuthStatus {
        if accessibility::is_trusted() {
            AuthStatus::Authorized
        } else if self.accessibility_prompted.load(Ordering::Acquire) {
            AuthStatus::Denied
        } else {
            // The trust API has no "not asked" state; until we have prompted
            // once, treat untrusted as undetermined so the gate prompts.
            AuthStatus::NotDetermined
        }
    }
}

#[async_trait]
impl PermissionProvider for SystemPermissions {
    async fn auth_status(&self, capability: Capability) -> CoreResult<AuthStatus> {
        match capability {
            Capability::Accessibility => Ok(self.accessibility_status()),
            Capability::Microphone => {
                let status = microphone::status();
                debug!(?status, "Microphone authorization queried");
                Ok(status)
            }
        }
    }

    async fn request_access(&self, capability: Capability) -> CoreResult<bool> {
        match capability {
            Capability::Accessibility => {
                self.accessibility_prompted.store(true, Ordering::Release);
                let granted = accessibility::prompt();
                info!(granted, "Accessibility prompt shown");
                Ok(granted)
            }
            Capability::Microphone => {
                let answer = tokio::time::timeout(MICROPHONE_PROMPT_TIMEOUT, microphone::request())
                    .await
                    .map_err(|_| DictationError::PermissionDenied {
                        capability: Capability::Microphone,
                        location: ErrorLocation::from(Location::caller()),
                    })?;
                // A dropped completion handler means the OS never answered.
                let granted = answer.unwrap_or(false);
                info!(granted, "Microphone prompt answered");
                Ok(granted)
            }
        }
    }
}

#[cfg(target_os = "macos")]
mod microphone {
    use std::sync::Mutex;

    use block2::RcBlock;
    use hold_scribe_core::permissions::AuthStatus;
    use objc2::{class, msg_send, runtime::Bool};
    use objc2_foundation::NSString;
    use tokio::sync::oneshot;

    #[link(name = "AVFoundation", kind = "framework")]
    unsafe extern "C" {
        static AVMediaTypeAudio: &'static NSString;
    }

    // AVAuthorizationStatus values.
    const RESTRICTED: isize = 1;
    const DENIED: isize = 2;
    const AUTHORIZED: isize = 3;

    pub(super) fn status() -> AuthStatus {
        // SAFETY: class method taking the framework's audio media-type constant.
        let raw: isize = unsafe {
            msg_send![class!(AVCaptureDevice), authorizationStatusForMediaType: AVMediaTypeAudio]
        };
        match raw {
            AUTHORIZED => AuthStatus::Authorized,
            RESTRICTED | DENIED => AuthStatus::Denied,
            _ => AuthStatus::NotDetermined,
        }
    }

    /// Show the consent dialog. Resolves when the user answers.
    pub(super) fn request() -> oneshot::Receiver<bool> {
        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));
        let handler = RcBlock::new(move |granted: Bool| {
            if let Some(tx) = tx.lock().ok().and_then(|mut slot| slot.take()) {
                let _ = tx.send(granted.as_bool());
            }
        });
        // SAFETY: the block is retained by AVFoundation until it runs.
        unsafe {
            let _: () = msg_send![
                class!(AVCaptureDevice),
                requestAccessForMediaType: AVMediaTypeAudio,
                completionHandler: &*handler
            ];
        }
        rx
    }
}

#[cfg(not(target_os = "macos"))]
mod microphone {
    use hold_scribe_core::permissions::AuthStatus;
    use tokio::sync::oneshot;

    pub(super) fn status() -> AuthStatus {
        AuthStatus::Authorized
    }

    pub(super) fn request() -> oneshot::Receiver<bool> {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(true);
        rx
    }
}

#[cfg(target_os = "macos")]
mod accessibility {
    use core_foundation::{
        base::TCFType,
        boolean::CFBoolean,
        dictionary::{CFDictionary, CFDictionaryRef},
        string::CFString,
    };

    #[link(name = "ApplicationServices", kind = "framework")]
    unsafe extern "C" {
        fn AXIsProcessTrusted() -> bool;
        fn AXIsProcessTrustedWithOptions(options: CFDictionaryRef) -> bool;
    }

    pub(super) fn is_trusted() -> bool {
        // SAFETY: no arguments, reads process trust state.
        unsafe { AXIsProcessTrusted() }
    }

    pub(super) fn prompt() -> bool {
        let key = CFString::from_static_string("AXTrustedCheckOptionPrompt");
        let options = CFDictionary::from_CFType_pairs(&[(
            key.as_CFType(),
            CFBoolean::true_value().as_CFType(),
        )]);
        // SAFETY: `options` is a valid CFDictionary for the duration of the call.
        unsafe { AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef()) }
    }
}

#[cfg(not(target_os = "macos"))]
mod accessibility {
    use crate::paste_guard::open_enigo;

    pub(super) fn is_trusted() -> bool {
        open_enigo().is_ok()
    }

    pub(super) fn prompt() -> bool {
        is_trusted()
    }
}
