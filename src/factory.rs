use crate::constants;
use crate::extension::ShellExtension;
use crate::guid::GuidExt;
use crate::refcount::LoadCounter;
use std::ffi::c_void;
use std::ptr;
use windows::Win32::Foundation::{CLASS_E_NOAGGREGATION, E_POINTER};
use windows::Win32::System::Com::{IClassFactory, IClassFactory_Impl};
use windows::core::{BOOL, Error, GUID, IUnknown, Interface, Ref, implement};

#[implement(IClassFactory)]
pub struct ShellExtensionClassFactory {
    locks: &'static LoadCounter,
}

impl ShellExtensionClassFactory {
    pub const CLSID: GUID = GUID::from_u128(constants::CLSID);
}

impl ShellExtensionClassFactory {
    pub fn new(locks: &'static LoadCounter) -> Self {
        locks.increment();
        Self { locks }
    }
}

impl Drop for ShellExtensionClassFactory {
    fn drop(&mut self) {
        self.locks.decrement();
    }
}

impl IClassFactory_Impl for ShellExtensionClassFactory_Impl {
    fn CreateInstance(
        &self,
        punkouter: Ref<'_, IUnknown>,
        riid: *const GUID,
        ppvobject: *mut *mut c_void,
    ) -> windows::core::Result<()> {
        if ppvobject.is_null() || riid.is_null() {
            return Err(Error::from(E_POINTER));
        }

        // SAFETY: checked non-null above; Windows guarantees the pointer is writable
        unsafe {
            // Must set out parameter to NULL on failure
            *ppvobject = ptr::null_mut();
        }

        // SAFETY: checked non-null above
        let riid = unsafe { *riid };

        // Aggregation not supported
        if !punkouter.is_null() {
            log::warn!("Attempted to use aggregation");
            return Err(Error::from(CLASS_E_NOAGGREGATION));
        }

        // Our transient reference is released when `object` drops, whatever the query returns.
        let object = IUnknown::from(ShellExtension::new(self.locks));

        // SAFETY: ppvobject is valid and nulled; query adds the caller's reference on success
        let result = unsafe { object.query(&riid, ppvobject).ok() };

        if let Err(e) = &result {
            log::warn!(
                "Attempted to query for unimplemented interface={}, error: {:?}",
                riid.display(),
                e
            );
        }

        result
    }

    fn LockServer(&self, flock: BOOL) -> windows::core::Result<()> {
        if flock.as_bool() {
            let count = self.locks.increment();
            log::debug!("Server locked (load count={})", count);
        } else {
            let count = self.locks.decrement();
            log::debug!("Server unlocked (load count={})", count);
        }
        Ok(())
    }
}
