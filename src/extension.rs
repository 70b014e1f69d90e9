use crate::refcount::LoadCounter;
use windows::Win32::System::Com::IDataObject;
use windows::Win32::System::Registry::HKEY;
use windows::Win32::UI::Shell::Common::ITEMIDLIST;
use windows::Win32::UI::Shell::{IShellExtInit, IShellExtInit_Impl};
use windows::core::{Ref, Result, implement};

/// The object Explorer instantiates per invocation.
///
/// It answers `IUnknown` and `IShellExtInit` only; menu or property-sheet
/// interfaces would be added to the `implement` list.
#[implement(IShellExtInit)]
pub struct ShellExtension {
    locks: &'static LoadCounter,
}

impl ShellExtension {
    pub fn new(locks: &'static LoadCounter) -> Self {
        locks.increment();
        Self { locks }
    }
}

impl Drop for ShellExtension {
    fn drop(&mut self) {
        self.locks.decrement();
    }
}

impl IShellExtInit_Impl for ShellExtension_Impl {
    fn Initialize(
        &self,
        pidlfolder: *const ITEMIDLIST,
        pdtobj: Ref<'_, IDataObject>,
        hkeyprogid: HKEY,
    ) -> Result<()> {
        // A concrete extension inspects the selection here and fails with E_INVALIDARG
        // when it does not apply.
        log::trace!(
            "IShellExtInit::Initialize (folder={:?}, data_object={}, progid_key={:?})",
            pidlfolder,
            if pdtobj.is_null() { "null" } else { "set" },
            hkeyprogid.0
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use windows::Win32::Foundation::E_NOINTERFACE;
    use windows::Win32::System::Com::IClassFactory;
    use windows::Win32::System::Registry::HKEY_CLASSES_ROOT;
    use windows::core::{IUnknown, Interface};

    fn counter() -> &'static LoadCounter {
        Box::leak(Box::new(LoadCounter::new()))
    }

    #[test]
    fn construction_and_release_adjust_load_count() {
        let locks = counter();
        let object = IUnknown::from(ShellExtension::new(locks));
        assert_eq!(locks.get(), 1);

        drop(object);
        assert!(locks.is_zero());
    }

    #[test]
    fn balanced_add_ref_release_keeps_object_alive() {
        let locks = counter();
        let object = IUnknown::from(ShellExtension::new(locks));

        let clones: Vec<IUnknown> = (0..5).map(|_| object.clone()).collect();
        drop(clones);
        assert_eq!(locks.get(), 1, "object destroyed before its last release");

        drop(object);
        assert!(locks.is_zero(), "object not destroyed on its last release");
    }

    #[test]
    fn resolves_identity_and_shell_init_only() {
        let locks = counter();
        let object = IUnknown::from(ShellExtension::new(locks));

        let init: IShellExtInit = object.cast().unwrap();
        let back: IUnknown = init.cast().unwrap();
        assert_eq!(back, object);

        let err = object.cast::<IClassFactory>().unwrap_err();
        assert_eq!(err.code(), E_NOINTERFACE);

        drop((object, init, back));
        assert!(locks.is_zero());
    }

    #[test]
    fn initialize_accepts_anything() {
        let locks = counter();
        let init = IShellExtInit::from(ShellExtension::new(locks));

        // SAFETY: null folder, data object and key are permitted by the interface
        unsafe { init.Initialize(None, None, None) }.unwrap();

        // SAFETY: as above; the predefined key needs no opening
        unsafe { init.Initialize(None, None, Some(HKEY_CLASSES_ROOT)) }.unwrap();
        assert_eq!(locks.get(), 1);
    }
}
