use crate::constants::{FRIENDLY_NAME, LOG_FILE_NAME, SETTINGS_FILE_NAME, THREADING_MODEL};
use crate::factory::ShellExtensionClassFactory;
use crate::guid::GuidExt;
use crate::registration::InprocServer;
use crate::registry::{self, RegistryRoots};
use crate::settings::{self, Settings};
use crate::{logging, module, panic, refcount};
use std::ffi::c_void;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::ptr;
use windows::Win32::Foundation::{
    CLASS_E_CLASSNOTAVAILABLE, E_INVALIDARG, E_POINTER, E_UNEXPECTED, HMODULE, S_FALSE, S_OK,
};
use windows::Win32::System::LibraryLoader::DisableThreadLibraryCalls;
use windows::Win32::System::SystemServices::{DLL_PROCESS_ATTACH, DLL_PROCESS_DETACH};
use windows::Win32::UI::Shell::{SHCNE_ASSOCCHANGED, SHCNF_IDLIST, SHChangeNotify};
use windows::core::{BOOL, GUID, HRESULT, IUnknown, Interface, PCWSTR, Result};

#[unsafe(no_mangle)]
unsafe extern "system" fn DllMain(
    dll_module: HMODULE,
    call_reason: u32,
    _reserved: *mut c_void,
) -> BOOL {
    let result = panic::handle_unwind(|| match call_reason {
        DLL_PROCESS_ATTACH => {
            if module::record_handle(dll_module) {
                init_diagnostics();
            }

            // SAFETY: dll_module is guaranteed to be valid since it's passed into DllMain
            if let Err(e) = unsafe { DisableThreadLibraryCalls(dll_module) } {
                log::warn!("Failed to disable thread notifications: {}", e);
            }
        }
        DLL_PROCESS_DETACH => {
            log::debug!("Module detaching (load count={})", refcount::SERVER_LOCKS.get());
        }
        _ => {}
    });
    match result {
        Ok(()) => BOOL::from(true),
        Err(_) => BOOL::from(false),
    }
}

/// Loads settings from next to the DLL and starts logging. Failures leave logging off.
fn init_diagnostics() {
    let Ok(dll_path) = module::get_dll_path() else {
        return;
    };

    let loaded = settings::load(&dll_path.with_file_name(SETTINGS_FILE_NAME));
    let Settings {
        verbose,
        log_to_file,
    } = match &loaded {
        Ok(Some(settings)) => settings.clone(),
        Ok(None) | Err(_) => Settings::default(),
    };

    let log_path = dll_path.with_file_name(LOG_FILE_NAME);
    if logging::init(log_to_file.then_some(log_path.as_path()), verbose).is_err() {
        return;
    }

    log::info!(
        "Loaded {} {} from `{}`",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        dll_path.display()
    );
    match loaded {
        Ok(Some(_)) => log::info!("Loaded settings from `{}`", SETTINGS_FILE_NAME),
        Ok(None) => log::debug!("No settings file, using defaults"),
        Err(e) => log::warn!("Failed to load settings file, using defaults: {}", e),
    }
}

#[unsafe(no_mangle)]
unsafe extern "system" fn DllCanUnloadNow() -> HRESULT {
    panic::handle_unwind(|| {
        if refcount::SERVER_LOCKS.is_zero() {
            S_OK
        } else {
            S_FALSE
        }
    })
    .unwrap_or(S_FALSE)
}

#[unsafe(no_mangle)]
unsafe extern "system" fn DllGetClassObject(
    rclsid: *const GUID,
    riid: *const GUID,
    ppv: *mut *mut c_void,
) -> HRESULT {
    panic::handle_unwind(AssertUnwindSafe(|| {
        if ppv.is_null() {
            return E_POINTER;
        }

        // SAFETY: checked non-null above
        unsafe {
            // Must set out parameter to NULL on failure
            *ppv = ptr::null_mut();
        }

        if rclsid.is_null() || riid.is_null() {
            return E_INVALIDARG;
        }

        // SAFETY: checked non-null above; the caller passes valid GUIDs
        let (rclsid, riid) = unsafe { (*rclsid, *riid) };

        if rclsid != ShellExtensionClassFactory::CLSID {
            log::warn!("Unexpected CLSID: {}", rclsid.display());
            return CLASS_E_CLASSNOTAVAILABLE;
        }

        let factory = IUnknown::from(ShellExtensionClassFactory::new(&refcount::SERVER_LOCKS));

        // SAFETY: ppv is valid and nulled; our own reference is released when `factory` drops
        let hr = unsafe { factory.query(&riid, ppv) };
        if hr.is_err() {
            log::warn!("Unexpected IID for class object: {}", riid.display());
        }
        hr
    }))
    .unwrap_or(E_UNEXPECTED)
}

fn server_registration(dll_path: &Path) -> InprocServer<'_> {
    InprocServer {
        clsid: ShellExtensionClassFactory::CLSID.display(),
        path: dll_path,
        friendly_name: FRIENDLY_NAME,
        threading_model: THREADING_MODEL,
    }
}

fn notify_association_change() {
    // SAFETY: SHCNE_ASSOCCHANGED takes no items
    unsafe { SHChangeNotify(SHCNE_ASSOCCHANGED, SHCNF_IDLIST, None, None) };
}

#[unsafe(no_mangle)]
unsafe extern "system" fn DllRegisterServer() -> HRESULT {
    let result = panic::handle_unwind(|| -> Result<()> {
        log::info!("Starting to register COM server...");

        let current_dll_path = module::get_dll_path()?;

        registry::register_inproc_server(
            &RegistryRoots::system(),
            &server_registration(&current_dll_path),
        )?;

        notify_association_change();

        log::info!("Completed registering COM server.");

        Ok(())
    });
    match result {
        Ok(Ok(())) => S_OK,
        Ok(Err(e)) => {
            log::error!("Failed to register COM server: {}.", e);
            e.code()
        }
        Err(_) => E_UNEXPECTED,
    }
}

#[unsafe(no_mangle)]
unsafe extern "system" fn DllUnregisterServer() -> HRESULT {
    let result = panic::handle_unwind(|| -> Result<()> {
        log::info!("Starting to unregister COM server...");

        let current_dll_path = module::get_dll_path()?;
        log::info!("Unregistering `{}`", current_dll_path.display());

        registry::unregister_inproc_server(
            &RegistryRoots::system(),
            ShellExtensionClassFactory::CLSID.display(),
        )?;

        notify_association_change();

        log::info!("Completed unregistering COM server.");

        Ok(())
    });
    match result {
        Ok(Ok(())) => S_OK,
        Ok(Err(e)) => {
            log::error!("Failed to unregister COM server: {}.", e);
            e.code()
        }
        Err(_) => E_UNEXPECTED,
    }
}

#[unsafe(no_mangle)]
unsafe extern "system" fn DllInstall(_binstall: BOOL, _pszcmdline: PCWSTR) -> HRESULT {
    // Do nothing, install handled by DllRegisterServer/DllUnregisterServer
    S_OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::CLSID;
    use windows::Win32::Foundation::E_NOINTERFACE;
    use windows::Win32::System::Com::IClassFactory;
    use windows::Win32::UI::Shell::IShellExtInit;

    fn get_class_object(clsid: &GUID, iid: &GUID) -> (HRESULT, *mut c_void) {
        let mut ppv = ptr::dangling_mut::<c_void>();
        // SAFETY: all pointers are valid
        let hr = unsafe { DllGetClassObject(clsid, iid, &mut ppv) };
        (hr, ppv)
    }

    fn can_unload() -> HRESULT {
        // SAFETY: no preconditions
        unsafe { DllCanUnloadNow() }
    }

    #[test]
    fn other_clsids_are_not_available() {
        for other in [
            GUID::zeroed(),
            GUID::from_u128(CLSID + 1),
            IClassFactory::IID,
            GUID::from_u128(0x9e6ecb90_5a61_42bd_b851_d3297d9c7f39),
        ] {
            let (hr, ppv) = get_class_object(&other, &IClassFactory::IID);
            assert_eq!(hr, CLASS_E_CLASSNOTAVAILABLE);
            assert!(ppv.is_null());
        }
    }

    #[test]
    fn null_arguments_are_rejected() {
        // SAFETY: null pointers are checked before use
        unsafe {
            assert_eq!(
                DllGetClassObject(
                    &ShellExtensionClassFactory::CLSID,
                    &IClassFactory::IID,
                    ptr::null_mut()
                ),
                E_POINTER
            );

            let mut ppv = ptr::dangling_mut::<c_void>();
            assert_eq!(
                DllGetClassObject(ptr::null(), &IClassFactory::IID, &mut ppv),
                E_INVALIDARG
            );
            assert!(ppv.is_null());
        }
    }

    #[test]
    fn dll_install_is_a_no_op() {
        // SAFETY: arguments are ignored
        assert_eq!(unsafe { DllInstall(BOOL::from(true), PCWSTR::null()) }, S_OK);
    }

    // The only test touching the module-wide load count, so it runs its steps in sequence.
    #[test]
    fn unload_tracks_factories_objects_and_locks() {
        let clsid = ShellExtensionClassFactory::CLSID;
        assert_eq!(can_unload(), S_OK);

        // Unsupported interface: no factory survives.
        let (hr, ppv) = get_class_object(&clsid, &IShellExtInit::IID);
        assert_eq!(hr, E_NOINTERFACE);
        assert!(ppv.is_null());
        assert_eq!(can_unload(), S_OK);

        // A live factory pins the module.
        let (hr, ppv) = get_class_object(&clsid, &IClassFactory::IID);
        assert_eq!(hr, S_OK);
        // SAFETY: DllGetClassObject returned an owned IClassFactory
        let factory = unsafe { IClassFactory::from_raw(ppv) };
        assert_eq!(can_unload(), S_FALSE);

        // A live object pins it after the factory goes away.
        // SAFETY: no aggregation
        let object: IShellExtInit = unsafe { factory.CreateInstance(None) }.unwrap();
        drop(factory);
        assert_eq!(can_unload(), S_FALSE);
        drop(object);
        assert_eq!(can_unload(), S_OK);

        // An unmatched lock pins it; the matching unlock releases it.
        let (hr, ppv) = get_class_object(&clsid, &IUnknown::IID);
        assert_eq!(hr, S_OK);
        // SAFETY: DllGetClassObject returned an owned IUnknown
        let factory: IClassFactory = unsafe { IUnknown::from_raw(ppv) }.cast().unwrap();
        // SAFETY: plain method call on a live factory
        unsafe { factory.LockServer(true) }.unwrap();
        drop(factory);
        assert_eq!(can_unload(), S_FALSE);

        let (hr, ppv) = get_class_object(&clsid, &IClassFactory::IID);
        assert_eq!(hr, S_OK);
        // SAFETY: DllGetClassObject returned an owned IClassFactory
        let factory = unsafe { IClassFactory::from_raw(ppv) };
        // SAFETY: plain method call on a live factory
        unsafe { factory.LockServer(false) }.unwrap();
        assert_eq!(can_unload(), S_FALSE);
        drop(factory);
        assert_eq!(can_unload(), S_OK);
    }
}
