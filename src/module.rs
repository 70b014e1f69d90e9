use std::ffi::{OsString, c_void};
use std::os::windows::ffi::OsStringExt;
use std::path::PathBuf;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use windows::Win32::Foundation::{ERROR_INSUFFICIENT_BUFFER, HMODULE, MAX_PATH};
use windows::Win32::System::LibraryLoader::{
    GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS, GET_MODULE_HANDLE_EX_FLAG_UNCHANGED_REFCOUNT,
    GetModuleFileNameW, GetModuleHandleExW,
};
use windows::core::{Error, PCWSTR, Result};

static HANDLE: AtomicPtr<c_void> = AtomicPtr::new(ptr::null_mut());

/// Records the handle passed to `DllMain`. Returns false if one was already recorded.
pub fn record_handle(dll_module: HMODULE) -> bool {
    HANDLE
        .compare_exchange(
            ptr::null_mut(),
            dll_module.0,
            Ordering::SeqCst,
            Ordering::SeqCst,
        )
        .is_ok()
}

/// Get a handle to the module containing this code.
///
/// Falls back to an address lookup when `DllMain` has not run, e.g. under the test harness.
pub fn get_handle() -> Result<HMODULE> {
    let recorded = HANDLE.load(Ordering::SeqCst);
    if !recorded.is_null() {
        return Ok(HMODULE(recorded));
    }

    let mut handle = HMODULE::default();
    // SAFETY: with FROM_ADDRESS the "name" is any address inside this module; UNCHANGED_REFCOUNT
    // means the handle is not owned and must not be freed.
    unsafe {
        GetModuleHandleExW(
            GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS | GET_MODULE_HANDLE_EX_FLAG_UNCHANGED_REFCOUNT,
            PCWSTR(get_handle as *const u16),
            &mut handle,
        )?
    };
    Ok(handle)
}

/// Full path of the current DLL.
pub fn get_dll_path() -> Result<PathBuf> {
    let handle = get_handle()?;

    let mut buf = vec![0u16; MAX_PATH as usize];
    loop {
        // SAFETY: handle refers to this module, which stays loaded while its code runs
        let len = unsafe { GetModuleFileNameW(Some(handle), &mut buf) } as usize;
        if len == 0 {
            return Err(Error::from_win32());
        }
        // A full buffer means the path was truncated.
        if len == buf.len() && Error::from_win32().code() == ERROR_INSUFFICIENT_BUFFER.to_hresult()
        {
            buf.resize(buf.len() * 2, 0);
            continue;
        }
        return Ok(OsString::from_wide(&buf[..len]).into());
    }
}
