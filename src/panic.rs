use std::panic::{UnwindSafe, catch_unwind};

/// Runs `f`, turning a panic into `Err(())` so it never unwinds across the COM ABI.
pub fn handle_unwind<T>(f: impl FnOnce() -> T + UnwindSafe) -> Result<T, ()> {
    // The outer catch covers a panic raised while dropping the payload or logging it.
    catch_unwind(|| match catch_unwind(f) {
        Ok(x) => Ok(x),
        Err(e) => {
            let message = e
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| e.downcast_ref::<String>().map(String::as_str))
                .unwrap_or("<non-string payload>");
            log::error!("Caught panic: {}", message);
            Err(())
        }
    })
    .unwrap_or_else(|_| Err(()))
}
