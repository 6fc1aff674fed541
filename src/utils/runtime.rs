//! Blocking bridge into async client libraries.

use std::cell::RefCell;
use std::future::Future;
use std::io;

use tokio::runtime::{Builder, Runtime};

thread_local! {
    static RUNTIME: RefCell<Option<Runtime>> = const { RefCell::new(None) };
}

/// Drive `future` to completion on this thread's current-thread runtime.
///
/// Each worker thread builds its runtime on first use and keeps it for the
/// rest of the run. Must not be called from inside another runtime.
pub fn block_on<F: Future>(future: F) -> io::Result<F::Output> {
    let cached = RUNTIME.with(|cell| cell.borrow_mut().take());
    let runtime = match cached {
        Some(runtime) => runtime,
        None => Builder::new_current_thread().enable_all().build()?,
    };
    let output = runtime.block_on(future);
    RUNTIME.with(|cell| *cell.borrow_mut() = Some(runtime));
    Ok(output)
}
