//! Dedicated service thread for secondary isolates.
//!
//! Each secondary isolate gets one named OS thread that blocks on the task
//! queue and runs units inside the isolate until the queue terminates. The
//! thread is detached; disposal closes the queue and the thread exits after
//! the drain.

use std::sync::Arc;

use crate::isolate::environment::IsolateEnvironment;

pub(crate) fn spawn_service_thread(env: Arc<IsolateEnvironment>) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name(format!("ferry-{}", env.name()))
        .spawn(move || env.service_loop())?;
    Ok(())
}
