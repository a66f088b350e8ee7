//! Built-in Transforms
//!
//! Each transform is a [`Kernel`](crate::Kernel) wrapped by
//! [`TransformBase`](crate::TransformBase). Kernels that need expensive
//! per-call state (convolution and correlation plans, filter delay lines)
//! keep it in a [`HandlePool`] built during `initialize`.

mod autocorrelation;
mod diffrect;
mod energy;
mod flux;
mod highpass;
mod log;
mod lowpass;
mod window;

pub use autocorrelation::Autocorrelation;
pub use diffrect::Diffrect;
pub use energy::Energy;
pub use flux::Flux;
pub use highpass::Highpass;
pub use log::Log;
pub use lowpass::Lowpass;
pub use window::Window;

use rayon::prelude::*;

use crate::buffers::{Element, Frames};
use crate::cancel::CancellationToken;
use crate::error::ExtractionResult;
use crate::handle_pool::HandlePool;

/// Process frames in parallel, leasing one pooled handle per frame
pub(crate) fn for_each_pooled<H, I, O, F>(
    pool: &HandlePool<H>,
    input: &Frames<I>,
    output: &mut Frames<O>,
    cancel: &CancellationToken,
    f: F,
) -> ExtractionResult<()>
where
    H: Send,
    I: Element,
    O: Element,
    F: Fn(&mut H, &[I], &mut [O]) + Sync,
{
    input
        .blocks()
        .par_iter()
        .zip(output.blocks_mut().par_iter_mut())
        .try_for_each(|(source, sink)| {
            let mut handle = pool.acquire(cancel)?;
            f(&mut *handle, source, sink);
            Ok(())
        })
}
