//! Shared helpers for host tests: a minimal blocking executor and mock
//! input sources.

extern crate std;

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

use crate::input::ChannelSource;
use crate::types::Sample;

/// Run a future to completion (simple blocking executor).
///
/// The mocks used in tests never return `Pending`, so a no-op waker is
/// enough.
pub fn block_on<F: Future>(mut f: F) -> F::Output {
    fn noop_raw_waker() -> RawWaker {
        fn noop(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            noop_raw_waker()
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
        RawWaker::new(core::ptr::null(), &VTABLE)
    }

    let waker = unsafe { Waker::from_raw(noop_raw_waker()) };
    let mut cx = Context::from_waker(&waker);

    // SAFETY: We don't move f after pinning
    let mut f = unsafe { Pin::new_unchecked(&mut f) };

    loop {
        match f.as_mut().poll(&mut cx) {
            Poll::Ready(result) => return result,
            Poll::Pending => {
                panic!("Mock future returned Pending unexpectedly");
            }
        }
    }
}

/// Channel source that cycles through a fixed list of samples.
pub struct FixedChannels {
    samples: std::vec::Vec<Sample>,
    index: usize,
}

impl FixedChannels {
    pub fn new(samples: &[Sample]) -> Self {
        Self {
            samples: samples.to_vec(),
            index: 0,
        }
    }
}

impl ChannelSource for FixedChannels {
    fn read_channels(&mut self) -> impl Future<Output = Sample> {
        let sample = self.samples[self.index % self.samples.len()];
        self.index += 1;
        core::future::ready(sample)
    }
}
