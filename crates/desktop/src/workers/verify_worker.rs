use std::sync::Arc;
use std::thread;

use crossbeam_channel::Receiver;

use facekey_core::pipeline::verify_use_case::{VerifyOutcome, VerifyUseCase};
use facekey_core::shared::frame::Frame;

/// Run one verification attempt off the UI thread.
///
/// The embedding computation can take noticeable time; doing it here
/// keeps the video panel refreshing. Exactly one outcome is posted, and
/// the UI keeps the Verify button disabled until it drains the channel,
/// so attempts can never overlap.
pub fn spawn(use_case: Arc<VerifyUseCase>, frame: Frame) -> Receiver<VerifyOutcome> {
    let (tx, rx) = crossbeam_channel::bounded::<VerifyOutcome>(1);

    thread::spawn(move || {
        let outcome = use_case.execute(&frame);
        let _ = tx.send(outcome);
    });

    rx
}
