//! Interaction with panic hooks installed before the supervisor's.
//!
//! Kept in its own test binary: it replaces the process panic hook.

use std::{
    panic,
    sync::atomic::{AtomicUsize, Ordering},
    thread,
};

static SEEN: AtomicUsize = AtomicUsize::new(0);

#[test]
fn unsupervised_panics_reach_previous_hook() {
    panic::set_hook(Box::new(|_| {
        SEEN.fetch_add(1, Ordering::SeqCst);
    }));
    panictrace::hook::install();

    let unsupervised = thread::spawn(|| {
        panic!("unsupervised");
    });
    assert!(unsupervised.join().is_err());
    assert_eq!(SEEN.load(Ordering::SeqCst), 1);

    let report = panictrace::catch(|| {
        panic!("supervised");
    })
    .expect_err("closure panics");
    assert_eq!(report.message().to_string(), "supervised");
    assert_eq!(SEEN.load(Ordering::SeqCst), 1);

    // Panics the supervised code recovers from itself stay with the supervisor.
    let value = panictrace::catch(|| {
        let handled = panic::catch_unwind(|| {
            panic!("handled");
        });
        assert!(handled.is_err());
        5
    });
    assert_eq!(value.ok(), Some(5));
    assert_eq!(SEEN.load(Ordering::SeqCst), 1);
}
