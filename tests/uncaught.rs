//! Lives in its own binary, as it installs the process-wide panic hook.

use std::{
    cell::RefCell,
    panic,
    rc::Rc,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use async_trait::async_trait;
use cucumber_engine::{
    event::Payload, Event, FaultChannel, Failure, Feature, FeaturesRunner,
    Invocable, Library, Listener, Pickle,
};
use regex::Regex;

#[derive(Clone, Default)]
struct Failures(Rc<RefCell<Vec<Failure>>>);

#[async_trait(?Send)]
impl Listener for Failures {
    async fn hear(&mut self, event: &Event) {
        if let Payload::StepResult { result, .. } = &event.payload {
            self.0.borrow_mut().extend(result.failure.clone());
        }
    }
}

#[tokio::test]
async fn panic_on_another_thread_fails_the_step() {
    let library = Library::<()>::new()
        .step(
            Regex::new("^a thread panics$").unwrap(),
            Invocable::Callback(|_, _, done| {
                thread::spawn(move || {
                    let _done = done;
                    panic!("detached boom");
                });
                None
            }),
        )
        .default_timeout(Some(Duration::from_secs(10)));
    let failures = Failures::default();
    let heard = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&heard);
    panic::set_hook(Box::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    let passed = FeaturesRunner::new(library)
        .with_features([Feature::new("faults")
            .with_pickle(Pickle::new("uncaught").step("a thread panics"))])
        .with_fault_channel(FaultChannel::new().with_panic_hook())
        .with_listener(failures.clone())
        .run()
        .await;

    assert!(!passed);
    let failures = failures.0.borrow();
    let [Failure::Uncaught(fault)] = failures.as_slice() else {
        panic!("expected a single uncaught fault, got {failures:?}");
    };
    assert_eq!(fault.payload, "detached boom");
    let location = fault.location.as_deref().unwrap_or_default();
    assert!(location.contains("uncaught.rs"), "{location}");

    assert_eq!(heard.load(Ordering::SeqCst), 1, "wrapped hook is chained");
    thread::spawn(|| panic!("after the run")).join().unwrap_err();
    assert_eq!(heard.load(Ordering::SeqCst), 2, "previous hook is restored");
}
