use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::{RetryFamily, RetryOutcome, RetryPolicy};

#[test]
fn delays_grow_linearly() {
    let policy = RetryPolicy::new(5, Duration::from_millis(100));
    let schedule: Vec<_> = policy.schedule().map(|d| d.as_millis()).collect();
    assert_eq!(schedule, vec![100, 200, 300, 400, 500]);
}

#[test]
fn stops_after_first_success() {
    let family = RetryFamily::new("attach");
    let generation = family.begin();
    let policy = RetryPolicy::new(5, Duration::ZERO);
    let mut calls = 0;
    let outcome = family.run(generation, &policy, |n| {
        calls += 1;
        n == 2
    });
    assert_eq!(outcome, RetryOutcome::Succeeded { attempt: 2 });
    assert_eq!(calls, 3);
    assert!(family.has_succeeded());
}

#[test]
fn exhausts_after_max_attempts() {
    let family = RetryFamily::new("listen");
    let generation = family.begin();
    let policy = RetryPolicy::new(3, Duration::ZERO);
    let mut calls = 0;
    let outcome = family.run(generation, &policy, |_| {
        calls += 1;
        false
    });
    assert_eq!(outcome, RetryOutcome::Exhausted { attempts: 3 });
    assert_eq!(calls, 3);
    assert!(!family.has_succeeded());
}

#[test]
fn new_generation_supersedes_old_one() {
    let family = Arc::new(RetryFamily::new("attach"));
    let old = family.begin();
    let policy = RetryPolicy::new(5, Duration::from_millis(50));

    let runner = {
        let family = Arc::clone(&family);
        thread::spawn(move || family.run(old, &policy, |_| false))
    };
    thread::sleep(Duration::from_millis(30));
    let _new = family.begin();
    assert_eq!(runner.join().unwrap(), RetryOutcome::Superseded);
}

#[test]
fn cancel_stops_pending_attempts() {
    let family = RetryFamily::new("attach");
    let generation = family.begin();
    family.cancel();
    let policy = RetryPolicy::new(2, Duration::ZERO);
    let outcome = family.run(generation, &policy, |_| panic!("must not run"));
    assert_eq!(outcome, RetryOutcome::Superseded);
}
