//! Integration tests for the cooperative task scheduler.

use std::cell::RefCell;
use std::rc::Rc;

use weft_core::{TaskError, TaskScheduler, TaskState};

#[test]
fn test_round_robin_order() {
    let scheduler = TaskScheduler::new();
    let trace = Rc::new(RefCell::new(Vec::new()));

    for name in ["T1", "T2", "T3"] {
        let trace = Rc::clone(&trace);
        let handle = scheduler.clone();
        scheduler.add(async move {
            for _ in 0..2 {
                trace.borrow_mut().push(name);
                handle.yield_now(true).await;
            }
            Ok(())
        });
    }

    for _ in 0..7 {
        scheduler.service();
    }
    assert_eq!(
        *trace.borrow(),
        vec!["T1", "T2", "T3", "T1", "T2", "T3"]
    );
    // Each task needs one more step to return after its last yield.
    assert_eq!(scheduler.len(), 2);
}

#[test]
fn test_idle_requires_every_task_idle() {
    let scheduler = TaskScheduler::new();
    let idle = scheduler.clone();
    let busy = scheduler.clone();
    let waiter = scheduler.add(async move {
        for _ in 0..10 {
            idle.yield_now(false).await;
        }
        Ok(())
    });
    scheduler.add(async move {
        for _ in 0..10 {
            busy.yield_now(true).await;
        }
        Ok(())
    });

    // The second task has not reported yet and counts as busy.
    assert!(!scheduler.service());
    assert_eq!(scheduler.state(waiter), Some(TaskState::Suspended));
    // Both reported; one is busy.
    assert!(!scheduler.service());
    assert!(!scheduler.is_idle());
}

#[test]
fn test_failure_is_isolated() {
    let scheduler = TaskScheduler::new();
    let survivor_steps = Rc::new(RefCell::new(0));

    let failing = scheduler.add(async { Err(TaskError::msg("boom")) });
    let steps = Rc::clone(&survivor_steps);
    let handle = scheduler.clone();
    let survivor = scheduler.add(async move {
        for _ in 0..3 {
            *steps.borrow_mut() += 1;
            handle.yield_now(true).await;
        }
        Ok(())
    });

    scheduler.service();
    assert_eq!(scheduler.state(failing), None);
    for _ in 0..4 {
        scheduler.service();
    }
    assert_eq!(*survivor_steps.borrow(), 3);
    assert_eq!(scheduler.state(survivor), None);
    assert!(scheduler.is_empty());
    assert!(scheduler.service());
}

#[test]
fn test_error_conversion_with_question_mark() {
    let scheduler = TaskScheduler::new();
    let reached = Rc::new(RefCell::new(false));
    let flag = Rc::clone(&reached);
    scheduler.add(async move {
        let number: i32 = "not a number".parse()?;
        *flag.borrow_mut() = number > 0;
        Ok(())
    });

    assert!(scheduler.service());
    assert!(!*reached.borrow());
    assert!(scheduler.is_empty());
}
