use a8remote_core::server::scheduler::{Completion, RunState, Scheduler};

#[test]
fn test_frames_complete_exactly_once() {
    let mut sched = Scheduler::new(false);
    sched.run_frames(3);
    assert_eq!(sched.frame_elapsed(None), None);
    assert_eq!(sched.frame_elapsed(None), None);
    assert_eq!(
        sched.frame_elapsed(None),
        Some(Completion::Frames {
            run: 3,
            breakpoint: None
        })
    );
    assert!(sched.is_paused());
    // Further frames while paused produce nothing.
    assert_eq!(sched.frame_elapsed(None), None);
}

#[test]
fn test_instructions_stay_running_until_count() {
    let mut sched = Scheduler::new(false);
    sched.run_instructions(4);
    for _ in 0..3 {
        assert_eq!(sched.instruction_elapsed(None), None);
        assert!(!sched.is_paused());
    }
    assert_eq!(
        sched.instruction_elapsed(None),
        Some(Completion::Instructions {
            run: 4,
            breakpoint: None
        })
    );
    assert!(sched.is_paused());
}

#[test]
fn test_breakpoint_reports_partial_count() {
    let mut sched = Scheduler::new(false);
    sched.run_frames(10);
    sched.frame_elapsed(None);
    assert_eq!(
        sched.frame_elapsed(Some(0x0610)),
        Some(Completion::Frames {
            run: 2,
            breakpoint: Some(0x0610)
        })
    );
    assert!(sched.is_paused());
}

#[test]
fn test_pause_is_idempotent() {
    let mut sched = Scheduler::new(false);
    sched.pause();
    assert!(sched.is_paused());
    sched.pause();
    assert_eq!(sched.state(), RunState::Paused);
}

#[test]
fn test_force_pause_drops_pending_run() {
    let mut sched = Scheduler::new(true);
    sched.run_instructions(8);
    sched.force_pause();
    assert_eq!(sched.state(), RunState::Paused);
    assert_eq!(sched.instruction_elapsed(None), None);
}
