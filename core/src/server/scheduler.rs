//! Pause/run state machine for deterministic frame and instruction stepping.
//!
//! `run` and `step` requests do not answer immediately. The scheduler counts
//! down as the host reports frame boundaries or executed instructions, and
//! hands back exactly one [`Completion`] when the count is exhausted (or a
//! breakpoint cuts the run short).

/// Current execution mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    /// Waiting for commands. Frames do not advance while a session is
    /// attached.
    Paused,
    /// Running without a pending completion: the start-running mode before
    /// the first client attaches.
    Free,
    /// Running a counted number of frames.
    Frames { remaining: u32, total: u32 },
    /// Single-stepping a counted number of instructions.
    Instructions { remaining: u32, total: u32 },
}

/// Deferred answer for a finished `run` or `step`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    Frames { run: u32, breakpoint: Option<u16> },
    Instructions { run: u32, breakpoint: Option<u16> },
}

#[derive(Debug)]
pub struct Scheduler {
    state: RunState,
}

impl Scheduler {
    pub fn new(start_running: bool) -> Self {
        Self {
            state: if start_running {
                RunState::Free
            } else {
                RunState::Paused
            },
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.state == RunState::Paused
    }

    pub fn is_stepping(&self) -> bool {
        matches!(self.state, RunState::Instructions { .. })
    }

    /// Start a counted frame run. Counts below 1 are treated as 1.
    pub fn run_frames(&mut self, frames: u32) {
        let total = frames.max(1);
        self.state = RunState::Frames {
            remaining: total,
            total,
        };
    }

    /// Start a counted instruction step. Counts below 1 are treated as 1.
    pub fn run_instructions(&mut self, instructions: u32) {
        let total = instructions.max(1);
        self.state = RunState::Instructions {
            remaining: total,
            total,
        };
    }

    /// Handle a `pause` request. Requests are only read while paused, so a
    /// counted run has always completed by the time this is called.
    pub fn pause(&mut self) {
        self.state = RunState::Paused;
    }

    /// Pause without producing a completion (new session).
    pub fn force_pause(&mut self) {
        self.state = RunState::Paused;
    }

    /// Account one elapsed frame.
    pub fn frame_elapsed(&mut self, breakpoint: Option<u16>) -> Option<Completion> {
        match self.state {
            RunState::Frames { remaining, total } => {
                let remaining = remaining.saturating_sub(1);
                if remaining == 0 || breakpoint.is_some() {
                    self.state = RunState::Paused;
                    Some(Completion::Frames {
                        run: total - remaining,
                        breakpoint,
                    })
                } else {
                    self.state = RunState::Frames { remaining, total };
                    None
                }
            }
            // Free running has no requester to answer; a breakpoint hit is
            // only reported to a counted run.
            _ => None,
        }
    }

    /// Account one executed instruction.
    pub fn instruction_elapsed(&mut self, breakpoint: Option<u16>) -> Option<Completion> {
        let RunState::Instructions { remaining, total } = self.state else {
            return None;
        };
        let remaining = remaining.saturating_sub(1);
        if remaining == 0 || breakpoint.is_some() {
            self.state = RunState::Paused;
            Some(Completion::Instructions {
                run: total - remaining,
                breakpoint,
            })
        } else {
            self.state = RunState::Instructions { remaining, total };
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_paused_unless_running() {
        assert!(Scheduler::new(false).is_paused());
        assert_eq!(Scheduler::new(true).state(), RunState::Free);
    }

    #[test]
    fn zero_count_is_clamped() {
        let mut sched = Scheduler::new(false);
        sched.run_frames(0);
        assert_eq!(
            sched.state(),
            RunState::Frames {
                remaining: 1,
                total: 1
            }
        );
        sched.run_instructions(0);
        assert_eq!(
            sched.state(),
            RunState::Instructions {
                remaining: 1,
                total: 1
            }
        );
    }

    #[test]
    fn breakpoint_in_free_run_is_ignored() {
        let mut sched = Scheduler::new(true);
        assert_eq!(sched.frame_elapsed(None), None);
        assert_eq!(sched.state(), RunState::Free);
        assert_eq!(sched.frame_elapsed(Some(0x0600)), None);
        assert_eq!(sched.state(), RunState::Free);
    }

    #[test]
    fn instruction_count_ignored_for_frames() {
        let mut sched = Scheduler::new(false);
        sched.run_frames(2);
        assert_eq!(sched.instruction_elapsed(None), None);
        assert_eq!(
            sched.state(),
            RunState::Frames {
                remaining: 2,
                total: 2
            }
        );
    }
}
