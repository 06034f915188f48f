//! Agent input overrides for the joystick ports.
//!
//! The machine samples its own input devices once per frame; the overrides
//! are applied right after that poll so an agent's stick and trigger state
//! replaces whatever the host devices reported. Ports without an override
//! pass the polled values through untouched.

use crate::core::machine::Machine;

/// Number of joystick ports with direction and trigger overrides.
pub const JOYSTICK_PORTS: usize = 4;

/// Number of paddle (POT) inputs. Deliberately wider than the joystick range.
pub const PADDLE_PORTS: usize = 8;

/// Highest meaningful paddle position.
pub const PADDLE_MAX: u8 = 228;

/// Trigger line value for a pressed button (active-low).
pub const TRIG_PRESSED: u8 = 0;

/// Console switch bits (active-low: a cleared bit is a pressed key).
pub const CONSOL_NONE: u8 = 0x07;
pub const CONSOL_START: u8 = 0x01;
pub const CONSOL_SELECT: u8 = 0x02;
pub const CONSOL_OPTION: u8 = 0x04;

/// Key code meaning "no key held".
pub const AKEY_NONE: i32 = -1;

/// Joystick direction. Nibble bits are active-low: bit 0 up, 1 down,
/// 2 left, 3 right.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Centre,
    Up,
    Down,
    Left,
    Right,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl Direction {
    /// Parse a wire direction name. Unknown names read as centre.
    pub fn parse(name: &str) -> Self {
        match name {
            "up" => Self::Up,
            "down" => Self::Down,
            "left" => Self::Left,
            "right" => Self::Right,
            "ul" => Self::UpLeft,
            "ur" => Self::UpRight,
            "ll" => Self::DownLeft,
            "lr" => Self::DownRight,
            _ => Self::Centre,
        }
    }

    pub fn nibble(self) -> u8 {
        match self {
            Self::Centre => 0x0F,
            Self::Up => 0x0E,
            Self::Down => 0x0D,
            Self::Left => 0x0B,
            Self::Right => 0x07,
            Self::UpLeft => 0x0A,
            Self::UpRight => 0x06,
            Self::DownLeft => 0x09,
            Self::DownRight => 0x05,
        }
    }
}

/// Override state for one port. `None` lets the polled value through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PortOverride {
    pub direction: Option<u8>,
    pub trigger: Option<u8>,
}

#[derive(Debug, Default)]
pub struct InputOverrides {
    ports: [PortOverride; JOYSTICK_PORTS],
}

impl InputOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the stick and trigger override for `port`.
    ///
    /// Centre clears the directional override and an unpressed trigger
    /// clears the trigger override, so host-side (keyboard) joystick input
    /// resumes. Returns false for a port outside 0-3.
    pub fn set(&mut self, port: usize, direction: Direction, fire: bool) -> bool {
        self.set_direction(port, direction) && self.set_trigger(port, fire)
    }

    pub fn set_direction(&mut self, port: usize, direction: Direction) -> bool {
        let Some(entry) = self.ports.get_mut(port) else {
            return false;
        };
        entry.direction = match direction {
            Direction::Centre => None,
            dir => Some(dir.nibble()),
        };
        true
    }

    pub fn set_trigger(&mut self, port: usize, fire: bool) -> bool {
        let Some(entry) = self.ports.get_mut(port) else {
            return false;
        };
        entry.trigger = fire.then_some(TRIG_PRESSED);
        true
    }

    pub fn port(&self, port: usize) -> Option<PortOverride> {
        self.ports.get(port).copied()
    }

    pub fn is_active(&self) -> bool {
        self.ports
            .iter()
            .any(|p| p.direction.is_some() || p.trigger.is_some())
    }

    pub fn clear(&mut self) {
        self.ports = [PortOverride::default(); JOYSTICK_PORTS];
    }

    /// Replace the polled stick nibbles and triggers with the active
    /// overrides. Must run after `Machine::poll_input` and before the frame.
    pub fn apply<M: Machine + ?Sized>(&self, machine: &mut M) {
        for (port, entry) in self.ports.iter().enumerate() {
            if let Some(nibble) = entry.direction {
                let index = port / 2;
                let shift = (port & 1) * 4;
                let latch = machine.port_input(index);
                let value = (latch & !(0x0F << shift)) | ((nibble & 0x0F) << shift);
                machine.set_port_input(index, value);
            }
            if let Some(trigger) = entry.trigger {
                machine.set_trig(port, trigger);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_direction_is_centre() {
        assert_eq!(Direction::parse("sideways"), Direction::Centre);
        assert_eq!(Direction::parse(""), Direction::Centre);
    }

    #[test]
    fn diagonal_nibbles_combine_cardinals() {
        let up = Direction::Up.nibble();
        let left = Direction::Left.nibble();
        assert_eq!(Direction::UpLeft.nibble(), up & left);
        assert_eq!(
            Direction::DownRight.nibble(),
            Direction::Down.nibble() & Direction::Right.nibble()
        );
    }

    #[test]
    fn centre_and_release_clear_override() {
        let mut overrides = InputOverrides::new();
        assert!(overrides.set(2, Direction::Left, true));
        assert_eq!(
            overrides.port(2),
            Some(PortOverride {
                direction: Some(0x0B),
                trigger: Some(TRIG_PRESSED),
            })
        );
        assert!(overrides.set(2, Direction::Centre, false));
        assert_eq!(overrides.port(2), Some(PortOverride::default()));
        assert!(!overrides.is_active());
    }

    #[test]
    fn out_of_range_port_is_rejected() {
        let mut overrides = InputOverrides::new();
        assert!(!overrides.set(4, Direction::Up, true));
        assert!(!overrides.is_active());
    }
}
