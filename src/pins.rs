//! Raspberry Pi 40-pin header assignments for the drive lines.
//!
//! Single source of truth for pin legality. Pins are physical header
//! (board) numbers; the GPIO character device addresses lines by BCM
//! offset, so [`board_to_bcm`] translates between the two.

use crate::error::{PinFault, Result};
use crate::motion::LineRole;

// ---------------------------------------------------------------------------
// Default wiring (H-bridge inputs)
// ---------------------------------------------------------------------------

pub const DEFAULT_RIGHT_FORWARD_PIN: u8 = 24;
pub const DEFAULT_RIGHT_BACKWARD_PIN: u8 = 26;
pub const DEFAULT_LEFT_FORWARD_PIN: u8 = 29;
pub const DEFAULT_LEFT_BACKWARD_PIN: u8 = 31;

// ---------------------------------------------------------------------------
// Header table
// ---------------------------------------------------------------------------

/// (board pin, BCM line offset) for every output-capable header pin.
const HEADER: [(u8, u8); 26] = [
    (3, 2),
    (5, 3),
    (7, 4),
    (8, 14),
    (10, 15),
    (11, 17),
    (12, 18),
    (13, 27),
    (15, 22),
    (16, 23),
    (18, 24),
    (19, 10),
    (21, 9),
    (22, 25),
    (23, 11),
    (24, 8),
    (26, 7),
    (29, 5),
    (31, 6),
    (32, 12),
    (33, 13),
    (35, 19),
    (36, 16),
    (37, 26),
    (38, 20),
    (40, 21),
];

/// Board pins that can drive an output line.
pub fn valid_pins() -> impl Iterator<Item = u8> {
    HEADER.iter().map(|(board, _)| *board)
}

pub fn is_valid_output_pin(board_pin: u8) -> bool {
    HEADER.iter().any(|(board, _)| *board == board_pin)
}

/// BCM line offset for a board pin, `None` for power/ground/ID pins.
pub fn board_to_bcm(board_pin: u8) -> Option<u8> {
    HEADER
        .iter()
        .find(|(board, _)| *board == board_pin)
        .map(|(_, bcm)| *bcm)
}

// ---------------------------------------------------------------------------
// Line assignment
// ---------------------------------------------------------------------------

/// Validated mapping from the four line roles to distinct header pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAssignment([u8; 4]);

impl LineAssignment {
    /// Validate and build an assignment (order RF, RB, LF, LB).
    pub fn new(
        right_forward: u8,
        right_backward: u8,
        left_forward: u8,
        left_backward: u8,
    ) -> Result<Self> {
        let pins = [right_forward, right_backward, left_forward, left_backward];

        for role in LineRole::ALL {
            let pin = pins[role.index()];
            if !is_valid_output_pin(pin) {
                return Err(PinFault::NotOutputCapable { role, pin }.into());
            }
        }

        for (i, pin) in pins.iter().enumerate() {
            if pins[i + 1..].contains(pin) {
                return Err(PinFault::Duplicate { pin: *pin }.into());
            }
        }

        Ok(Self(pins))
    }

    pub const fn pin(&self, role: LineRole) -> u8 {
        self.0[role.index()]
    }

    /// Pins in role order (RF, RB, LF, LB).
    pub const fn pins(&self) -> [u8; 4] {
        self.0
    }
}

impl Default for LineAssignment {
    fn default() -> Self {
        Self([
            DEFAULT_RIGHT_FORWARD_PIN,
            DEFAULT_RIGHT_BACKWARD_PIN,
            DEFAULT_LEFT_FORWARD_PIN,
            DEFAULT_LEFT_BACKWARD_PIN,
        ])
    }
}
