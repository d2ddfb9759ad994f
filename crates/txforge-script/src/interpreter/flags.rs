//! Verification flag bitset.
//!
//! Each verification call carries a [`ScriptFlags`] value selecting which
//! encoding and policy rules the interpreter enforces. Flags compose with
//! `|`; the zero value enforces nothing beyond the core evaluation rules.

use std::ops::{BitAnd, BitOr, BitOrAssign};

/// A bitset of consensus-rule toggles for one verification call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScriptFlags(pub u32);

impl ScriptFlags {
    /// Core evaluation only.
    pub const NONE: ScriptFlags = ScriptFlags(0);

    /// Recognize pay-to-script-hash outputs and run the redeem script as a
    /// third execution pass.
    pub const VERIFY_P2SH: ScriptFlags = ScriptFlags(1 << 0);

    /// Require the CHECKMULTISIG dummy stack element to be empty.
    pub const STRICT_MULTI_SIG: ScriptFlags = ScriptFlags(1 << 1);

    /// Fail on NOP1/NOP4..NOP10 instead of treating them as no-ops.
    pub const DISCOURAGE_UPGRADABLE_NOPS: ScriptFlags = ScriptFlags(1 << 2);

    /// Give OP_NOP2 its CHECKLOCKTIMEVERIFY meaning.
    pub const VERIFY_CHECKLOCKTIMEVERIFY: ScriptFlags = ScriptFlags(1 << 3);

    /// Give OP_NOP3 its CHECKSEQUENCEVERIFY meaning.
    pub const VERIFY_CHECKSEQUENCEVERIFY: ScriptFlags = ScriptFlags(1 << 4);

    /// Require exactly one element left on the stack after evaluation.
    /// Only valid together with [`ScriptFlags::VERIFY_P2SH`].
    pub const VERIFY_CLEAN_STACK: ScriptFlags = ScriptFlags(1 << 5);

    /// Reject signatures that are not strict DER.
    pub const VERIFY_DER_SIGNATURES: ScriptFlags = ScriptFlags(1 << 6);

    /// Reject signatures whose S value exceeds half the curve order.
    pub const VERIFY_LOW_S: ScriptFlags = ScriptFlags(1 << 7);

    /// Require every push to use the shortest possible encoding.
    pub const VERIFY_MINIMAL_DATA: ScriptFlags = ScriptFlags(1 << 8);

    /// Require failed signature checks to consume an empty signature.
    pub const VERIFY_NULL_FAIL: ScriptFlags = ScriptFlags(1 << 9);

    /// Require the unlocking script to contain only pushes.
    pub const VERIFY_SIG_PUSH_ONLY: ScriptFlags = ScriptFlags(1 << 10);

    /// Allow sighash types carrying the fork-id bit, and require it when
    /// present to be matched by this flag.
    pub const ENABLE_SIGHASH_FORKID: ScriptFlags = ScriptFlags(1 << 11);

    /// Enforce strict signature, public key, and hash-type encoding on
    /// every signature-checking opcode.
    pub const VERIFY_STRICT_ENCODING: ScriptFlags = ScriptFlags(1 << 12);

    /// Enable the extended opcode set (OP_CAT, OP_SPLIT, OP_MUL, OP_NUM2BIN,
    /// ...) and widen script numbers from 4 to 8 bytes.
    pub const ENABLE_EXTENDED_OPCODES: ScriptFlags = ScriptFlags(1 << 13);

    /// Require the argument of OP_IF/OP_NOTIF to be exactly empty or 0x01.
    pub const VERIFY_MINIMAL_IF: ScriptFlags = ScriptFlags(1 << 14);

    /// True when every bit of `flag` is set in `self`.
    pub fn has_flag(self, flag: ScriptFlags) -> bool {
        self.0 & flag.0 == flag.0
    }

    /// True when at least one of `flags` is fully set in `self`.
    pub fn has_any(self, flags: &[ScriptFlags]) -> bool {
        flags.iter().any(|f| self.has_flag(*f))
    }

    pub fn add_flag(&mut self, flag: ScriptFlags) {
        self.0 |= flag.0;
    }
}

impl BitOr for ScriptFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        ScriptFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for ScriptFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ScriptFlags {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        ScriptFlags(self.0 & rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_composition() {
        let flags = ScriptFlags::VERIFY_P2SH | ScriptFlags::VERIFY_MINIMAL_DATA;
        assert!(flags.has_flag(ScriptFlags::VERIFY_P2SH));
        assert!(flags.has_flag(ScriptFlags::VERIFY_MINIMAL_DATA));
        assert!(!flags.has_flag(ScriptFlags::VERIFY_LOW_S));

        // has_flag requires every bit of its argument.
        assert!(!ScriptFlags::VERIFY_P2SH.has_flag(flags));
        assert!(flags.has_flag(flags));
    }

    #[test]
    fn test_has_any_and_add() {
        let mut flags = ScriptFlags::NONE;
        assert!(!flags.has_any(&[ScriptFlags::VERIFY_LOW_S, ScriptFlags::VERIFY_NULL_FAIL]));

        flags.add_flag(ScriptFlags::VERIFY_NULL_FAIL);
        assert!(flags.has_any(&[ScriptFlags::VERIFY_LOW_S, ScriptFlags::VERIFY_NULL_FAIL]));

        flags |= ScriptFlags::VERIFY_LOW_S;
        assert!(flags.has_flag(ScriptFlags::VERIFY_LOW_S));
    }

    #[test]
    fn test_every_flag_is_satisfied_by_none() {
        // NONE is the empty requirement, satisfied by anything.
        assert!(ScriptFlags::VERIFY_P2SH.has_flag(ScriptFlags::NONE));
        assert!(ScriptFlags::NONE.has_flag(ScriptFlags::NONE));
    }
}
