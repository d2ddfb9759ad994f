//! The execution thread that drives a script run from unlocking
//! script through locking script and, for P2SH, the redeem pass.

use crate::opcodes::*;
use crate::Script;

use super::config::Config;
use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;
use super::ops_crypto::HashType;
use super::ops_flow::OP_COND_TRUE;
use super::parsed_opcode::*;
use super::scriptnum::*;
use super::stack::*;
use super::SignatureChecker;

/// One script execution in progress.
///
/// The thread owns both stacks, the parsed scripts, and all the
/// per-run counters. The opcode handlers live in the `ops_*` sibling
/// modules as further `impl Thread` blocks.
pub struct Thread<'a> {
    /// Main data stack.
    pub dstack: Stack,
    /// Alt stack for OP_TOALTSTACK / OP_FROMALTSTACK.
    pub astack: Stack,
    /// One entry per open conditional: has its OP_ELSE been seen yet.
    pub else_stack: BoolStack,
    /// Resource limits for this run.
    pub cfg: Config,
    /// Width cap in bytes for numbers popped off the stack.
    pub max_script_number_length: usize,
    /// Unlocking script, locking script, and (for P2SH) the redeem
    /// script appended mid-run.
    pub scripts: Vec<ParsedScript>,
    /// Conditional branch states for nested IF/ELSE blocks.
    pub cond_stack: Vec<i32>,
    /// Data stack snapshot taken after the unlocking script; the
    /// redeem script is recovered from its top.
    pub saved_first_stack: Vec<Vec<u8>>,
    /// Which script is executing.
    pub script_idx: usize,
    /// Offset of the current opcode within that script.
    pub script_off: usize,
    /// Offset just past the most recent OP_CODESEPARATOR.
    pub last_code_sep: usize,
    /// Non-push opcodes executed so far in the current script.
    pub num_ops: usize,
    /// Active verification flags.
    pub flags: ScriptFlags,
    /// Whether this run gets a P2SH redeem pass.
    pub p2sh: bool,
    /// Checker for the signature and lock-time opcodes.
    pub checker: Option<&'a dyn SignatureChecker>,
}

impl<'a> Thread<'a> {
    /// Set up a run over an unlocking/locking script pair.
    ///
    /// Normalizes the flag set, validates script sizes and push-only
    /// requirements, and parses both scripts up front.
    pub fn new(
        unlocking_script: &Script,
        locking_script: &Script,
        flags: ScriptFlags,
        checker: Option<&'a dyn SignatureChecker>,
    ) -> Result<Self, InterpreterError> {
        let cfg = Config::default();

        let mut flags = flags;
        // ForkID signing only makes sense with strict encoding checks.
        if flags.has_flag(ScriptFlags::ENABLE_SIGHASH_FORKID) {
            flags.add_flag(ScriptFlags::VERIFY_STRICT_ENCODING);
        }
        // Clean-stack is only meaningful once P2SH is in force.
        if flags.has_flag(ScriptFlags::VERIFY_CLEAN_STACK) && !flags.has_flag(ScriptFlags::VERIFY_P2SH)
        {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidFlags,
                "invalid scriptflag combination".to_string(),
            ));
        }

        for (script, which) in [(unlocking_script, "unlocking"), (locking_script, "locking")] {
            if script.len() > cfg.max_script_size {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::ScriptTooBig,
                    format!(
                        "{} script size {} is larger than the max allowed size {}",
                        which,
                        script.len(),
                        cfg.max_script_size
                    ),
                ));
            }
        }

        // Nothing to execute evaluates false.
        if unlocking_script.is_empty() && locking_script.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EvalFalse,
                "false stack entry at end of script execution".to_string(),
            ));
        }

        // Without a checker, any checksig opcode fails at parse time.
        let error_on_checksig = checker.is_none();
        let uscript = parse_script(unlocking_script, error_on_checksig)?;
        let lscript = parse_script(locking_script, error_on_checksig)?;

        if flags.has_flag(ScriptFlags::VERIFY_SIG_PUSH_ONLY) && !is_push_only(&uscript) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NotPushOnly,
                "signature script is not push only".to_string(),
            ));
        }

        let p2sh = flags.has_flag(ScriptFlags::VERIFY_P2SH) && locking_script.is_p2sh();
        if p2sh && !is_push_only(&uscript) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NotPushOnly,
                "pay to script hash is not push only".to_string(),
            ));
        }

        let verify_minimal_data = flags.has_flag(ScriptFlags::VERIFY_MINIMAL_DATA);
        let max_num_len = Config::max_script_number_length(flags);

        Ok(Thread {
            dstack: Stack::new(max_num_len, verify_minimal_data),
            astack: Stack::new(max_num_len, verify_minimal_data),
            else_stack: BoolStack::new(),
            cfg,
            max_script_number_length: max_num_len,
            scripts: vec![uscript, lscript],
            cond_stack: Vec::new(),
            saved_first_stack: Vec::new(),
            // An empty unlocking script is skipped outright.
            script_idx: usize::from(unlocking_script.is_empty()),
            script_off: 0,
            last_code_sep: 0,
            num_ops: 0,
            flags,
            p2sh,
            checker,
        })
    }

    pub fn has_flag(&self, flag: ScriptFlags) -> bool {
        self.flags.has_flag(flag)
    }

    pub fn has_any(&self, flags: &[ScriptFlags]) -> bool {
        self.flags.has_any(flags)
    }

    /// True outside any conditional, or when the innermost open
    /// conditional has taken its branch.
    pub fn is_branch_executing(&self) -> bool {
        match self.cond_stack.last() {
            None => true,
            Some(state) => *state == OP_COND_TRUE,
        }
    }

    /// Run every script to completion and apply the final stack check.
    pub fn execute(&mut self) -> Result<(), InterpreterError> {
        while !self.step()? {}
        self.check_error_condition(true)
    }

    /// Execute a single opcode. Returns true once the run is finished.
    pub fn step(&mut self) -> Result<bool, InterpreterError> {
        let pop = self.fetch_opcode()?.clone();
        self.execute_opcode(&pop)?;
        self.script_off += 1;

        let combined = self.dstack.depth() + self.astack.depth();
        if combined > self.cfg.max_stack_size as i32 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::StackOverflow,
                format!(
                    "combined stack size {} > max allowed {}",
                    combined, self.cfg.max_stack_size
                ),
            ));
        }

        if self.script_off < self.scripts[self.script_idx].len() {
            return Ok(false);
        }
        self.finish_script()
    }

    fn fetch_opcode(&self) -> Result<&ParsedOpcode, InterpreterError> {
        let past_the_end = |have: String| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidProgramCounter,
                format!(
                    "past input scripts {}:{} {}",
                    self.script_idx, self.script_off, have
                ),
            )
        };
        let script = self
            .scripts
            .get(self.script_idx)
            .ok_or_else(|| past_the_end(format!("{}:xxxx", self.scripts.len())))?;
        script
            .get(self.script_off)
            .ok_or_else(|| past_the_end(format!("{}:{:04}", self.script_idx, script.len())))
    }

    /// Transition past the end of the current script. Returns true when
    /// there is nothing left to run.
    fn finish_script(&mut self) -> Result<bool, InterpreterError> {
        if !self.cond_stack.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnbalancedConditional,
                "end of script reached in conditional execution".to_string(),
            ));
        }

        // The alt stack does not survive across scripts.
        self.astack.clear();

        self.num_ops = 0;
        self.script_off = 0;
        self.script_idx += 1;

        if self.p2sh && self.script_idx == 1 {
            self.saved_first_stack = self.dstack.get_stack();
        } else if self.p2sh && self.script_idx == 2 {
            // The locking script must have succeeded on its own before
            // the redeem pass starts.
            self.check_error_condition(false)?;

            let redeem_bytes = self.saved_first_stack.last().cloned().unwrap_or_default();
            let redeem = parse_script(&Script::from_bytes(redeem_bytes), false)?;
            self.scripts.push(redeem);

            // Execution resumes on the saved stack minus the redeem
            // script itself.
            let keep = self.saved_first_stack.len().saturating_sub(1);
            self.dstack.set_stack(self.saved_first_stack[..keep].to_vec());
        }

        // An empty next script is skipped rather than entered.
        if self
            .scripts
            .get(self.script_idx)
            .is_some_and(|s| s.is_empty())
        {
            self.script_idx += 1;
        }

        self.last_code_sep = 0;
        Ok(self.script_idx >= self.scripts.len())
    }

    /// The end-of-script stack check: non-empty, truthy top, and (for
    /// the final script under CLEAN_STACK) exactly one element.
    fn check_error_condition(&mut self, final_script: bool) -> Result<(), InterpreterError> {
        if self.dstack.depth() < 1 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EmptyStack,
                "stack empty at end of script execution".to_string(),
            ));
        }

        if final_script
            && self.has_flag(ScriptFlags::VERIFY_CLEAN_STACK)
            && self.dstack.depth() != 1
        {
            return Err(InterpreterError::new(
                InterpreterErrorCode::CleanStack,
                format!("stack contains {} unexpected items", self.dstack.depth() - 1),
            ));
        }

        if !self.dstack.pop_bool()? {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EvalFalse,
                "false stack entry at end of script execution".to_string(),
            ));
        }
        Ok(())
    }

    /// Pre-dispatch checks shared by every opcode, then dispatch.
    fn execute_opcode(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        if pop.data.len() > self.cfg.max_script_element_size {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ElementTooBig,
                format!(
                    "element size {} exceeds max allowed size {}",
                    pop.data.len(),
                    self.cfg.max_script_element_size
                ),
            ));
        }

        // Disabled opcodes and ungated extended opcodes fail even in a
        // skipped branch.
        if pop.is_disabled()
            || (pop.is_extended() && !self.has_flag(ScriptFlags::ENABLE_EXTENDED_OPCODES))
        {
            return Err(InterpreterError::new(
                InterpreterErrorCode::DisabledOpcode,
                format!("attempt to execute disabled opcode {}", pop.name()),
            ));
        }
        if pop.always_illegal() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ReservedOpcode,
                format!("attempt to execute reserved opcode {}", pop.name()),
            ));
        }

        // Everything above OP_16 counts against the operation budget.
        if pop.opcode > OP_16 {
            self.num_ops += 1;
            if self.num_ops > self.cfg.max_ops {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::TooManyOperations,
                    format!("exceeded max operation limit of {}", self.cfg.max_ops),
                ));
            }
        }

        if !self.is_branch_executing() && !pop.is_conditional() {
            return Ok(());
        }

        if self.dstack.verify_minimal_data
            && self.is_branch_executing()
            && pop.opcode <= OP_PUSHDATA4
        {
            pop.enforce_minimum_data_push()?;
        }

        self.dispatch_opcode(pop)
    }

    fn dispatch_opcode(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        // Everything up to PUSHDATA4 just pushes its payload; OP_FALSE
        // carries an empty one.
        if pop.opcode <= OP_PUSHDATA4 {
            self.dstack.push_byte_array(pop.data.clone());
            return Ok(());
        }

        match pop.opcode {
            OP_1NEGATE => {
                self.dstack.push_int(&ScriptNumber::new(-1));
                Ok(())
            }
            op if (OP_1..=OP_16).contains(&op) => {
                self.dstack.push_byte_array(vec![op - (OP_1 - 1)]);
                Ok(())
            }
            OP_RESERVED | OP_VER | OP_RESERVED1 | OP_RESERVED2 => self.op_reserved(pop),

            OP_NOP => Ok(()),
            OP_IF => self.op_if(),
            OP_NOTIF => self.op_notif(),
            OP_ELSE => self.op_else(pop),
            OP_ENDIF => self.op_endif(pop),
            OP_VERIFY => self.op_verify(pop),
            OP_RETURN => self.op_return(),
            OP_CHECKLOCKTIMEVERIFY => self.op_check_locktime_verify(),
            OP_CHECKSEQUENCEVERIFY => self.op_check_sequence_verify(),

            // Stack shuffling
            OP_TOALTSTACK => self.op_to_alt_stack(),
            OP_FROMALTSTACK => self.op_from_alt_stack(),
            OP_2DROP => self.dstack.drop_n(2),
            OP_2DUP => self.dstack.dup_n(2),
            OP_3DUP => self.dstack.dup_n(3),
            OP_2OVER => self.dstack.over_n(2),
            OP_2ROT => self.dstack.rot_n(2),
            OP_2SWAP => self.dstack.swap_n(2),
            OP_IFDUP => self.op_ifdup(),
            OP_DEPTH => {
                let depth = self.dstack.depth();
                self.dstack.push_int(&ScriptNumber::new(depth as i64));
                Ok(())
            }
            OP_DROP => self.dstack.drop_n(1),
            OP_DUP => self.dstack.dup_n(1),
            OP_NIP => self.dstack.nip_n_discard(1),
            OP_OVER => self.dstack.over_n(1),
            OP_PICK => self.op_pick(),
            OP_ROLL => self.op_roll(),
            OP_ROT => self.dstack.rot_n(1),
            OP_SWAP => self.dstack.swap_n(1),
            OP_TUCK => self.dstack.tuck(),

            // Byte-array manipulation
            OP_CAT => self.op_cat(),
            OP_SPLIT => self.op_split(),
            OP_NUM2BIN => self.op_num2bin(),
            OP_BIN2NUM => self.op_bin2num(),
            OP_SIZE => self.op_size(),
            OP_INVERT => self.op_invert(),
            OP_AND => self.op_bitwise(|a, b| a & b),
            OP_OR => self.op_bitwise(|a, b| a | b),
            OP_XOR => self.op_bitwise(|a, b| a ^ b),
            OP_EQUAL => self.op_equal(),
            OP_EQUALVERIFY => self.op_equalverify(pop),

            // Arithmetic
            OP_1ADD => self.op_unary_int(|m| {
                m.incr();
            }),
            OP_1SUB => self.op_unary_int(|m| {
                m.decr();
            }),
            OP_NEGATE => self.op_unary_int(|m| {
                m.neg();
            }),
            OP_ABS => self.op_unary_int(|m| {
                m.abs();
            }),
            OP_NOT => self.op_not(),
            OP_0NOTEQUAL => self.op_0notequal(),
            OP_ADD => self.op_add(),
            OP_SUB => self.op_sub(),
            OP_MUL => self.op_mul(),
            OP_DIV => self.op_div(),
            OP_MOD => self.op_mod(),
            OP_LSHIFT => self.op_lshift(),
            OP_RSHIFT => self.op_rshift(),
            OP_BOOLAND => self.op_bool_binop(|a, b| !a.is_zero() && !b.is_zero()),
            OP_BOOLOR => self.op_bool_binop(|a, b| !a.is_zero() || !b.is_zero()),
            OP_NUMEQUAL => self.op_bool_binop(|a, b| a.equal(b)),
            OP_NUMEQUALVERIFY => self.op_numequalverify(pop),
            OP_NUMNOTEQUAL => self.op_bool_binop(|a, b| !a.equal(b)),
            OP_LESSTHAN => self.op_bool_binop(|a, b| a.less_than(b)),
            OP_GREATERTHAN => self.op_bool_binop(|a, b| a.greater_than(b)),
            OP_LESSTHANOREQUAL => self.op_bool_binop(|a, b| a.less_than_or_equal(b)),
            OP_GREATERTHANOREQUAL => self.op_bool_binop(|a, b| a.greater_than_or_equal(b)),
            OP_MIN => self.op_min(),
            OP_MAX => self.op_max(),
            OP_WITHIN => self.op_within(),

            // Crypto
            OP_RIPEMD160 => self.op_hash(HashType::Ripemd160),
            OP_SHA1 => self.op_hash(HashType::Sha1),
            OP_SHA256 => self.op_hash(HashType::Sha256),
            OP_HASH160 => self.op_hash(HashType::Hash160),
            OP_HASH256 => self.op_hash(HashType::Hash256),
            OP_CODESEPARATOR => {
                self.last_code_sep = self.script_off;
                Ok(())
            }
            OP_CHECKSIG => self.op_checksig(),
            OP_CHECKSIGVERIFY => self.op_checksigverify(pop),
            OP_CHECKMULTISIG => self.op_checkmultisig(),
            OP_CHECKMULTISIGVERIFY => self.op_checkmultisigverify(pop),

            OP_NOP1 | OP_NOP4 | OP_NOP5 | OP_NOP6 | OP_NOP7 | OP_NOP8 | OP_NOP9 | OP_NOP10 => {
                if self.has_flag(ScriptFlags::DISCOURAGE_UPGRADABLE_NOPS) {
                    return Err(InterpreterError::new(
                        InterpreterErrorCode::DiscourageUpgradableNOPs,
                        format!(
                            "OP_NOP{} reserved for soft-fork upgrades",
                            pop.opcode - (OP_NOP1 - 1)
                        ),
                    ));
                }
                Ok(())
            }

            _ => Err(InterpreterError::new(
                InterpreterErrorCode::ReservedOpcode,
                format!("attempt to execute invalid opcode {}", pop.name()),
            )),
        }
    }
}
