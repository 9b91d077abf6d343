//! EXC_RETURN: the link-register value loaded on exception entry.

/// Raw EXC_RETURN value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct ExcReturn(pub u32);

/// Stack pointer the exception frame was pushed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StackPointer {
    /// Main stack pointer.
    Main,
    /// Process stack pointer.
    Process,
}

impl StackPointer {
    /// Short register name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Main => "MSP",
            Self::Process => "PSP",
        }
    }
}

/// Execution mode the exception was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Thread mode.
    Thread,
    /// Handler mode (a nested exception).
    Handler,
}

impl Mode {
    /// Mode name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Thread => "Thread",
            Self::Handler => "Handler",
        }
    }
}

impl ExcReturn {
    const ES: u32 = 1 << 0;
    const SPSEL: u32 = 1 << 2;
    const MODE: u32 = 1 << 3;
    const FTYPE: u32 = 1 << 4;
    const DCRS: u32 = 1 << 5;
    const S: u32 = 1 << 6;

    /// The value carries the EXC_RETURN prefix (0xFF in bits 31:24).
    pub const fn is_exc_return(self) -> bool {
        self.0 >> 24 == 0xFF
    }

    /// Stack the basic frame was pushed to (SPSEL).
    pub const fn stack(self) -> StackPointer {
        if self.0 & Self::SPSEL != 0 {
            StackPointer::Process
        } else {
            StackPointer::Main
        }
    }

    /// Mode the processor was in before the exception (MODE).
    pub const fn mode(self) -> Mode {
        if self.0 & Self::MODE != 0 {
            Mode::Thread
        } else {
            Mode::Handler
        }
    }

    /// A floating-point context was stacked (FTYPE clear).
    pub const fn fp_context_stacked(self) -> bool {
        self.0 & Self::FTYPE == 0
    }

    /// Armv8-M: the frame was pushed to a Secure stack (S).
    pub const fn secure_stack(self) -> bool {
        self.0 & Self::S != 0
    }

    /// Armv8-M: the additional state context precedes the basic frame (DCRS clear).
    pub const fn additional_context_stacked(self) -> bool {
        self.0 & Self::DCRS == 0
    }

    /// Armv8-M: the exception was taken to Secure state (ES).
    pub const fn secure_exception(self) -> bool {
        self.0 & Self::ES != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn armv7m_thread_psp_return() {
        let lr = ExcReturn(0xFFFF_FFFD);
        assert_eq!(lr.stack(), StackPointer::Process);
        assert_eq!(lr.mode(), Mode::Thread);
        assert!(!lr.fp_context_stacked());
    }

    #[test]
    fn armv7m_handler_msp_fp_return() {
        let lr = ExcReturn(0xFFFF_FFE1);
        assert_eq!(lr.stack(), StackPointer::Main);
        assert_eq!(lr.mode(), Mode::Handler);
        assert!(lr.fp_context_stacked());
    }

    #[test]
    fn armv8m_secure_bits() {
        // Secure thread, PSP, default callee stacking.
        let lr = ExcReturn(0xFFFF_FFFD);
        assert!(lr.secure_stack());
        assert!(!lr.additional_context_stacked());
        assert!(lr.secure_exception());

        // Non-secure thread, MSP, additional context stacked.
        let lr = ExcReturn(0xFFFF_FF88);
        assert!(!lr.secure_stack());
        assert!(lr.additional_context_stacked());
        assert_eq!(lr.stack(), StackPointer::Main);
    }

    #[test]
    fn prefix_distinguishes_exc_return_from_zero() {
        assert!(ExcReturn(0xFFFF_FFF9).is_exc_return());
        assert!(!ExcReturn(0).is_exc_return());
        assert!(!ExcReturn(0x0800_1235).is_exc_return());
    }
}
