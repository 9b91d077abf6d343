//! Fault exception routing and enables.
//!
//! The handlers themselves come from [`fault::bind_fault_handlers!`], invoked
//! in `main.rs`: HardFault, MemManage, BusFault and UsageFault all branch to
//! the stack-free capture routine, which seals the record and resets.
//!
//! Out of reset only HardFault is enabled; the configurable faults escalate
//! to it, which loses the distinction between them in HFSR (FORCED) but not
//! in CFSR. Enabling them here keeps the original exception number in the
//! record. Division by zero and unaligned accesses only fault when their CCR
//! trap bits are set.

/// SHCSR.MEMFAULTENA
pub const SHCSR_MEMFAULTENA: u32 = 1 << 16;
/// SHCSR.BUSFAULTENA
pub const SHCSR_BUSFAULTENA: u32 = 1 << 17;
/// SHCSR.USGFAULTENA
pub const SHCSR_USGFAULTENA: u32 = 1 << 18;
/// CCR.UNALIGN_TRP
pub const CCR_UNALIGN_TRP: u32 = 1 << 3;
/// CCR.DIV_0_TRP
pub const CCR_DIV_0_TRP: u32 = 1 << 4;

/// Which configurable faults and traps to enable at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(clippy::struct_excessive_bools)]
pub struct FaultEnables {
    /// MemManage instead of escalating to HardFault.
    pub mem_manage: bool,
    /// BusFault instead of escalating to HardFault.
    pub bus: bool,
    /// UsageFault instead of escalating to HardFault.
    pub usage: bool,
    /// Trap integer division by zero.
    pub div_0_trp: bool,
    /// Trap unaligned word and halfword accesses.
    pub unalign_trp: bool,
}

impl FaultEnables {
    /// Every configurable fault and the divide-by-zero trap.
    ///
    /// Unaligned accesses stay permitted: compiled code relies on them.
    pub const DEMO: Self = Self {
        mem_manage: true,
        bus: true,
        usage: true,
        div_0_trp: true,
        unalign_trp: false,
    };

    /// Bits to set in SHCSR.
    pub const fn shcsr_bits(self) -> u32 {
        let mut bits = 0;
        if self.mem_manage {
            bits |= SHCSR_MEMFAULTENA;
        }
        if self.bus {
            bits |= SHCSR_BUSFAULTENA;
        }
        if self.usage {
            bits |= SHCSR_USGFAULTENA;
        }
        bits
    }

    /// Bits to set in CCR.
    pub const fn ccr_bits(self) -> u32 {
        let mut bits = 0;
        if self.div_0_trp {
            bits |= CCR_DIV_0_TRP;
        }
        if self.unalign_trp {
            bits |= CCR_UNALIGN_TRP;
        }
        bits
    }
}

#[cfg(feature = "hardware")]
pub mod hardware {
    //! Register writes. Only compiled when targeting real hardware.

    use super::FaultEnables;

    /// Set the SHCSR enable and CCR trap bits selected by `enables`.
    ///
    /// Bits already set are left alone. Call from privileged boot code.
    #[allow(unsafe_code)]
    pub fn apply(enables: FaultEnables) {
        // SAFETY: called once at boot before the executor starts; nothing else
        // holds the Cortex-M peripherals yet.
        let cp = unsafe { cortex_m::Peripherals::steal() };
        // SAFETY: read-modify-write of enable bits only; priorities and
        // pending state in the same registers are preserved.
        unsafe {
            cp.SCB.shcsr.modify(|r| r | enables.shcsr_bits());
            cp.SCB.ccr.modify(|r| r | enables.ccr_bits());
        }
        cortex_m::asm::dsb();
        cortex_m::asm::isb();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_enables_all_configurable_faults() {
        assert_eq!(FaultEnables::DEMO.shcsr_bits(), 0x0007_0000);
    }

    #[test]
    fn demo_traps_division_but_not_alignment() {
        let ccr = FaultEnables::DEMO.ccr_bits();
        assert_eq!(ccr & CCR_DIV_0_TRP, CCR_DIV_0_TRP);
        assert_eq!(ccr & CCR_UNALIGN_TRP, 0);
    }

    #[test]
    fn nothing_enabled_sets_no_bits() {
        let none = FaultEnables {
            mem_manage: false,
            bus: false,
            usage: false,
            div_0_trp: false,
            unalign_trp: false,
        };
        assert_eq!(none.shcsr_bits(), 0);
        assert_eq!(none.ccr_bits(), 0);
    }
}
