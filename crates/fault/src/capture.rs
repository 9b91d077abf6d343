//! Capture engine: the `FaultCapture` routine and the default `FaultExit`.
//!
//! `FaultCapture` is entered from a fault exception with LR still holding
//! EXC_RETURN and SP untouched. It never uses the stack: the stack may be the
//! reason for the fault. Only R0-R7 are used as scratch (Thumb-1 encodings
//! throughout, so the same text assembles for Armv6-M and Armv8-M Baseline);
//! live R4-R7 are saved to the record before they are touched and reloaded
//! before the exit branch.
//!
//! Register roles inside the routine:
//!
//! | reg | role |
//! |-----|------|
//! | r0  | record base |
//! | r6  | stack pointer the frame was pushed to (then scratch) |
//! | r7  | bit 0: use Non-secure aliases |
//!
//! Store order is the contract with [`FaultRecord::is_valid`]: count and info
//! first, then every optional section with its content flag, the checksum,
//! and the magic number strictly last, followed by `dsb`.
//!
//! [`emulate`](crate::emulate) is the host model of the same sequence.
//!
//! [`FaultRecord::is_valid`]: crate::FaultRecord::is_valid

use core::arch::global_asm;

use crate::info::Content;
use crate::layout::{self, scb};
use crate::storage::FAULT_RECORD;
use crate::variant::Variant;

/// `ldr $reg, =SCB base`, switching to the Non-secure alias when r7 bit 0 is
/// set. Clobbers r3. `$label` must be unique.
#[cfg(feature = "secure")]
macro_rules! load_scb {
    ($reg:literal, $label:literal) => {
        concat!(
            "    ldr   ", $reg, ", =FC_SCB_BASE\n",
            "    lsrs  r3, r7, #1\n",
            "    bcc   ", $label, "\n",
            "    ldr   ", $reg, ", =FC_SCB_BASE_NS\n",
            $label, ":\n",
        )
    };
}

#[cfg(not(feature = "secure"))]
macro_rules! load_scb {
    ($reg:literal, $label:literal) => {
        concat!("    ldr   ", $reg, ", =FC_SCB_BASE\n")
    };
}

/// `info |= $flag`. Clobbers r1, r3.
macro_rules! set_info {
    ($flag:literal) => {
        concat!(
            "    ldr   r1, [r0, #FC_OFS_INFO]\n",
            "    ldr   r3, =", $flag, "\n",
            "    orrs  r1, r3\n",
            "    str   r1, [r0, #FC_OFS_INFO]\n",
        )
    };
}

// Secure image: a frame on a Non-secure stack (EXC_RETURN.S == 0) is read
// through the _NS aliases; otherwise the fault was taken in Secure state.
#[cfg(feature = "secure")]
macro_rules! select_bank {
    () => {
        concat!(
            "    mov   r2, lr\n",
            "    lsrs  r2, r2, #7\n",
            "    bcs   .Lfc_secure_stack\n",
            "    movs  r7, #1\n",
            "    mov   r2, lr\n",
            "    lsrs  r2, r2, #3\n",
            "    bcs   .Lfc_psp_ns\n",
            "    mrs   r6, msp_ns\n",
            "    b     .Lfc_sp_done\n",
            ".Lfc_psp_ns:\n",
            "    mrs   r6, psp_ns\n",
            "    b     .Lfc_sp_done\n",
            ".Lfc_secure_stack:\n",
            set_info!("FC_TZ_FAULT_MODE"),
        )
    };
}

#[cfg(not(feature = "secure"))]
macro_rules! select_bank {
    () => {
        ""
    };
}

#[cfg(fault_regs)]
macro_rules! check_stacking_error {
    () => {
        concat!(
            load_scb!("r4", ".Lfc_scb_check"),
            "    ldr   r5, [r4, #FC_SCB_CFSR]\n",
            "    ldr   r3, =FC_STACKING_ERROR_MASK\n",
            "    tst   r5, r3\n",
            "    bne   .Lfc_context_done\n",
        )
    };
}

#[cfg(not(fault_regs))]
macro_rules! check_stacking_error {
    () => {
        ""
    };
}

// Additional state context: signature, reserved, R4..R11. Copied only when the
// signature is intact; skipped otherwise.
#[cfg(armv8)]
macro_rules! additional_context {
    () => {
        concat!(
            "    mov   r2, lr\n",
            "    lsrs  r2, r2, #6\n",
            "    bcs   .Lfc_basic_frame\n",
            "    ldr   r4, [r6]\n",
            "    ldr   r3, =FC_INTEGRITY_SIGNATURE\n",
            "    cmp   r4, r3\n",
            "    bne   .Lfc_skip_additional\n",
            "    str   r4, [r0, #FC_OFS_INTEGRITY_SIGNATURE]\n",
            "    adds  r6, #8\n",
            "    movs  r1, r0\n",
            "    adds  r1, #FC_OFS_R4\n",
            "    ldm   r6!, {{r2-r5}}\n",
            "    stm   r1!, {{r2-r5}}\n",
            "    ldm   r6!, {{r2-r5}}\n",
            "    stm   r1!, {{r2-r5}}\n",
            "    b     .Lfc_basic_frame\n",
            ".Lfc_skip_additional:\n",
            "    adds  r6, #40\n",
            ".Lfc_basic_frame:\n",
        )
    };
}

#[cfg(not(armv8))]
macro_rules! additional_context {
    () => {
        ""
    };
}

#[cfg(feature = "secure")]
macro_rules! stack_pointers {
    () => {
        concat!(
            "    lsrs  r1, r7, #1\n",
            "    bcc   .Lfc_sps\n",
            "    mrs   r4, msp_ns\n",
            "    mrs   r5, psp_ns\n",
            "    b     .Lfc_sps_done\n",
            ".Lfc_sps:\n",
            "    mrs   r4, msp\n",
            "    mrs   r5, psp\n",
            ".Lfc_sps_done:\n",
        )
    };
}

#[cfg(not(feature = "secure"))]
macro_rules! stack_pointers {
    () => {
        concat!("    mrs   r4, msp\n", "    mrs   r5, psp\n")
    };
}

// r1 points at MSPLIM on entry.
#[cfg(all(armv8, feature = "secure", armv8m_main))]
macro_rules! stack_limits {
    () => {
        concat!(
            "    lsrs  r3, r7, #1\n",
            "    bcc   .Lfc_splim\n",
            "    mrs   r2, msplim_ns\n",
            "    mrs   r3, psplim_ns\n",
            "    b     .Lfc_splim_store\n",
            ".Lfc_splim:\n",
            "    mrs   r2, msplim\n",
            "    mrs   r3, psplim\n",
            ".Lfc_splim_store:\n",
            "    stm   r1!, {{r2, r3}}\n",
            set_info!("FC_LIMIT_REGS"),
        )
    };
}

// Baseline has no MSPLIM_NS/PSPLIM_NS.
#[cfg(all(armv8, feature = "secure", not(armv8m_main)))]
macro_rules! stack_limits {
    () => {
        concat!(
            "    lsrs  r3, r7, #1\n",
            "    bcs   .Lfc_splim_done\n",
            "    mrs   r2, msplim\n",
            "    mrs   r3, psplim\n",
            "    stm   r1!, {{r2, r3}}\n",
            set_info!("FC_LIMIT_REGS"),
            ".Lfc_splim_done:\n",
        )
    };
}

#[cfg(all(armv8, not(feature = "secure")))]
macro_rules! stack_limits {
    () => {
        concat!(
            "    mrs   r2, msplim\n",
            "    mrs   r3, psplim\n",
            "    stm   r1!, {{r2, r3}}\n",
            set_info!("FC_LIMIT_REGS"),
        )
    };
}

#[cfg(not(armv8))]
macro_rules! stack_limits {
    () => {
        ""
    };
}

#[cfg(all(fault_regs, feature = "armv8_1m"))]
macro_rules! ras_register {
    () => {
        concat!(
            "    ldr   r2, [r4, #FC_SCB_RFSR]\n",
            "    str   r2, [r0, #FC_OFS_RFSR]\n",
            set_info!("FC_RAS_FAULT_REG"),
        )
    };
}

#[cfg(not(all(fault_regs, feature = "armv8_1m")))]
macro_rules! ras_register {
    () => {
        ""
    };
}

// SFSR/SFAR exist in the Secure SCB only.
#[cfg(all(fault_regs, armv8m_main, feature = "secure"))]
macro_rules! secure_fault_registers {
    () => {
        concat!(
            "    ldr   r4, =FC_SCB_BASE\n",
            "    ldr   r2, [r4, #FC_SCB_SFSR]\n",
            "    ldr   r3, [r4, #FC_SCB_SFAR]\n",
            "    str   r2, [r0, #FC_OFS_SFSR]\n",
            "    str   r3, [r0, #FC_OFS_SFAR]\n",
            set_info!("FC_SECURE_FAULT_REGS"),
        )
    };
}

#[cfg(not(all(fault_regs, armv8m_main, feature = "secure")))]
macro_rules! secure_fault_registers {
    () => {
        ""
    };
}

// r4 stays the selected SCB base through the RAS read.
#[cfg(fault_regs)]
macro_rules! fault_registers {
    () => {
        concat!(
            load_scb!("r4", ".Lfc_scb_regs"),
            "    ldr   r2, [r4, #FC_SCB_CFSR]\n",
            "    ldr   r3, [r4, #FC_SCB_HFSR]\n",
            "    ldr   r5, [r4, #FC_SCB_DFSR]\n",
            "    ldr   r6, [r4, #FC_SCB_MMFAR]\n",
            "    movs  r1, r0\n",
            "    adds  r1, #FC_OFS_CFSR\n",
            "    stm   r1!, {{r2, r3, r5, r6}}\n",
            "    ldr   r2, [r4, #FC_SCB_BFAR]\n",
            "    ldr   r3, [r4, #FC_SCB_AFSR]\n",
            "    stm   r1!, {{r2, r3}}\n",
            set_info!("FC_FAULT_REGS"),
            ras_register!(),
            secure_fault_registers!(),
        )
    };
}

#[cfg(not(fault_regs))]
macro_rules! fault_registers {
    () => {
        ""
    };
}

// The saved R4..R11 came from the additional state context: do not hand them
// on to the exit policy.
#[cfg(armv8)]
macro_rules! scrub_callee_saved {
    () => {
        concat!(
            "    ldr   r1, [r0, #FC_OFS_INTEGRITY_SIGNATURE]\n",
            "    ldr   r2, =FC_INTEGRITY_SIGNATURE\n",
            "    cmp   r1, r2\n",
            "    bne   .Lfc_exit\n",
            "    movs  r4, #0\n",
            "    movs  r5, #0\n",
            "    movs  r6, #0\n",
            "    movs  r7, #0\n",
            ".Lfc_exit:\n",
        )
    };
}

#[cfg(not(armv8))]
macro_rules! scrub_callee_saved {
    () => {
        ""
    };
}

// PRIGROUP is only implemented where the fault registers are.
#[cfg(fault_regs)]
macro_rules! keep_prigroup {
    () => {
        concat!(
            "    ldr   r2, =FC_AIRCR_PRIGROUP_MASK\n",
            "    ldr   r3, [r0]\n",
            "    ands  r3, r2\n",
            "    orrs  r1, r3\n",
        )
    };
}

#[cfg(not(fault_regs))]
macro_rules! keep_prigroup {
    () => {
        ""
    };
}

global_asm!(
    ".syntax unified",
    ".thumb",
    ".equ FC_OFS_MAGIC_NUMBER, {ofs_magic}",
    ".equ FC_OFS_CRC32, {ofs_crc}",
    ".equ FC_OFS_COUNT, {ofs_count}",
    ".equ FC_OFS_INFO, {ofs_info}",
    ".equ FC_OFS_R0, {ofs_r0}",
    ".equ FC_OFS_R4, {ofs_r4}",
    ".equ FC_OFS_R12, {ofs_r12}",
    ".equ FC_OFS_INTEGRITY_SIGNATURE, {ofs_sig}",
    ".equ FC_OFS_EXC_XPSR, {ofs_exc_xpsr}",
    ".equ FC_OFS_CFSR, {ofs_cfsr}",
    ".equ FC_OFS_SFSR, {ofs_sfsr}",
    ".equ FC_OFS_SFAR, {ofs_sfar}",
    ".equ FC_OFS_RFSR, {ofs_rfsr}",
    ".equ FC_RECORD_SIZE, {record_size}",
    ".equ FC_CHECKSUM_LEN, {checksum_len}",
    ".equ FC_MAGIC_NUMBER, {magic}",
    ".equ FC_CRC32_INIT, {crc_init}",
    ".equ FC_CRC32_POLYNOMIAL, {crc_poly}",
    ".equ FC_INTEGRITY_SIGNATURE, {signature}",
    ".equ FC_INFO_INITIAL, {info_initial}",
    ".equ FC_TZ_FAULT_MODE, {tz_fault_mode}",
    ".equ FC_STATE_CONTEXT, {state_context}",
    ".equ FC_LIMIT_REGS, {limit_regs}",
    ".equ FC_FAULT_REGS, {fault_regs}",
    ".equ FC_SECURE_FAULT_REGS, {secure_fault_regs}",
    ".equ FC_RAS_FAULT_REG, {ras_fault_reg}",
    ".equ FC_STACKING_ERROR_MASK, {stacking_error_mask}",
    ".equ FC_SCB_BASE, {scb_base}",
    ".equ FC_SCB_BASE_NS, {scb_base_ns}",
    ".equ FC_SCB_CFSR, {scb_cfsr}",
    ".equ FC_SCB_HFSR, {scb_hfsr}",
    ".equ FC_SCB_DFSR, {scb_dfsr}",
    ".equ FC_SCB_MMFAR, {scb_mmfar}",
    ".equ FC_SCB_BFAR, {scb_bfar}",
    ".equ FC_SCB_AFSR, {scb_afsr}",
    ".equ FC_SCB_SFSR, {scb_sfsr}",
    ".equ FC_SCB_SFAR, {scb_sfar}",
    ".equ FC_SCB_RFSR, {scb_rfsr}",
    ".equ FC_AIRCR, {aircr}",
    ".equ FC_AIRCR_RESET, {aircr_reset}",
    ".equ FC_AIRCR_PRIGROUP_MASK, {aircr_prigroup}",
    "",
    ".pushsection .text.FaultCapture, \"ax\", %progbits",
    ".global FaultCapture",
    ".type FaultCapture, %function",
    ".thumb_func",
    "FaultCapture:",
    // Keep the count, zero the record, write count + 1 and the static info.
    "    ldr   r0, ={record}",
    "    ldr   r1, [r0, #FC_OFS_COUNT]",
    "    movs  r2, #0",
    "    movs  r3, #FC_RECORD_SIZE",
    ".Lfc_zero:",
    "    subs  r3, #4",
    "    str   r2, [r0, r3]",
    "    bne   .Lfc_zero",
    "    adds  r1, #1",
    "    str   r1, [r0, #FC_OFS_COUNT]",
    "    ldr   r1, =FC_INFO_INITIAL",
    "    str   r1, [r0, #FC_OFS_INFO]",
    // Live R4..R11.
    "    movs  r1, r0",
    "    adds  r1, #FC_OFS_R4",
    "    stm   r1!, {{r4-r7}}",
    "    mov   r4, r8",
    "    mov   r5, r9",
    "    mov   r6, r10",
    "    mov   r7, r11",
    "    stm   r1!, {{r4-r7}}",
    // r6 = stack the frame was pushed to.
    "    movs  r7, #0",
    select_bank!(),
    "    mov   r2, lr",
    "    lsrs  r2, r2, #3",
    "    bcs   .Lfc_psp",
    "    mrs   r6, msp",
    "    b     .Lfc_sp_done",
    ".Lfc_psp:",
    "    mrs   r6, psp",
    ".Lfc_sp_done:",
    // State context, unless the stack pointer is null or stacking faulted.
    "    cmp   r6, #0",
    "    beq   .Lfc_context_done",
    check_stacking_error!(),
    additional_context!(),
    "    movs  r1, r0",
    "    adds  r1, #FC_OFS_R0",
    "    ldm   r6!, {{r2-r5}}",
    "    stm   r1!, {{r2-r5}}",
    "    movs  r1, r0",
    "    adds  r1, #FC_OFS_R12",
    "    ldm   r6!, {{r2-r5}}",
    "    stm   r1!, {{r2-r5}}",
    set_info!("FC_STATE_CONTEXT"),
    ".Lfc_context_done:",
    // EXC_xPSR, EXC_RETURN, MSP, PSP; r1 ends at MSPLIM.
    "    mrs   r2, xpsr",
    "    mov   r3, lr",
    stack_pointers!(),
    "    movs  r1, r0",
    "    adds  r1, #FC_OFS_EXC_XPSR",
    "    stm   r1!, {{r2-r5}}",
    stack_limits!(),
    fault_registers!(),
    // CRC-32 over count..end, MSB first.
    "    movs  r1, r0",
    "    adds  r1, #FC_OFS_COUNT",
    "    movs  r2, #FC_CHECKSUM_LEN",
    "    ldr   r3, =FC_CRC32_POLYNOMIAL",
    "    ldr   r6, =FC_CRC32_INIT",
    ".Lfc_crc_byte:",
    "    ldrb  r5, [r1]",
    "    lsls  r5, r5, #24",
    "    eors  r6, r5",
    "    movs  r4, #8",
    ".Lfc_crc_bit:",
    "    lsls  r6, r6, #1",
    "    bcc   .Lfc_crc_next",
    "    eors  r6, r3",
    ".Lfc_crc_next:",
    "    subs  r4, #1",
    "    bne   .Lfc_crc_bit",
    "    adds  r1, #1",
    "    subs  r2, #1",
    "    bne   .Lfc_crc_byte",
    "    str   r6, [r0, #FC_OFS_CRC32]",
    // Seal.
    "    ldr   r1, =FC_MAGIC_NUMBER",
    "    str   r1, [r0, #FC_OFS_MAGIC_NUMBER]",
    "    dsb",
    "    movs  r1, r0",
    "    adds  r1, #FC_OFS_R4",
    "    ldm   r1!, {{r4-r7}}",
    scrub_callee_saved!(),
    "    ldr   r0, =FaultExit",
    "    bx    r0",
    "    .ltorg",
    ".size FaultCapture, . - FaultCapture",
    ".popsection",
    "",
    // Default exit policy: system reset. Weak, so a strong `FaultExit`
    // anywhere in the image replaces it.
    ".pushsection .text.FaultExit, \"ax\", %progbits",
    ".weak FaultExit",
    ".type FaultExit, %function",
    ".thumb_func",
    "FaultExit:",
    "    dsb",
    "    ldr   r0, =FC_AIRCR",
    "    ldr   r1, =FC_AIRCR_RESET",
    keep_prigroup!(),
    "    str   r1, [r0]",
    "    dsb",
    ".Lfe_spin:",
    "    b     .Lfe_spin",
    "    .ltorg",
    ".size FaultExit, . - FaultExit",
    ".popsection",
    record = sym FAULT_RECORD,
    ofs_magic = const layout::OFS_MAGIC_NUMBER,
    ofs_crc = const layout::OFS_CRC32,
    ofs_count = const layout::OFS_COUNT,
    ofs_info = const layout::OFS_INFO,
    ofs_r0 = const layout::OFS_R0,
    ofs_r4 = const layout::OFS_R4,
    ofs_r12 = const layout::OFS_R12,
    ofs_sig = const layout::OFS_INTEGRITY_SIGNATURE,
    ofs_exc_xpsr = const layout::OFS_EXC_XPSR,
    ofs_cfsr = const layout::OFS_CFSR,
    ofs_sfsr = const layout::OFS_SFSR,
    ofs_sfar = const layout::OFS_SFAR,
    ofs_rfsr = const layout::OFS_RFSR,
    record_size = const layout::RECORD_SIZE,
    checksum_len = const layout::CHECKSUM_LEN,
    magic = const layout::MAGIC_NUMBER,
    crc_init = const layout::CRC32_INIT,
    crc_poly = const layout::CRC32_POLYNOMIAL,
    signature = const layout::INTEGRITY_SIGNATURE,
    info_initial = const Variant::TARGET.initial_info().0,
    tz_fault_mode = const Content::TZ_FAULT_MODE.bits(),
    state_context = const Content::STATE_CONTEXT.bits(),
    limit_regs = const Content::LIMIT_REGS.bits(),
    fault_regs = const Content::FAULT_REGS.bits(),
    secure_fault_regs = const Content::SECURE_FAULT_REGS.bits(),
    ras_fault_reg = const Content::RAS_FAULT_REG.bits(),
    stacking_error_mask = const Variant::TARGET.stacking_error_mask(),
    scb_base = const scb::BASE,
    scb_base_ns = const scb::BASE_NS,
    scb_cfsr = const scb::CFSR,
    scb_hfsr = const scb::HFSR,
    scb_dfsr = const scb::DFSR,
    scb_mmfar = const scb::MMFAR,
    scb_bfar = const scb::BFAR,
    scb_afsr = const scb::AFSR,
    scb_sfsr = const scb::SFSR,
    scb_sfar = const scb::SFAR,
    scb_rfsr = const scb::RFSR,
    aircr = const scb::BASE + scb::AIRCR,
    aircr_reset = const scb::AIRCR_VECTKEY | scb::AIRCR_SYSRESETREQ,
    aircr_prigroup = const scb::AIRCR_PRIGROUP_MASK,
);

// Thumb-1 immediate ranges used above.
const _: () = {
    assert!(layout::OFS_INTEGRITY_SIGNATURE <= 124);
    assert!(layout::OFS_EXC_XPSR <= 255 && layout::OFS_CFSR <= 255);
    assert!(layout::RECORD_SIZE <= 255 && layout::CHECKSUM_LEN <= 255);
    assert!(layout::OFS_EXC_XPSR + 16 == layout::OFS_MSPLIM);
    assert!(layout::OFS_CFSR + 16 == layout::OFS_BFAR);
};

/// Route the fault exceptions to `FaultCapture`.
///
/// Defines `HardFault`, `MemoryManagement`, `BusFault` and `UsageFault` (plus
/// `SecureFault` with `bind_fault_handlers!(secure)`) as the cortex-m-rt
/// vector symbols. Each is a two-instruction trampoline that leaves LR and SP
/// as the hardware set them. Invoke once, at module level, in the binary
/// crate; do not also define these handlers with `#[exception]`.
#[macro_export]
macro_rules! bind_fault_handlers {
    () => {
        ::core::arch::global_asm!(
            ".syntax unified",
            ".thumb",
            $crate::__fault_trampoline!("HardFault"),
            $crate::__fault_trampoline!("MemoryManagement"),
            $crate::__fault_trampoline!("BusFault"),
            $crate::__fault_trampoline!("UsageFault"),
        );
    };
    (secure) => {
        $crate::bind_fault_handlers!();
        ::core::arch::global_asm!(
            ".syntax unified",
            ".thumb",
            $crate::__fault_trampoline!("SecureFault"),
        );
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __fault_trampoline {
    ($name:literal) => {
        concat!(
            ".pushsection .text.", $name, ", \"ax\", %progbits\n",
            ".global ", $name, "\n",
            ".type ", $name, ", %function\n",
            ".thumb_func\n",
            $name, ":\n",
            "    ldr   r0, =FaultCapture\n",
            "    bx    r0\n",
            "    .ltorg\n",
            ".size ", $name, ", . - ", $name, "\n",
            ".popsection\n",
        )
    };
}
