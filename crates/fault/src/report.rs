//! Plain-text rendering of a record.

use core::fmt;

use crate::decode::{self, RegisterValue};
use crate::record::FaultRecord;

/// Displays a record: summary, registers, exception context, decoded entries.
///
/// ```
/// use fault::report::Report;
/// use fault::FaultRecord;
///
/// let text = format!("{}", Report(&FaultRecord::ZERO));
/// assert!(text.starts_with("No valid fault record"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Report<'a>(pub &'a FaultRecord);

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.0;
        if !record.is_valid() {
            return writeln!(f, "No valid fault record");
        }

        let s = decode::summary(record);
        writeln!(
            f,
            "Fault #{} (record v{}.{}): {} (exception {})",
            s.count, s.version.0, s.version.1, s.exception_name, s.exception
        )?;
        if let (Some(security), Some(handler)) = (s.security, s.handled_in) {
            writeln!(
                f,
                "  taken in {} state, handled in {} state",
                security.name(),
                handler.name()
            )?;
        }
        write!(f, "  {} mode, frame on {}", s.mode.name(), s.stack.name())?;
        if s.fp_context {
            write!(f, " with FP context")?;
        }
        writeln!(f)?;
        if let Some(pc) = s.pc {
            writeln!(f, "  PC 0x{pc:08X}")?;
        }

        let regs = decode::registers(record);
        writeln!(f, "Registers:")?;
        for (i, (name, value)) in regs.named().enumerate() {
            match value {
                RegisterValue::Known(v) => write!(f, "  {name:>4} 0x{v:08X}")?,
                RegisterValue::Unknown => write!(f, "  {name:>4} unknown   ")?,
            }
            if i % 4 == 3 {
                writeln!(f)?;
            }
        }

        let ctx = regs.context;
        writeln!(f, "Exception context:")?;
        writeln!(
            f,
            "  EXC_xPSR 0x{:08X}  EXC_RETURN 0x{:08X}  MSP 0x{:08X}  PSP 0x{:08X}",
            ctx.exc_xpsr, ctx.exc_return, ctx.msp, ctx.psp
        )?;
        if let Some(limits) = regs.limits {
            writeln!(f, "  MSPLIM 0x{:08X}  PSPLIM 0x{:08X}", limits.msplim, limits.psplim)?;
        }
        if let Some(sig) = record.integrity_signature() {
            writeln!(f, "  additional state context, signature 0x{sig:08X}")?;
        }

        let mut entries = decode::decode(record).peekable();
        if entries.peek().is_none() {
            return writeln!(f, "No fault status bits set");
        }
        writeln!(f, "Fault status:")?;
        for e in entries {
            write!(
                f,
                "  {:<11} {}.{} = {}: {}",
                e.category.name(),
                e.register.name(),
                e.name,
                e.value,
                e.description
            )?;
            if let Some(detail) = e.detail() {
                write!(f, " ({detail})")?;
            }
            match e.address {
                Some(addr) => writeln!(f, " @ 0x{addr:08X}")?,
                None => writeln!(f)?,
            }
        }
        Ok(())
    }
}
