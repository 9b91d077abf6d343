//! Fault capture demo - main entry point.
//!
//! Hardware-only entry point for the STM32H743ZI (NUCLEO-H743ZI user button on PC13).

#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Input, Pull};
use embassy_time::{with_timeout, Duration};

use firmware::boot::{self, WATCHDOG_TIMEOUT_MS};
use firmware::{inject, FaultEnables, FaultKind};

use {defmt_rtt as _, panic_probe as _};

// HardFault, MemoryManagement, BusFault and UsageFault all enter FaultCapture.
fault::bind_fault_handlers!();

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    defmt::info!("fault demo v{=str}", env!("CARGO_PKG_VERSION"));

    // Step 1: report and clear whatever the previous run captured.
    let previous = boot::hardware::take_previous_fault();
    if let Some(kind) = previous.kind() {
        defmt::info!("last reset caused by injected fault {=str}", kind.name());
    }

    // Step 2: configurable faults keep their own exception number.
    firmware::exception_handlers::hardware::apply(FaultEnables::DEMO);

    // Step 3
    let p = embassy_stm32::init(embassy_stm32::Config::default());
    let mut watchdog = embassy_stm32::wdg::IndependentWatchdog::new(p.IWDG1, boot::watchdog_timeout_us());
    watchdog.unleash();
    defmt::info!("IWDG watchdog armed: timeout={=u32}ms", WATCHDOG_TIMEOUT_MS);

    let mut button = ExtiInput::new(Input::new(p.PC13, Pull::Down), p.EXTI13);
    let mut next = FaultKind::after(previous.kind());
    defmt::info!("press the user button to inject {=str}", next.name());

    // Step 4
    loop {
        watchdog.pet();
        if with_timeout(Duration::from_secs(1), button.wait_for_rising_edge())
            .await
            .is_err()
        {
            continue;
        }
        defmt::warn!("injecting {=str}, expect {=str}", next.name(), next.expected_entry());
        inject::trigger(next);
        // Only reached when the fault is not enabled.
        next = FaultKind::after(Some(next));
    }
}
