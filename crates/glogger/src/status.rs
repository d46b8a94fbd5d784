//! Status LED.
//!
//! Steady on while starting up, off while waiting for sentences, a short pulse for every
//! sentence logged. A fault blinks its code in groups forever.

use embassy_rp::gpio;
use embassy_sync::{blocking_mutex::raw::ThreadModeRawMutex, signal::Signal};
use embassy_time::Timer;

#[derive(Copy, Clone, PartialEq, defmt::Format)]
#[repr(u8)]
pub enum Fault {
    Card = 1,
    /// The card holds no log: unformatted, or no end marker in reach.
    NoSentinel = 2,
    Log = 3,
}

#[derive(Copy, Clone, PartialEq, defmt::Format)]
pub enum Status {
    Busy,
    Idle,
    Logged,
    Fault(Fault),
}

static STATUS: Signal<ThreadModeRawMutex, Status> = Signal::new();

pub fn set(status: Status) {
    STATUS.signal(status);
}

/// Shows `fault` and parks the caller for good.
pub async fn halt(fault: Fault) -> ! {
    set(Status::Fault(fault));
    loop {
        Timer::after_secs(60).await;
    }
}

#[embassy_executor::task]
pub async fn task_status(mut led: gpio::Output<'static>) {
    let mut status = Status::Busy;
    loop {
        status = match status {
            Status::Busy => {
                led.set_high();
                STATUS.wait().await
            }
            Status::Idle => {
                led.set_low();
                STATUS.wait().await
            }
            Status::Logged => {
                led.set_high();
                Timer::after_millis(30).await;
                led.set_low();
                STATUS.try_take().unwrap_or(Status::Idle)
            }
            Status::Fault(fault) => {
                defmt::error!("fault: {}", fault);
                loop {
                    for _ in 0..fault as u8 {
                        led.set_high();
                        Timer::after_millis(200).await;
                        led.set_low();
                        Timer::after_millis(200).await;
                    }
                    Timer::after_secs(1).await;
                }
            }
        };
    }
}
