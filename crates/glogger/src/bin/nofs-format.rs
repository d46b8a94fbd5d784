#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_rp::gpio;
use embassy_time::Timer;

use nofs::NoFs;
use sdmmc::SdMmc;

use glogger::{
    card::CardBus,
    status::{self, Fault, Status, halt},
};

use {defmt_rtt as _, panic_probe as _};

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    let led = gpio::Output::new(p.PIN_25, gpio::Level::High);
    defmt::unwrap!(spawner.spawn(status::task_status(led)));

    Timer::after_secs(1).await;

    let bus = CardBus::new(p.SPI0, p.PIN_18, p.PIN_19, p.PIN_16, p.PIN_17);
    let mut card = match SdMmc::init(bus, sdmmc::Config::default()) {
        Ok(card) => card,
        Err(e) => {
            defmt::error!("card init failed: {}", e);
            halt(Fault::Card).await
        }
    };

    if let Err(e) = NoFs::format(&mut card) {
        defmt::error!("format failed: {}", e);
        halt(Fault::Log).await
    }
    defmt::info!("card formatted");

    status::set(Status::Idle);
    loop {
        Timer::after_secs(60).await;
    }
}
