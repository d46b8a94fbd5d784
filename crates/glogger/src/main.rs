#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_rp::gpio;
use embassy_time::Timer;

use nmea::{SentenceBuffer, parser};
use nofs::NoFs;
use sdmmc::SdMmc;

use glogger::{
    card::CardBus,
    receiver, serial,
    settings::SettingsStore,
    status::{self, Fault, Status, halt},
};

use {defmt_rtt as _, panic_probe as _};

embassy_rp::bind_interrupts!(struct Irqs {
    UART0_IRQ => serial::InterruptHandler;
});

const SENTENCE_CAPACITY: usize = 128;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    defmt::info!("glogger {}", env!("CARGO_PKG_VERSION"));

    let led = gpio::Output::new(p.PIN_25, gpio::Level::High);
    defmt::unwrap!(spawner.spawn(status::task_status(led)));

    let mut store = SettingsStore::new(p.FLASH);
    let settings = match store.load() {
        Ok(settings) => settings,
        Err(e) => {
            defmt::warn!("settings unavailable ({}), using defaults", e);
            Default::default()
        }
    };
    defmt::info!("{}", settings);

    // let the card and the receiver power up
    Timer::after_secs(1).await;

    let bus = CardBus::new(p.SPI0, p.PIN_18, p.PIN_19, p.PIN_16, p.PIN_17);
    let card = match SdMmc::init(bus, sdmmc::Config::default()) {
        Ok(card) => card,
        Err(e) => {
            defmt::error!("card init failed: {}", e);
            halt(Fault::Card).await
        }
    };
    defmt::info!("card ready");

    let mut log = match NoFs::mount(card, settings.log_config()) {
        Ok(log) => log,
        Err(e @ (nofs::Error::Unformatted | nofs::Error::NoSentinel { .. })) => {
            defmt::error!("no log on the card: {}", e);
            halt(Fault::NoSentinel).await
        }
        Err(e) => {
            defmt::error!("mount failed: {}", e);
            halt(Fault::Log).await
        }
    };
    defmt::info!("resuming log at {} (hint {})", log.cursor(), log.hint());

    let (mut rx, mut tx) = serial::init(p.UART0, p.PIN_0, p.PIN_1, Irqs, settings.baudrate);
    receiver::configure(&mut tx, &mut rx, &settings).await;

    status::set(Status::Idle);

    let mut sentence = SentenceBuffer::<SENTENCE_CAPACITY>::new();
    loop {
        let class = sentence.read_from(&mut rx).await;
        let line = sentence.as_bytes();
        if !class.is_recognized() {
            defmt::warn!("unrecognized: {=[u8]:a}", line);
            continue;
        }
        // printable text only, which also keeps the end-of-log marker out of the payload
        if !sentence.is_loggable() {
            defmt::debug!("skipped: {=[u8]:a}", line);
            continue;
        }

        if let Err(e) = log.append(line) {
            defmt::error!("log write failed: {}", e);
            halt(Fault::Log).await
        }
        status::set(Status::Logged);

        match parser::parse(line) {
            Ok(msg) => defmt::debug!("{}", msg),
            Err(e) => defmt::debug!("{=[u8]:a}: {}", line, e),
        }
    }
}
