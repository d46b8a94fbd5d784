//! GNSS receiver setup over the SkyTraq binary protocol.

use embassy_time::{Duration, with_timeout};

use skytraq::{Attributes, Command, FrameStream, NmeaIntervals, PpsMode, Reply};

use crate::serial::{SerialRx, SerialTx};
use crate::settings::Settings;

const REPLY_TIMEOUT: Duration = Duration::from_millis(500);

/// Restricts the output to GGA and RMC, sets the update rate and turns on the 1PPS output.
/// A rejected or unanswered command is only reported, the receiver keeps its previous
/// setting.
pub async fn configure(tx: &mut SerialTx, rx: &mut SerialRx, settings: &Settings) {
    let commands = [
        Command::Nmea(NmeaIntervals::FIX_ONLY),
        Command::UpdateRate(settings.update_rate),
        Command::Pps(PpsMode::Fix3d),
    ];

    let mut buf = [0; 32];
    for command in commands {
        match command.encode(Attributes::Sram, &mut buf) {
            Ok(frame) => tx.set_string(frame),
            Err(e) => {
                defmt::warn!("{}: {}", command, e);
                continue;
            }
        }
        tx.flush().await;

        match with_timeout(REPLY_TIMEOUT, wait_reply(rx, command.id())).await {
            Ok(Reply::Ack(_)) => defmt::info!("receiver accepted {}", command),
            Ok(Reply::Nack(_)) => defmt::warn!("receiver rejected {}", command),
            Err(_) => defmt::warn!("no reply to {}", command),
        }
    }

    // the sentence stream starts over from a clean ring
    rx.clear();
}

async fn wait_reply(rx: &mut SerialRx, id: u8) -> Reply {
    let mut stream = FrameStream::<64>::new();
    loop {
        while let Some(byte) = rx.pop() {
            stream.push(byte);
            if let Some(reply) = reply_to(&mut stream, id) {
                return reply;
            }
        }
        nmea::ByteSource::idle(rx).await;
    }
}

fn reply_to<const N: usize>(stream: &mut FrameStream<N>, id: u8) -> Option<Reply> {
    while let Some(frame) = stream.pop() {
        match frame.reply() {
            Some(reply @ (Reply::Ack(acked) | Reply::Nack(acked))) if acked == id => {
                return Some(reply);
            }
            _ => defmt::debug!("ignoring frame {}", frame),
        }
    }
    None
}
