#![no_std]

pub mod card;
pub mod receiver;
pub mod serial;
pub mod settings;
pub mod status;
