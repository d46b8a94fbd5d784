#![no_std]

pub mod ring_buffer;
