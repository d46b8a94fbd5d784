//! Interrupt driven UART0 link to the receiver.
//!
//! The interrupt handler owns the producer side of the receive ring and the consumer side of
//! the transmit ring. [`SerialRx`] and [`SerialTx`] hold the other two ends and never take a
//! lock.

use core::cell::RefCell;

use embassy_rp::interrupt::typelevel::{Binding, Handler, Interrupt, UART0_IRQ};
use embassy_rp::peripherals::UART0;
use embassy_rp::{Peripheral, pac, uart};
use embassy_sync::blocking_mutex::{Mutex, raw::CriticalSectionRawMutex};
use embassy_time::Timer;
use static_cell::StaticCell;

use misc::ring_buffer::{Consumer, Producer, RingBuffer};

pub const RX_CAPACITY: usize = 128;
pub const TX_CAPACITY: usize = 32;

type Shared<T> = Mutex<CriticalSectionRawMutex, RefCell<Option<T>>>;

static RX_PRODUCER: Shared<Producer<'static, RX_CAPACITY>> = Mutex::new(RefCell::new(None));
static TX_CONSUMER: Shared<Consumer<'static, TX_CAPACITY>> = Mutex::new(RefCell::new(None));

pub struct InterruptHandler;

impl Handler<UART0_IRQ> for InterruptHandler {
    unsafe fn on_interrupt() {
        let r = pac::UART0;

        RX_PRODUCER.lock(|p| {
            let mut p = p.borrow_mut();
            while !r.uartfr().read().rxfe() {
                let byte = r.uartdr().read().data();
                if let Some(p) = p.as_mut() {
                    // a full ring drops the new byte, the framer resyncs on the next '$'
                    let _ = p.push(byte);
                }
            }
        });

        TX_CONSUMER.lock(|c| {
            let mut c = c.borrow_mut();
            let Some(c) = c.as_mut() else {
                return;
            };
            while !r.uartfr().read().txff() {
                match c.pop() {
                    Some(byte) => r.uartdr().write(|w| w.set_data(byte)),
                    None => {
                        r.uartimsc().modify(|w| w.set_txim(false));
                        break;
                    }
                }
            }
        });

        r.uarticr().write(|w| {
            w.set_rtic(true);
            w.set_txic(true);
        });
    }
}

/// Brings up UART0 at `baudrate` with both rings attached. Can only be called once.
pub fn init(
    uart: impl Peripheral<P = UART0> + 'static,
    tx: impl Peripheral<P = impl uart::TxPin<UART0>> + 'static,
    rx: impl Peripheral<P = impl uart::RxPin<UART0>> + 'static,
    _irq: impl Binding<UART0_IRQ, InterruptHandler>,
    baudrate: u32,
) -> (SerialRx, SerialTx) {
    static RX_RING: StaticCell<RingBuffer<RX_CAPACITY>> = StaticCell::new();
    static TX_RING: StaticCell<RingBuffer<TX_CAPACITY>> = StaticCell::new();

    let config = {
        let mut c = uart::Config::default();
        c.baudrate = baudrate;
        c.parity = uart::Parity::ParityNone;
        c.stop_bits = uart::StopBits::STOP1;
        c
    };
    let (uart_tx, uart_rx) = uart::Uart::new_blocking(uart, tx, rx, config).split();

    let (rx_producer, rx_consumer) = RX_RING.init(RingBuffer::new()).split();
    let (tx_producer, tx_consumer) = TX_RING.init(RingBuffer::new()).split();
    RX_PRODUCER.lock(|p| *p.borrow_mut() = Some(rx_producer));
    TX_CONSUMER.lock(|c| *c.borrow_mut() = Some(tx_consumer));

    let r = pac::UART0;
    // interrupt at 1/8 full so the FIFO never overruns between two interrupts
    r.uartifls().write(|w| {
        w.set_rxiflsel(0b000);
        w.set_txiflsel(0b000);
    });
    r.uartimsc().write(|w| {
        w.set_rxim(true);
        w.set_rtim(true);
    });
    UART0_IRQ::unpend();
    unsafe { UART0_IRQ::enable() };

    (
        SerialRx {
            _uart: uart_rx,
            buf: rx_consumer,
        },
        SerialTx {
            _uart: uart_tx,
            buf: tx_producer,
        },
    )
}

pub struct SerialRx {
    _uart: uart::UartRx<'static, UART0, uart::Blocking>,
    buf: Consumer<'static, RX_CAPACITY>,
}

impl SerialRx {
    pub fn has_data(&self) -> bool {
        self.buf.has_data()
    }

    /// Next byte, `0` when nothing has arrived.
    pub fn get_char(&mut self) -> u8 {
        self.buf.get_char()
    }

    pub fn pop(&mut self) -> Option<u8> {
        self.buf.pop()
    }

    /// Drops whatever arrived so far.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl nmea::ByteSource for SerialRx {
    fn has_data(&self) -> bool {
        SerialRx::has_data(self)
    }

    fn get_char(&mut self) -> u8 {
        SerialRx::get_char(self)
    }

    async fn idle(&mut self) {
        Timer::after_millis(1).await;
    }
}

pub struct SerialTx {
    _uart: uart::UartTx<'static, UART0, uart::Blocking>,
    buf: Producer<'static, TX_CAPACITY>,
}

impl SerialTx {
    /// Queues `byte`, spinning while the ring is full.
    pub fn set_char(&mut self, byte: u8) {
        self.buf.push_blocking(byte, || {
            start_transmit();
            core::hint::spin_loop();
        });
        start_transmit();
    }

    pub fn set_string(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.set_char(byte);
        }
    }

    /// Waits until everything queued has left the shift register.
    pub async fn flush(&mut self) {
        while !self.buf.is_empty() {
            Timer::after_millis(1).await;
        }
        while pac::UART0.uartfr().read().busy() {
            Timer::after_micros(100).await;
        }
    }
}

/// The transmit interrupt only fires when the FIFO drains past its level, so it is pended by
/// hand to get the first byte out.
fn start_transmit() {
    cortex_m::interrupt::free(|_| {
        pac::UART0.uartimsc().modify(|w| w.set_txim(true));
    });
    UART0_IRQ::pend();
}
