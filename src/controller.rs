//! Controller lifecycle: `new` → `start_connect` → `disconnect` → `close`.
//! Owns the channel, the shared [`Input`] state, the packet counter and the
//! three stop flags, and coordinates the reader task, the ticker task, and
//! the input-report emitter per the single-writer-lock discipline.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::thread;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::GadgetError;
use crate::input::Input;
use crate::report::{self, GyroAxis};
use crate::subcommand::{self, UsbEvent};
use crate::ticker;
use crate::transport::{self, HidTransport};

/// Gap between successive non-blocking read polls on the reader task.
const READ_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Render bytes as a lowercase hex string for the level-5 raw frame dumps.
fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// A Switch Pro Controller emulated over a [`HidTransport`]. Generic over
/// the transport so tests run against an in-memory fake instead of a real
/// gadget device node.
pub struct Controller<T: HidTransport + Send + Sync + 'static> {
    path: String,
    channel: StdMutex<Option<Arc<T>>>,
    write_lock: StdMutex<()>,
    input: StdMutex<Input>,
    counter: Arc<AtomicU8>,
    stop_counter: Arc<AtomicBool>,
    stop_input: Arc<AtomicBool>,
    stop_communicate: Arc<AtomicBool>,
    apply_sens: HashSet<GyroAxis>,
    report_seconds: f64,
    /// Legacy numeric verbosity knob (0 quietest). Gates the handful of
    /// messages the original protocol ties to explicit thresholds
    /// (`> 1` for malformed/unknown requests, `> 4` for raw frame hex
    /// dumps); everything else goes through the `log` crate's own level
    /// filtering.
    log_level: i32,
    reader_handle: StdMutex<Option<JoinHandle<()>>>,
    ticker_handle: StdMutex<Option<JoinHandle<()>>>,
    emitter_handle: StdMutex<Option<JoinHandle<()>>>,
}

impl<T: HidTransport + Send + Sync + 'static> Controller<T> {
    /// Construct a dormant controller bound to `path`. All stop flags start
    /// set; nothing runs until [`Controller::start_connect`].
    pub fn new(
        path: impl Into<String>,
        report_seconds: f64,
        apply_sens: HashSet<GyroAxis>,
        log_level: i32,
    ) -> Self {
        Self {
            path: path.into(),
            channel: StdMutex::new(None),
            write_lock: StdMutex::new(()),
            input: StdMutex::new(Input::new()),
            counter: Arc::new(AtomicU8::new(0)),
            stop_counter: Arc::new(AtomicBool::new(true)),
            stop_input: Arc::new(AtomicBool::new(true)),
            stop_communicate: Arc::new(AtomicBool::new(true)),
            apply_sens,
            report_seconds,
            log_level,
            reader_handle: StdMutex::new(None),
            ticker_handle: StdMutex::new(None),
            emitter_handle: StdMutex::new(None),
        }
    }

    /// Mutate the shared input state, e.g. from a key/mouse event adapter.
    pub fn with_input<R>(&self, f: impl FnOnce(&mut Input) -> R) -> R {
        let mut input = self.input.lock().unwrap();
        f(&mut input)
    }

    /// Open the channel, clear the counter and communicate stop flags
    /// (`stopInput` stays set until the handshake finalizes), and launch the
    /// reader, ticker, and emitter tasks. A no-op if already connected.
    ///
    /// Takes `self` by `Arc` (not `&self`) because the spawned reader and
    /// emitter tasks each need their own owned clone of the controller that
    /// outlives this call -- the same reason `spawn_emitter`/`spawn_reader`
    /// below take `self: Arc<Self>`.
    pub fn start_connect(self: Arc<Self>) -> Result<(), GadgetError> {
        let mut guard = self.channel.lock().unwrap();
        if guard.is_some() {
            return Ok(());
        }

        let transport = Arc::new(T::open(&self.path)?);
        *guard = Some(transport.clone());
        drop(guard);

        self.stop_counter.store(false, Ordering::SeqCst);
        self.stop_communicate.store(false, Ordering::SeqCst);

        let (emit_tx, emit_rx) = mpsc::unbounded_channel();

        let ticker_handle = ticker::spawn(
            ticker::TICK_PERIOD,
            ticker::EMIT_EVERY,
            self.counter.clone(),
            self.stop_counter.clone(),
            self.stop_input.clone(),
            emit_tx,
        );
        let emitter_handle = self.clone().spawn_emitter(emit_rx, transport.clone());
        let reader_handle = self.clone().spawn_reader(transport);

        *self.ticker_handle.lock().unwrap() = Some(ticker_handle);
        *self.emitter_handle.lock().unwrap() = Some(emitter_handle);
        *self.reader_handle.lock().unwrap() = Some(reader_handle);

        Ok(())
    }

    fn spawn_emitter(
        self: Arc<Self>,
        mut emit_rx: mpsc::UnboundedReceiver<u8>,
        transport: Arc<T>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(counter_value) = emit_rx.recv().await {
                let (input_buf, six_axis) = {
                    let mut input = self.input.lock().unwrap();
                    let input_buf = report::encode_input_buffer(&input);
                    let six_axis = report::encode_six_axis_buffer(
                        &mut input.sensors,
                        &self.apply_sens,
                        self.report_seconds,
                    );
                    (input_buf, six_axis)
                };

                let mut payload = Vec::with_capacity(input_buf.len() + six_axis.len());
                payload.extend_from_slice(&input_buf);
                payload.extend_from_slice(&six_axis);

                if let Err(e) = self.write_locked(&transport, 0x30, counter_value, &payload) {
                    log::error!("fatal error writing periodic input report: {e}");
                    std::process::exit(1);
                }
            }
        })
    }

    fn spawn_reader(self: Arc<Self>, transport: Arc<T>) -> JoinHandle<()> {
        tokio::task::spawn_blocking(move || loop {
            if self.stop_communicate.load(Ordering::SeqCst) {
                return;
            }

            match transport.read_raw() {
                Ok(Some(bytes)) => {
                    if self.log_level > 4 {
                        log::info!(">>> {}", hex_string(&bytes));
                    }
                    self.handle_inbound(&transport, &bytes);
                }
                Ok(None) => {}
                Err(e) => {
                    log::error!("fatal error reading gadget channel: {e}");
                    std::process::exit(1);
                }
            }

            thread::sleep(READ_POLL_INTERVAL);
        })
    }

    fn handle_inbound(&self, transport: &T, bytes: &[u8]) {
        let Some(&leading) = bytes.first() else {
            return;
        };

        match leading {
            0x80 => {
                let selector = bytes.get(1).copied().unwrap_or(0);
                match subcommand::handle_usb_request(selector) {
                    UsbEvent::Reply(payload) => {
                        if let Err(e) = self.write_locked(transport, 0x81, selector, &payload) {
                            log::error!("fatal error writing handshake reply: {e}");
                            std::process::exit(1);
                        }
                    }
                    UsbEvent::StartInput => {
                        log::info!("handshake finalized, starting periodic input reports");
                        self.stop_input.store(false, Ordering::SeqCst);
                    }
                    UsbEvent::Ignored => {
                        if self.log_level > 1 {
                            log::info!("unknown USB handshake selector {selector:#04x}");
                        }
                    }
                }
            }
            0x01 => {
                let Some(&subcmd) = bytes.get(10) else {
                    return;
                };
                let args = bytes.get(11..).unwrap_or(&[]);
                let ack = subcommand::handle_uart_subcommand(subcmd, args);

                if self.log_level > 1 {
                    if subcmd == 0x10 {
                        match &ack {
                            subcommand::UartAck::Positive(_) => {
                                let offset = args.first().copied().unwrap_or(0);
                                let page = args.get(1).copied().unwrap_or(0);
                                let length = args.get(4).copied().unwrap_or(0);
                                log::info!("read SPI address: {page:02x}{offset:02x}[{length}]");
                            }
                            subcommand::UartAck::Negative => {
                                let page = args.get(1).copied().unwrap_or(0);
                                let length = args.get(4).copied().unwrap_or(0);
                                log::info!("unknown SPI address: {page:02x}[{length}]");
                            }
                            subcommand::UartAck::Ignored => {}
                        }
                    } else if matches!(ack, subcommand::UartAck::Ignored) {
                        log::info!("UART unknown request {subcmd:#04x}");
                    }
                }

                let input_buffer = {
                    let input = self.input.lock().unwrap();
                    report::encode_input_buffer(&input)
                };

                if let Some(payload) = subcommand::uart_reply_payload(&input_buffer, subcmd, &ack) {
                    let counter = self.counter.load(Ordering::SeqCst);
                    if let Err(e) = self.write_locked(transport, 0x21, counter, &payload) {
                        log::error!("fatal error writing UART reply: {e}");
                        std::process::exit(1);
                    }
                }
            }
            other => {
                log::trace!("ignoring inbound frame with unknown leading byte {other:#04x}");
            }
        }
    }

    fn write_locked(&self, transport: &T, ack: u8, cmd: u8, payload: &[u8]) -> Result<(), GadgetError> {
        let _guard = self.write_lock.lock().unwrap();
        let frame = transport::build_frame(ack, cmd, payload);
        if self.log_level > 4 {
            log::info!("<<< {}", hex_string(&frame));
        }
        transport.write_raw(&frame)
    }

    /// Write three consecutive "device going away" frames: the current
    /// input buffer with its trailing byte replaced in turn by `0x80`,
    /// `0x0a`, then `0x09`, followed by a constant `0x30`.
    pub fn disconnect(&self) -> Result<(), GadgetError> {
        let guard = self.channel.lock().unwrap();
        let Some(transport) = guard.as_ref() else {
            return Err(GadgetError::NotConnected);
        };

        let input_buffer = {
            let input = self.input.lock().unwrap();
            report::encode_input_buffer(&input)
        };

        let mut payload = Vec::with_capacity(input_buffer.len() + 2);
        payload.extend_from_slice(&input_buffer);
        payload.push(0x80);
        payload.push(0x30);

        for varying in [0x80u8, 0x0a, 0x09] {
            payload[input_buffer.len()] = varying;
            let counter = self.counter.load(Ordering::SeqCst);
            self.write_locked(transport, 0x21, counter, &payload)?;
        }

        Ok(())
    }

    /// Stop the counter and periodic input reports, cancel the ticker and
    /// emitter tasks, signal the reader task to stop, and close the
    /// channel. A no-op if not connected.
    pub fn close(&self) {
        let mut guard = self.channel.lock().unwrap();
        if guard.is_none() {
            return;
        }

        self.stop_counter.store(true, Ordering::SeqCst);
        self.stop_input.store(true, Ordering::SeqCst);

        if let Some(handle) = self.ticker_handle.lock().unwrap().take() {
            handle.abort();
        }
        if let Some(handle) = self.emitter_handle.lock().unwrap().take() {
            handle.abort();
        }

        self.stop_communicate.store(true, Ordering::SeqCst);
        if let Some(handle) = self.reader_handle.lock().unwrap().take() {
            handle.abort();
        }

        *guard = None;
    }
}
