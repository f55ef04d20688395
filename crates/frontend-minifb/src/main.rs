//! SPI slave simulator frontend.
//!
//! Runs one scripted transaction against the engine and shows the pins:
//!
//! - **GUI mode** (default): logic-analyzer window with SCK, /CS, MOSI, MISO
//!   and the host data valid pulse; scroll, zoom, re-run, screenshot.
//! - **Headless mode** (`--headless`): ASCII waveform plus decoded bytes.
//!
//! Engine state can be restored before the run (`--load-state`) and written
//! after it (`--save-state`).

use spi_slave_core::trace::{TraceBuffer, TraceSample};
use spi_slave_core::{PinOutput, SpiMode, SpiSlave, Testbench, Transaction};
use minifb::{Key, Window, WindowOptions, Scale, ScaleMode};
use log::LevelFilter;
use std::env;
use std::fs;
use std::path::Path;

/// Waveform window size in pixels
const VIEW_WIDTH: usize = 800;
const LANE_HEIGHT: usize = 36;
const LANE_NAMES: [&str; 5] = ["SCK", "/CS", "MOSI", "MISO", "VALID"];
const VIEW_HEIGHT: usize = LANE_HEIGHT * LANE_NAMES.len();
/// ASCII waveform columns per row (headless)
const ASCII_COLUMNS: usize = 96;

const COLOR_BG: u32 = 0x101418;
const COLOR_GRID: u32 = 0x283038;
const COLOR_TRACE: u32 = 0x40E060;
const COLOR_FLOAT: u32 = 0xE0C040;
const COLOR_VALID: u32 = 0x40A0FF;

// ─── Logging ────────────────────────────────────────────────────────────────

/// Log level from `--trace` / `--debug`, warnings only otherwise.
fn log_level(args: &[String]) -> LevelFilter {
    if args.iter().any(|a| a == "--trace") {
        LevelFilter::Trace
    } else if args.iter().any(|a| a == "--debug") {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    }
}

fn init_logger(level: LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();
}

// ─── Scenario ───────────────────────────────────────────────────────────────

struct Scenario {
    mode: SpiMode,
    ratio: u32,
    tx: u16,
    mosi: Vec<u8>,
    load_state: Option<String>,
    save_state: Option<String>,
}

fn arg_value<'a>(args: &'a [String], name: &str) -> Option<&'a String> {
    args.iter().position(|a| a == name).and_then(|i| args.get(i + 1))
}

fn parse_hex(s: &str) -> Result<u32, String> {
    let t = s.trim().trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(t, 16).map_err(|e| format!("bad hex value '{}': {}", s, e))
}

fn parse_scenario(args: &[String]) -> Result<Scenario, String> {
    let mode = match arg_value(args, "--mode") {
        Some(s) => {
            let index: u8 = s.parse().map_err(|_| format!("bad --mode '{}'", s))?;
            SpiMode::from_index(index)?
        }
        None => SpiMode::Mode0,
    };
    let ratio = match arg_value(args, "--ratio") {
        Some(s) => s.parse().map_err(|_| format!("bad --ratio '{}'", s))?,
        None => 8,
    };
    let tx = match arg_value(args, "--tx") {
        Some(s) => {
            let v = parse_hex(s)?;
            u16::try_from(v).map_err(|_| format!("--tx 0x{:X} does not fit in 16 bits", v))?
        }
        None => 0x1234,
    };
    let mosi = match arg_value(args, "--mosi") {
        Some(s) => s.split(',')
            .filter(|p| !p.trim().is_empty())
            .map(|p| parse_hex(p).and_then(|v| u8::try_from(v)
                .map_err(|_| format!("--mosi byte 0x{:X} does not fit in 8 bits", v))))
            .collect::<Result<Vec<u8>, String>>()?,
        None => vec![0xA5],
    };
    Ok(Scenario {
        mode,
        ratio,
        tx,
        mosi,
        load_state: arg_value(args, "--load-state").cloned(),
        save_state: arg_value(args, "--save-state").cloned(),
    })
}

/// Build the engine (optionally from a save state), load the transmit word
/// and run the transfer.
fn run_scenario(sc: &Scenario) -> Result<(Testbench, Transaction), String> {
    let mut slave = SpiSlave::new(sc.mode);
    if let Some(ref path) = sc.load_state {
        slave.load_from_file(Path::new(path))
            .map_err(|e| format!("{}: {}", path, e))?;
        log::info!("Loaded state from {}", path);
    }
    let mut tb = Testbench::with_slave(slave, sc.ratio);
    tb.load(sc.tx);
    tb.idle(sc.ratio);
    let t = tb.transfer(&sc.mosi);
    if let Some(ref path) = sc.save_state {
        tb.slave.save_to_file(Path::new(path))
            .map_err(|e| format!("{}: {}", path, e))?;
        log::info!("Saved state to {}", path);
    }
    Ok((tb, t))
}

fn print_summary(sc: &Scenario, tb: &Testbench, t: &Transaction) {
    println!("Mode {} (CPOL={} CPHA={}), ratio {} host ticks per SCK period",
        sc.mode.index(), sc.mode.cpol() as u8, sc.mode.cpha() as u8, tb.ratio());
    println!("MOSI sent:     {}", hex_list(&sc.mosi));
    println!("Host received: {}", hex_list(&t.received));
    println!("MISO at /CS:   {}", t.at_select.as_char());
    let bits: String = t.miso.iter().map(|o| o.as_char()).collect();
    println!("MISO bits:     {}", bits);
    if t.miso.len() >= 16 {
        println!("MISO word:     0x{:04X} (loaded 0x{:04X})", t.miso_word(), sc.tx);
    }
    println!("Counters:      selects={} bytes={} valid={} partial={}",
        tb.slave.dbg_selects, tb.slave.dbg_bytes_completed,
        tb.slave.dbg_valid_pulses, tb.slave.dbg_partial_discards);
}

fn hex_list(bytes: &[u8]) -> String {
    if bytes.is_empty() { return "-".into(); }
    bytes.iter().map(|b| format!("{:02X}", b)).collect::<Vec<_>>().join(" ")
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!("SPI slave simulator v0.1.0 - Rust");
        eprintln!("Usage: {} [options]", args[0]);
        eprintln!();
        eprintln!("Options:");
        eprintln!("  --mode N             Clock mode 0-3 (default 0)");
        eprintln!("  --ratio N            Host ticks per SCK period (default 8, >= 4)");
        eprintln!("  --tx HEX             16-bit word to shift out (default 1234)");
        eprintln!("  --mosi HEX,HEX,...   Bytes to clock in (default A5)");
        eprintln!("  --headless           Run without GUI");
        eprintln!("  --debug              Log engine events");
        eprintln!("  --trace              Log every bus edge");
        eprintln!("  --load-state PATH    Restore engine state before the run");
        eprintln!("  --save-state PATH    Write engine state after the run");
        eprintln!("  --scale N            Initial zoom 1-6 (default 3)");
        eprintln!();
        eprintln!("GUI keys: Left/Right=Scroll 1-6=Zoom R=Re-run S=Screenshot Esc=Quit");
        std::process::exit(1);
    }

    let headless = args.iter().any(|a| a == "--headless");
    init_logger(log_level(&args));

    let scale: usize = arg_value(&args, "--scale")
        .and_then(|s| s.parse().ok())
        .unwrap_or(3).clamp(1, 6);

    let scenario = match parse_scenario(&args) {
        Ok(sc) => sc,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let result = if headless {
        run_headless(&scenario)
    } else {
        run_gui(&scenario, scale)
    };
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

// ─── Headless Mode ──────────────────────────────────────────────────────────

fn run_headless(sc: &Scenario) -> Result<(), String> {
    let (tb, t) = run_scenario(sc)?;
    print_summary(sc, &tb, &t);
    println!();
    print_waveform(&tb.trace);
    if log::max_level() >= LevelFilter::Debug {
        println!("\n{}", tb.slave.dump_state());
    }
    Ok(())
}

fn lane_char(sample: &TraceSample, lane: usize) -> char {
    let bit = |b: bool| if b { '#' } else { '_' };
    match lane {
        0 => bit(sample.sck),
        1 => bit(sample.cs_n),
        2 => bit(sample.mosi),
        3 => match sample.miso {
            PinOutput::Float => '~',
            out => bit(out == PinOutput::DriveHigh),
        },
        _ => if sample.valid { '^' } else { ' ' },
    }
}

fn print_waveform(trace: &TraceBuffer) {
    let samples: Vec<&TraceSample> = trace.iter().collect();
    println!("  ({} samples, '~' = MISO floating)", samples.len());
    for chunk in samples.chunks(ASCII_COLUMNS) {
        let first = chunk.first().map(|s| s.tick).unwrap_or(0);
        println!("  tick {}", first);
        for (lane, name) in LANE_NAMES.iter().enumerate() {
            let row: String = chunk.iter().map(|s| lane_char(s, lane)).collect();
            println!("  {:>5} |{}", name, row);
        }
    }
}

// ─── GUI Mode ───────────────────────────────────────────────────────────────

fn run_gui(sc: &Scenario, initial_scale: usize) -> Result<(), String> {
    let (mut tb, mut t) = run_scenario(sc)?;
    print_summary(sc, &tb, &t);

    let mut window = Window::new(
        "SPI Slave Simulator", VIEW_WIDTH, VIEW_HEIGHT,
        WindowOptions {
            scale: Scale::X1,
            scale_mode: ScaleMode::AspectRatioStretch,
            resize: true,
            ..Default::default()
        },
    ).map_err(|e| format!("Failed to create window: {}", e))?;
    window.set_target_fps(60);

    let mut buf = vec![COLOR_BG; VIEW_WIDTH * VIEW_HEIGHT];
    let mut zoom = initial_scale;
    let mut offset = 0usize;
    let mut screenshot_n = 0u32;
    let mut prev_r = false;
    let mut prev_s = false;
    let mut prev_num = [false; 6];

    while window.is_open() && !window.is_key_down(Key::Escape) {
        // Zoom (1-6)
        let num = [
            window.is_key_down(Key::Key1), window.is_key_down(Key::Key2),
            window.is_key_down(Key::Key3), window.is_key_down(Key::Key4),
            window.is_key_down(Key::Key5), window.is_key_down(Key::Key6),
        ];
        for i in 0..6 {
            if num[i] && !prev_num[i] { zoom = i + 1; }
        }
        prev_num = num;

        // Scroll
        let step = (VIEW_WIDTH / 8) / zoom.max(1);
        if window.is_key_down(Key::Right) {
            offset = (offset + step).min(tb.trace.len().saturating_sub(1));
        }
        if window.is_key_down(Key::Left) {
            offset = offset.saturating_sub(step);
        }

        // Re-run (R)
        let r = window.is_key_down(Key::R);
        if r && !prev_r {
            match run_scenario(sc) {
                Ok((ntb, nt)) => {
                    tb = ntb;
                    t = nt;
                    offset = 0;
                    print_summary(sc, &tb, &t);
                }
                Err(e) => eprintln!("Re-run error: {}", e),
            }
        }
        prev_r = r;

        render_trace(&tb.trace, offset, zoom, &mut buf);

        // Screenshot (S)
        let s = window.is_key_down(Key::S);
        if s && !prev_s {
            let f = format!("waveform_{:04}.bmp", screenshot_n);
            match save_screenshot(&buf, &f) {
                Ok(()) => { eprintln!("Screenshot: {}", f); screenshot_n += 1; }
                Err(e) => eprintln!("Screenshot error: {}", e),
            }
        }
        prev_s = s;

        window.update_with_buffer(&buf, VIEW_WIDTH, VIEW_HEIGHT)
            .map_err(|e| format!("Window update failed: {}", e))?;
    }
    Ok(())
}

fn put(buf: &mut [u32], x: usize, y: usize, color: u32) {
    if x < VIEW_WIDTH && y < VIEW_HEIGHT {
        buf[y * VIEW_WIDTH + x] = color;
    }
}

fn vline(buf: &mut [u32], x: usize, y0: usize, y1: usize, color: u32) {
    for y in y0.min(y1)..=y0.max(y1) { put(buf, x, y, color); }
}

/// Lane level to a y coordinate: high, low or mid-lane for a floating line.
fn lane_y(lane: usize, level: Option<bool>) -> usize {
    let top = lane * LANE_HEIGHT;
    match level {
        Some(true) => top + 6,
        Some(false) => top + LANE_HEIGHT - 6,
        None => top + LANE_HEIGHT / 2,
    }
}

fn lane_level(sample: &TraceSample, lane: usize) -> Option<bool> {
    match lane {
        0 => Some(sample.sck),
        1 => Some(sample.cs_n),
        2 => Some(sample.mosi),
        3 => sample.miso.level(),
        _ => Some(sample.valid),
    }
}

/// Draw `zoom` pixels per sample starting at sample `offset`.
fn render_trace(trace: &TraceBuffer, offset: usize, zoom: usize, buf: &mut [u32]) {
    for px in buf.iter_mut() { *px = COLOR_BG; }
    for lane in 1..LANE_NAMES.len() {
        for x in 0..VIEW_WIDTH { put(buf, x, lane * LANE_HEIGHT, COLOR_GRID); }
    }

    let visible = VIEW_WIDTH / zoom.max(1);
    let samples: Vec<&TraceSample> = trace.iter().skip(offset).take(visible).collect();
    for lane in 0..LANE_NAMES.len() {
        let mut prev_y: Option<usize> = None;
        for (i, sample) in samples.iter().enumerate() {
            let level = lane_level(sample, lane);
            let y = lane_y(lane, level);
            let color = match (lane, level) {
                (3, None) => COLOR_FLOAT,
                (4, _) => COLOR_VALID,
                _ => COLOR_TRACE,
            };
            let x0 = i * zoom;
            if let Some(py) = prev_y {
                if py != y { vline(buf, x0, py, y, color); }
            }
            for x in x0..x0 + zoom { put(buf, x, y, color); }
            prev_y = Some(y);
        }
    }
}

// ─── Screenshot (BMP) ───────────────────────────────────────────────────────

/// Encode a 0RGB frame as an uncompressed 24-bit BMP.
fn encode_bmp(pixels: &[u32], width: usize, height: usize) -> Vec<u8> {
    const HEADERS: u32 = 14 + 40;
    let stride = (width * 3 + 3) & !3;
    let image_size = (stride * height) as u32;
    let mut data = Vec::with_capacity(HEADERS as usize + image_size as usize);
    let le32 = |data: &mut Vec<u8>, v: u32| data.extend_from_slice(&v.to_le_bytes());

    data.extend_from_slice(b"BM");
    for v in [HEADERS + image_size, 0, HEADERS, 40, width as u32, height as u32] {
        le32(&mut data, v);
    }
    // planes = 1, 24 bpp, no compression
    data.extend_from_slice(&[1, 0, 24, 0]);
    for v in [0, image_size, 2835, 2835, 0, 0] {
        le32(&mut data, v);
    }

    for row in pixels.chunks(width).take(height).rev() {
        let start = data.len();
        for &px in row {
            let [b, g, r, _] = px.to_le_bytes();
            data.extend_from_slice(&[b, g, r]);
        }
        data.resize(start + stride, 0);
    }
    data
}

fn save_screenshot(pixels: &[u32], path: &str) -> Result<(), String> {
    fs::write(path, encode_bmp(pixels, VIEW_WIDTH, VIEW_HEIGHT))
        .map_err(|e| format!("{}: {}", path, e))
}
