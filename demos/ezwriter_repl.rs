use anyhow::{bail, Context, Result};
use std::io::{Read, Write};
use std::iter::Peekable;
use std::str::{FromStr, SplitWhitespace};

use ezwriter_proto::serial::{self, SerialSettings};
use ezwriter_proto::{CardData, Coercivity, Engine, Track, TrackNumber};

fn cmd_read<IO: Read + Write>(device: &mut Engine<IO>, card: &mut CardData) -> Result<()> {
    println!("Swipe card to read.");
    *card = device.read()?;
    print!("{}", card);
    Ok(())
}

fn cmd_erase<IO: Read + Write>(args: &mut CmdScanner, device: &mut Engine<IO>) -> Result<()> {
    let mut tracks = Vec::new();
    while args.has_next() {
        tracks.push(TrackNumber::new(args.parse_next::<u8>()?)?);
    }
    if tracks.is_empty() {
        tracks.extend_from_slice(&TrackNumber::ALL);
    }
    println!("Swipe card to erase.");
    device.erase_tracks(&tracks)?;
    Ok(())
}

fn cmd_set(args: &mut CmdScanner, card: &mut CardData) -> Result<()> {
    let number = TrackNumber::new(args.parse_next::<u8>()?)?;
    let data = args.rest();
    card.set_track(number, data.parse::<Track>()?);
    print!("{}", card);
    Ok(())
}

fn cmd_write<IO: Read + Write>(
    args: &mut CmdScanner,
    device: &mut Engine<IO>,
    card: &CardData,
) -> Result<()> {
    let coercivity = match args.next().unwrap_or("high") {
        "high" | "hi" => Coercivity::High,
        "low" | "lo" => Coercivity::Low,
        other => bail!("Unknown coercivity {}", other),
    };
    print!("{}", card);
    println!("Swipe card to write.");
    device.write(coercivity, card)?;
    Ok(())
}

fn select_port() -> Result<String> {
    let mut args = std::env::args();
    args.next(); // Skip program name
    if let Some(port) = args.next() {
        return Ok(port);
    }

    let ports = serial::available_devices()?;
    if ports.is_empty() {
        bail!("No serial ports found");
    }
    for (n, port) in ports.iter().enumerate() {
        println!("{}: {}", n, port);
    }
    print!("Select port: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    let n: usize = CmdScanner::read_stdin(&mut line)?.parse_next()?;
    ports.get(n).cloned().context("No such port")
}

fn main() -> Result<()> {
    env_logger::init();

    let port = select_port()?;
    let serial = serial::open(&port, &SerialSettings::default())
        .with_context(|| format!("Failed to open serial port {}", port))?;

    let mut device = Engine::new(serial);
    device.initialize().context("Device initialization failed")?;
    println!("{}", device.version()?);

    let mut stdout = std::io::stdout();
    let mut card = CardData::new();
    loop {
        print!(">> ");
        stdout.flush()?;
        let mut line = String::new();
        let mut scan = CmdScanner::read_stdin(&mut line)?;
        if let Err(err) = match scan.next() {
            Err(_) => continue,
            Ok("read") | Ok("r") => cmd_read(&mut device, &mut card),
            Ok("erase") | Ok("e") => cmd_erase(&mut scan, &mut device),
            Ok("set") => cmd_set(&mut scan, &mut card),
            Ok("write") | Ok("w") => cmd_write(&mut scan, &mut device, &card),
            Ok("version") => device.version().map(|v| println!("{}", v)).map_err(Into::into),
            Ok("init") => device.initialize().map_err(Into::into),
            Ok("quit") | Ok("q") => break,
            Ok(cmd) => {
                println!("Unknown command {}", cmd);
                continue;
            }
        } {
            println!("{:?}", err)
        }
    }
    Ok(())
}

struct CmdScanner<'a> {
    splt: Peekable<SplitWhitespace<'a>>,
}

impl<'a> CmdScanner<'a> {
    fn read_stdin(buf: &'a mut String) -> Result<Self> {
        buf.clear();
        if std::io::stdin().read_line(buf)? == 0 {
            bail!("End of input");
        }
        let splt = buf.split_whitespace().peekable();
        Ok(Self { splt })
    }
    fn next(&mut self) -> Result<&'a str> {
        self.splt.next().context("End of stream")
    }
    fn has_next(&mut self) -> bool {
        self.splt.peek().is_some()
    }
    fn rest(&mut self) -> String {
        self.splt.by_ref().collect::<Vec<_>>().join(" ")
    }
    fn parse_next<T: FromStr>(&mut self) -> Result<T> {
        self.next()?.parse::<T>().ok().context("Parse error")
    }
}
