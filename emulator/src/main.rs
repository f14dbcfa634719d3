mod session;

use std::env;
use std::io::{self, BufRead, Write};
use std::process;

use session::Session;

fn main() -> io::Result<()> {
    let address_bits = parse_address().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("Usage: node-emulator [--address <0-7>]");
        process::exit(2);
    });

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut session = Session::new(address_bits);
    let mut line = String::new();

    writeln!(
        writer,
        "Door Sensor Node Emulator ready. Type `help` for commands or `exit` to quit."
    )?;

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        for response in session.handle_command(trimmed) {
            writeln!(writer, "{response}")?;
        }
    }

    Ok(())
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_address() -> Result<u8, String> {
    let mut args = env::args().skip(1);
    match args.next() {
        None => Ok(0),
        Some(flag) if flag == "--address" => {
            let value = args
                .next()
                .ok_or_else(|| "--address requires a value".to_string())?;
            let bits: u8 = value
                .parse()
                .map_err(|_| format!("invalid address `{value}`"))?;
            if bits > 7 {
                return Err(format!("address {bits} out of range (0-7)"));
            }
            Ok(bits)
        }
        Some(other) => Err(format!("unknown argument `{other}`")),
    }
}
