use std::io::Write as _;
use std::process::ExitCode;

use log::{error, info};
use structopt::StructOpt;

use sam_loader::cli::{CliArgs, Command};
use sam_loader::error::ExitOutcome;
use sam_loader::file_format;
use sam_loader::session::Session;
use sam_loader::transport::{SerialTransport, Transport};

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();
}

fn run<T: Transport>(args: &CliArgs, mut session: Session<T>) -> sam_loader::Result<()> {
    let overrides = args.address_overrides();

    if matches!(args.command, Command::Parts) {
        for entry in sam_loader::part::REGISTRY {
            let suffix = if entry.untested { " (untested)" } else { "" };
            println!("{}{}", entry.name, suffix);
        }
        return Ok(());
    }

    let ids = session.probe(&overrides)?;
    session.select_part(&ids)?;
    info!("identified part: {:?}", session.part_name());

    match &args.command {
        Command::Parts => unreachable!(),
        Command::Info => {
            println!("{}", session.info()?);
        }
        Command::Read {
            address,
            length,
            file,
        } => {
            let data = session.read_flash(*address, *length)?;
            match file {
                Some(path) => std::fs::write(path, &data)?,
                None => {
                    for (i, chunk) in data.chunks(16).enumerate() {
                        let hex: Vec<String> =
                            chunk.iter().map(|b| format!("{b:02x}")).collect();
                        println!("{:08x}  {}", i * 16, hex.join(" "));
                    }
                }
            }
        }
        Command::Write {
            file,
            address,
            length,
        } => {
            let loaded = file_format::read_file(file)?;
            let mut data = loaded.data;
            if let Some(length) = length {
                data.truncate(*length as usize);
            }
            let address = (*address).or(loaded.address);
            let ok = session.program_flash(&data, address)?;
            if !ok {
                error!("verification failed after programming");
                return Err(sam_loader::Error::FlashWriteError {
                    page_address: address.unwrap_or(0),
                    range: sam_loader::address_range::AddressRange::new(0, 0, None),
                });
            }
            if args.flash_boot {
                session.set_flash_boot()?;
            }
        }
        Command::Erase { address } => {
            session.erase(*address)?;
        }
    }

    if args.reset {
        session.reset()?;
    }

    Ok(())
}

fn main() -> ExitCode {
    let args = CliArgs::from_args();
    init_logging(args.verbose);

    let result = SerialTransport::open(&args.port, args.baud).and_then(|serial| {
        let session = Session::new(serial, args.usb)?;
        run(&args, session)
    });

    match result {
        Ok(()) => ExitCode::from(ExitOutcome::Success.code() as u8),
        Err(err) => {
            error!("{err}");
            ExitCode::from(ExitOutcome::from(&err).code() as u8)
        }
    }
}
