// License below.
//! A minimal host around the interpreter core: loads a flat
//! binary image into RAM, runs the core for a cycle budget, and
//! dumps the register state.

#[macro_use]
extern crate log;

use std::path::PathBuf;

use argparse::{ArgumentParser, Parse, ParseOption, Print, StoreFalse, StoreTrue};

use arm7rs::{logger, Arm7Core, NoCoprocessor, Ram};

/// RAM backing the demo host, sized generously for test images.
const RAM_LEN: u32 = 16 * 1024 * 1024;

struct CmdLineArgs {
    image_file_path: Option<PathBuf>,
    log_file_path: PathBuf,
    load_address: u32,
    budget: i64,
    verbose: bool,
    colour: bool,
}

impl Default for CmdLineArgs {
    fn default() -> CmdLineArgs {
        CmdLineArgs {
            image_file_path: None,
            log_file_path: PathBuf::from("./Arm7rs.log"),
            load_address: 0,
            budget: 1_000_000,
            verbose: false,
            colour: true,
        }
    }
}

fn main() {
    let mut args = CmdLineArgs::default();
    parse_command_line(&mut args);
    configure_logging(&args);
    run_core(&args);
}

fn parse_command_line(args: &mut CmdLineArgs) {
    let mut parser = ArgumentParser::new();
    parser.set_description("A portable ARM7TDMI interpreter core written in Rust.");
    parser.add_option(&["-V", "--version"],
                      Print(format!("Arm7rs v{}", env!("CARGO_PKG_VERSION"))),
                      "Show current version.");
    parser.refer(&mut args.image_file_path)
          .add_option(&["--image"], ParseOption, "Path of a flat binary image to load.")
          .metavar("PATH");
    parser.refer(&mut args.load_address)
          .add_option(&["--base"], Parse, "RAM offset the image is loaded at.")
          .metavar("ADDR");
    parser.refer(&mut args.budget)
          .add_option(&["--cycles"], Parse, "Approximate cycle budget to run for.")
          .metavar("N");
    parser.refer(&mut args.log_file_path)
          .add_option(&["--log"], Parse, "Custom path for the log file.")
          .metavar("PATH");
    parser.refer(&mut args.verbose)
          .add_option(&["-v", "--verbose"], StoreTrue, "Log extra messages and information.");
    parser.refer(&mut args.colour)
          .add_option(&["-c", "--with-colour"], StoreTrue, "Enable terminal logging with colour codes. (default)")
          .add_option(&["-k", "--without-colour"], StoreFalse, "Disable terminal logging with colour codes.");
    parser.parse_args_or_exit();
}

fn configure_logging(args: &CmdLineArgs) {
    let p = args.log_file_path.as_path();
    logger::init_with(p, args.verbose, args.colour).unwrap();
    info!("Logging to file `{}`.", p.display());
}

fn run_core(args: &CmdLineArgs) {
    let mut ram = Ram::new(RAM_LEN);

    // Load the image now if a path is given. Execution starts at
    // the reset vector, so address 0 should hold code.
    if let Some(ref fp) = args.image_file_path {
        let image = match std::fs::read(fp.as_path()) {
            Ok(x) => x,
            Err(e) => { error!("Failed reading the image file:\n{}", e); return; },
        };
        if let Err(e) = ram.load(args.load_address, &image) {
            error!("Failed placing the image in RAM: {}.", e);
            return;
        }
        info!("Loaded {} bytes at {:#010X}.", image.len(), args.load_address);
    } else {
        warn!("No image given; RAM is all zeroes, i.e. `andeq r0, r0, r0`.");
    }

    let mut cpu = Arm7Core::new(Box::new(ram), Box::new(NoCoprocessor));
    cpu.reset();
    let remainder = cpu.run(args.budget);
    info!("Budget exhausted ({} cycles overrun).\n{}", -remainder, cpu);
}


/*
Licensed to the Apache Software Foundation (ASF) under one
or more contributor license agreements.  See the NOTICE file
distributed with this work for additional information
regarding copyright ownership.  The ASF licenses this file
to you under the Apache License, Version 2.0 (the
"License"); you may not use this file except in compliance
with the License.  You may obtain a copy of the License at

  http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing,
software distributed under the License is distributed on an
"AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
KIND, either express or implied.  See the License for the
specific language governing permissions and limitations
under the License.
*/
